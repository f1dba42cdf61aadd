// Utility helpers for parsing and basic statistics.
//
// This module centralizes the CSV cell/number handling so the rest of the
// code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a numeric CSV cell.
///
/// - Trims whitespace.
/// - Rejects empty cells and anything `f64` cannot parse.
/// - Rejects `inf`/`NaN`, which `str::parse` would otherwise accept.
pub fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer CSV cell. `2024` and `2024.0` are both accepted,
/// `2024.5` is not.
pub fn parse_i32_safe(s: &str) -> Option<i32> {
    let v = parse_f64_safe(s)?;
    if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        return None;
    }
    Some(v as i32)
}

/// Like `parse_f64_safe`, but an empty cell counts as zero. Used for the
/// optional numeric columns of the events file.
pub fn parse_count_safe(s: &str) -> Option<f64> {
    if s.trim().is_empty() {
        return Some(0.0);
    }
    parse_f64_safe(s).filter(|v| *v >= 0.0)
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_stdev(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
    var.sqrt()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus `num-format` thousands separators
    // (e.g. `1,234.50`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    // Past u128 the digits are printed ungrouped.
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Goals print without decimals when whole (`6`, not `6.0`).
pub fn format_goal(n: f64) -> String {
    if n.fract() == 0.0 {
        format_number(n, 0)
    } else {
        format_number(n, 2)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_whole_floats_only() {
        assert_eq!(parse_i32_safe(" 2024 "), Some(2024));
        assert_eq!(parse_i32_safe("2024.0"), Some(2024));
        assert_eq!(parse_i32_safe("2024.5"), None);
        assert_eq!(parse_i32_safe("March"), None);
        assert_eq!(parse_i32_safe(""), None);
    }

    #[test]
    fn numbers_reject_non_finite() {
        assert_eq!(parse_f64_safe("1e3"), Some(1000.0));
        assert_eq!(parse_f64_safe("NaN"), None);
        assert_eq!(parse_f64_safe("inf"), None);
        assert_eq!(parse_f64_safe("five"), None);
    }

    #[test]
    fn counts_default_empty_to_zero() {
        assert_eq!(parse_count_safe(""), Some(0.0));
        assert_eq!(parse_count_safe("12"), Some(12.0));
        assert_eq!(parse_count_safe("-1"), None);
    }

    #[test]
    fn stdev_is_population() {
        assert_eq!(population_stdev(&[5.0, 7.0]), 1.0);
        assert_eq!(population_stdev(&[]), 0.0);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234.5, 2), "1,234.50");
        assert_eq!(format_number(-0.0, 1), "0.0");
        assert_eq!(format_goal(6.0), "6");
        assert_eq!(format_goal(6.25), "6.25");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn huge_values_keep_their_digits() {
        assert_eq!(format_goal(1e20), "100,000,000,000,000,000,000");
        assert_eq!(format_number(-1e19, 0), "-10,000,000,000,000,000,000");
        let wide = format_number(1e300, 0);
        assert_eq!(wide.len(), 301);
        assert!(wide.starts_with('1'));
    }
}
