use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> AppResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| AppError::Io(e.to_string()))?;
    for r in rows {
        wtr.serialize(r).map_err(|e| AppError::Io(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `contents` as `dir/file_name`, creating `dir` if needed.
pub fn write_text(dir: &Path, file_name: &str, contents: &str) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Markdown-style preview table, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T, W>(out: &mut W, rows: &[T], max_rows: usize) -> AppResult<()>
where
    T: Tabled + Clone,
    W: Write,
{
    writeln!(out, "{}\n", render_table(rows, max_rows))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatsPreviewRow;

    fn preview(metric: &str) -> StatsPreviewRow {
        StatsPreviewRow {
            metric: metric.to_string(),
            years: "2 (2024, 2023)".to_string(),
            avg: "6.0".to_string(),
            min: "5".to_string(),
            max: "7".to_string(),
            variability: "Consistent".to_string(),
            suggested: "6".to_string(),
        }
    }

    #[test]
    fn table_respects_row_limit() {
        let rows = vec![preview("Events hosted"), preview("New teens engaged")];
        let table = render_table(&rows, 1);
        assert!(table.contains("| Metric"));
        assert!(table.contains("Events hosted"));
        assert!(!table.contains("New teens engaged"));
        assert_eq!(render_table::<StatsPreviewRow>(&[], 5), "(no rows)");
    }

    #[test]
    fn csv_and_text_land_on_disk() {
        #[derive(Serialize)]
        struct Line {
            file: &'static str,
            line: usize,
        }
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("report.csv");
        write_csv(&csv_path, &[Line { file: "history.csv", line: 4 }]).unwrap();
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), "file,line\nhistory.csv,4\n");

        let nested = dir.path().join("out");
        let path = write_text(&nested, "a.txt", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
