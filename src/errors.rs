use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("HEADER_MISMATCH: expected `{expected}`, found `{found}`")]
    HeaderMismatch { expected: String, found: String },
    #[error("DATA_UNAVAILABLE: {0}")]
    DataUnavailable(String),
    #[error("STORAGE: {0}")]
    Storage(String),
    #[error("SERIALIZATION: {0}")]
    Serialization(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("INPUT_INVALID: {0}")]
    Input(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
