use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Pattern error: {0}")]
    PatternError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Short machine-readable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::StoreError(_) => "store",
            AppError::ConfigError(_) => "config",
            AppError::PatternError(_) => "pattern",
            AppError::SerializationError(_) => "serialization",
            AppError::InternalError(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::PatternError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StoreError(format!("I/O error: {}", err))
    }
}
