use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;
use crate::error::AppError;

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| AppError::ConfigError(format!("Invalid log filter '{}': {}", settings.level, e)))?;

    let result = if settings.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| AppError::InternalError(format!("Failed to initialise tracing: {}", e)))
}
