use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::validator::ConfigValidator;
use crate::error::AppError;

pub const ENV_PREFIX: &str = "RISK_GRAPH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub transmission: TransmissionSettings,
    pub catalog: CatalogSettings,
    pub data: DataSettings,
    pub logging: LoggingSettings,
}

/// Scoring knobs for the identification engine and metric rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Minimum pattern matches before a category yields a risk.
    pub min_match_count: usize,
    /// severity = matches / this, clamped to [1, 5]
    pub matches_per_severity_level: usize,
    /// likelihood = matches * this, clamped to [0.1, 0.9]
    pub likelihood_per_match: f64,
    pub top_risks_limit: usize,
    pub top_entities_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionSettings {
    /// Relationships below this confidence are left out of the entity graph.
    pub min_edge_confidence: f64,
    /// Longest entity path (in edges) still counted as a transmission.
    pub max_path_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// JSON pattern catalog replacing the built-in table.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub snapshot_path: String,
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            min_match_count: 1,
            matches_per_severity_level: 2,
            likelihood_per_match: 0.1,
            top_risks_limit: 10,
            top_entities_limit: 10,
        }
    }
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        TransmissionSettings {
            min_edge_confidence: 0.0,
            max_path_length: None,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            snapshot_path: "data/snapshot.json".to_string(),
            output_path: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Defaults, then `config/default.*`, then `config/local.*`, then
    /// `RISK_GRAPH__SECTION__KEY` environment variables.
    pub fn new() -> Result<Self, AppError> {
        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        info!("Configuration loaded and validated successfully");
        Ok(settings)
    }

    /// Defaults overlaid with a single configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let validator = ConfigValidator::new();

        validator.validate_at_least(self.engine.min_match_count, 1, "engine.min_match_count")?;
        validator.validate_at_least(
            self.engine.matches_per_severity_level,
            1,
            "engine.matches_per_severity_level",
        )?;
        validator.validate_range(self.engine.likelihood_per_match, 0.0, 1.0, "engine.likelihood_per_match")?;
        if self.engine.likelihood_per_match <= 0.0 {
            return Err(AppError::ConfigError(
                "engine.likelihood_per_match must be positive".to_string(),
            ));
        }
        validator.validate_at_least(self.engine.top_risks_limit, 1, "engine.top_risks_limit")?;
        validator.validate_at_least(self.engine.top_entities_limit, 1, "engine.top_entities_limit")?;

        validator.validate_range(
            self.transmission.min_edge_confidence,
            0.0,
            1.0,
            "transmission.min_edge_confidence",
        )?;
        if let Some(max_path_length) = self.transmission.max_path_length {
            validator.validate_at_least(max_path_length, 1, "transmission.max_path_length")?;
        }

        validator.validate_non_empty(&self.data.snapshot_path, "data.snapshot_path")?;
        validator.validate_non_empty(&self.logging.level, "logging.level")?;
        Ok(())
    }
}
