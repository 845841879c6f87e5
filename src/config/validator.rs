use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid range: {field} must be between {min} and {max}, got {value}")]
    InvalidRange { field: String, min: f64, max: f64, value: f64 },
    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Range and presence checks shared by settings and catalog validation.
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_range(&self, value: f64, min: f64, max: f64, field: &str) -> ValidationResult<()> {
        if !value.is_finite() || value < min || value > max {
            return Err(ValidationError::InvalidRange {
                field: field.to_string(),
                min,
                max,
                value,
            });
        }
        Ok(())
    }

    pub fn validate_at_least(&self, value: usize, min: usize, field: &str) -> ValidationResult<()> {
        if value < min {
            return Err(ValidationError::InvalidRange {
                field: field.to_string(),
                min: min as f64,
                max: f64::INFINITY,
                value: value as f64,
            });
        }
        Ok(())
    }

    pub fn validate_non_empty(&self, value: &str, field: &str) -> ValidationResult<()> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        let validator = ConfigValidator::new();

        assert!(validator.validate_range(0.5, 0.0, 1.0, "test").is_ok());
        assert!(validator.validate_range(-0.1, 0.0, 1.0, "test").is_err());
        assert!(validator.validate_range(1.5, 0.0, 1.0, "test").is_err());
        assert!(validator.validate_range(f64::NAN, 0.0, 1.0, "test").is_err());
    }

    #[test]
    fn test_at_least_validation() {
        let validator = ConfigValidator::new();

        assert!(validator.validate_at_least(1, 1, "count").is_ok());
        assert!(validator.validate_at_least(0, 1, "count").is_err());
    }

    #[test]
    fn test_non_empty_validation() {
        let validator = ConfigValidator::new();

        assert!(validator.validate_non_empty("info", "logging.level").is_ok());
        assert_eq!(
            validator.validate_non_empty("  ", "logging.level"),
            Err(ValidationError::MissingField("logging.level".to_string()))
        );
    }
}
