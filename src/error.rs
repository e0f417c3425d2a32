//! Error types for rMQTT-Values
//!
//! This module defines the error types used throughout the application.
//! The per-message pipeline itself never fails; these errors only surface
//! while compiling formats and loading configuration.

use thiserror::Error;

/// Replacement format compile errors
///
/// These are reported as warnings: the offending fragment is dropped and
/// compilation continues with the rest of the format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Level index is zero or not a number
    #[error("Invalid level index '{index}': indices are 1-based and must be greater than zero")]
    InvalidLevelIndex { index: String },

    /// Format ends with a lone backslash
    #[error("Dangling escape at offset {offset}")]
    DanglingEscape { offset: usize },
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Output serialization error
    #[error("Output error: {0}")]
    Output(String),

    /// Unknown handler requested
    #[error("Unknown handler '{0}'")]
    UnknownHandler(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Output(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Output(err.to_string())
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let err = FormatError::InvalidLevelIndex {
            index: "0".to_string(),
        };
        assert!(err.to_string().contains("'0'"));

        let err = FormatError::DanglingEscape { offset: 4 };
        assert_eq!(err.to_string(), "Dangling escape at offset 4");
    }

    #[test]
    fn test_app_error_from_config() {
        let err: AppError =
            crate::config::ConfigError::ValidationError("bad".to_string()).into();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("bad"));
    }
}
