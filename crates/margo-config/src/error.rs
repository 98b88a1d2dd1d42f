//! # Config Error Types
//!
//! Failures while reading, parsing, validating or writing a pricing config.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Config Error Categories                            │
//! │                                                                         │
//! │  File system        Io, NoConfigPath                                   │
//! │  Format             Parse (TOML in), Serialize (TOML out), Json        │
//! │  Content            Invalid (CoreError from validate)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use margo_core::CoreError;
use thiserror::Error;

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing a file failed.
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML document is malformed or has wrong types.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// JSON input or output failed (catalog files, batch output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but does not validate.
    #[error("Invalid config: {0}")]
    Invalid(#[from] CoreError),

    /// No explicit path and no platform config directory.
    #[error("No config path available")]
    NoConfigPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_wraps_core_error() {
        let err: ConfigError = CoreError::InvalidConfig("rounding".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Invalid config: Invalid pricing configuration: rounding"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let parse_err = toml::from_str::<toml::Value>("tax_rate_bps = ").unwrap_err();
        let err: ConfigError = parse_err.into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
