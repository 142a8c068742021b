use miette::Diagnostic;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Required environment variable is not set
    #[error("Missing required environment variable {key}")]
    #[diagnostic(
        code(steer::config::missing_var),
        help("Set {key} in the process environment before starting")
    )]
    MissingVar { key: String },

    /// Environment variable is set but cannot be parsed
    #[error("Invalid value for {key}: '{value}' (must be numeric)")]
    #[diagnostic(
        code(steer::config::invalid_value),
        help("Use a plain decimal value, e.g. WEIGHT_LATENCY=0.4 or PENALTY_TTL=15")
    )]
    InvalidValue { key: String, value: String },
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a MissingVar error
    pub fn missing_var(key: impl Into<String>) -> Self {
        Self::MissingVar { key: key.into() }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
