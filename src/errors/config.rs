//! Environment configuration errors.

/// Errors raised while loading or validating `RelayerConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} environment variable is required")]
    MissingVariable { name: String },

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("Incomplete Tenderly configuration: {message}")]
    IncompleteTenderly { message: String },
}
