//! Error types for model_sync

use thiserror::Error;

/// Result type for model_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for model_sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A DDL statement failed. The batch it belonged to was rolled back.
    #[error("Execution error at statement {position} ({statement}): {source}")]
    ExecutionError {
        statement: String,
        position: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Introspection error: {0}")]
    IntrospectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl Error {
    /// Shorthand for building a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::ValidationError(message.into())
    }
}

/// Convert Serde JSON errors to model_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to model_sync errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to model_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
