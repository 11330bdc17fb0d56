use thiserror::Error;

/// Top-level error type for the Refdesk system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for RefdeskError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RefdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RefdeskError {
    fn from(err: toml::de::Error) -> Self {
        RefdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RefdeskError {
    fn from(err: toml::ser::Error) -> Self {
        RefdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RefdeskError {
    fn from(err: serde_json::Error) -> Self {
        RefdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Refdesk operations.
pub type Result<T> = std::result::Result<T, RefdeskError>;
