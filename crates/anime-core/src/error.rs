use thiserror::Error;

/// Top-level error type for the anime assistant.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for AnimeError` (or the reverse) so that the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AnimeError {
    fn from(err: toml::de::Error) -> Self {
        AnimeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AnimeError {
    fn from(err: toml::ser::Error) -> Self {
        AnimeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AnimeError {
    fn from(err: serde_json::Error) -> Self {
        AnimeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for anime assistant operations.
pub type Result<T> = std::result::Result<T, AnimeError>;
