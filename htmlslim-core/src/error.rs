//! Error types for the cleaning engine
//!
//! The passes themselves have almost no failure states; errors come from the
//! edges: malformed XHTML, configuration and the result cache.

use thiserror::Error;

/// Result type alias for cleaning operations
pub type CleanResult<T> = Result<T, CleanError>;

#[derive(Debug, Error)]
pub enum CleanError {
    /// Strict XHTML input could not be read as XML
    #[error("Malformed XHTML at byte {position}: {message}")]
    Xhtml { position: usize, message: String },

    #[error("Unknown cleaning profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<serde_yaml::Error> for CleanError {
    fn from(error: serde_yaml::Error) -> Self {
        CleanError::InvalidConfig(error.to_string())
    }
}

impl From<serde_json::Error> for CleanError {
    fn from(error: serde_json::Error) -> Self {
        CleanError::Cache(error.to_string())
    }
}

impl CleanError {
    /// Errors caused by the input document rather than the environment
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, CleanError::Xhtml { .. })
    }
}
