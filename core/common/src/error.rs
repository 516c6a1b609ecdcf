//! Common error types for Offsync.

use thiserror::Error;

/// Top-level error type for Offsync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local adapter operation failed.
    #[error("Local store error: {0}")]
    LocalStore(String),

    /// Remote adapter operation failed.
    #[error("Remote transport error: {0}")]
    RemoteTransport(String),

    /// Missing or invalid configuration (TTL, primary-key resolution).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error is a configuration error.
    ///
    /// Configuration errors indicate programmer error rather than a
    /// runtime condition and are the one class that must not be
    /// swallowed at the orchestrator boundary.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
