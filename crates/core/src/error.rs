//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("invalid chunk size: {size} (must be between {min} and {max})")]
    InvalidChunkSize { size: u64, min: u64, max: u64 },

    #[error("failed to read {what}: {source}")]
    Read {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
