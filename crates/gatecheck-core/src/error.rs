//! Error types for gatecheck-core

use thiserror::Error;

/// Result type alias using gatecheck-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gatecheck-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store cannot be opened or written. Callers must degrade to
    /// online-only operation and skip caching.
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot refresh failed; previously cached data is left intact
    #[error("Snapshot sync failed: {0}")]
    SyncFailed(String),

    /// Backend API error
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),
}
