//! Error types for the canopy cache
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! ## Soft-fail policy
//!
//! The cache favors well-defined fallback over propagation: nested reads
//! through scalars return the caller's default, nested deletes no-op, and
//! persistence write failures are logged rather than surfaced. These
//! variants exist for the places where an error is still worth naming:
//! durable-store I/O during hydration and malformed snapshot records.

use std::io;
use thiserror::Error;

/// Result type alias for canopy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the canopy cache
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the durable store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Durable record contents could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key is empty where a root segment is required
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Durable store rejected a snapshot write
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
