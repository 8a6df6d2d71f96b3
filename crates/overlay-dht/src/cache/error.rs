//! Overlay cache errors.

use thiserror::Error;

use crate::domain::DhtError;
use crate::ports::StorageError;

/// Errors returned by the overlay cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// Neither the store nor the network knows the node. Never cached.
    #[error("node not found")]
    NotFound,

    /// The backing store failed. Routing keeps working without it.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lookup or bootstrap failure other than a plain miss.
    #[error("lookup error: {0}")]
    Lookup(DhtError),

    /// A record could not be encoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl From<DhtError> for OverlayError {
    fn from(e: DhtError) -> Self {
        match e {
            DhtError::NotFound => OverlayError::NotFound,
            other => OverlayError::Lookup(other),
        }
    }
}

/// Result type for overlay cache operations.
pub type OverlayResult<T> = Result<T, OverlayError>;
