//! External error shape of the lookup service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::OverlayError;
use crate::domain::DhtError;

/// Errors returned to callers of the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The requested node is not known to the reachable network.
    #[error("node not found")]
    NotFound,
    /// The request failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The address book store failed.
    #[error("storage failure: {0}")]
    Storage(String),
    /// Any other failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable JSON-RPC style error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => -32004,
            Self::InvalidArgument(_) => -32602,
            Self::Storage(_) => -32010,
            Self::Internal(_) => -32603,
        }
    }
}

impl From<OverlayError> for ServiceError {
    fn from(e: OverlayError) -> Self {
        match e {
            OverlayError::NotFound => Self::NotFound,
            OverlayError::Storage(e) => Self::Storage(e.to_string()),
            OverlayError::Lookup(e) => Self::from(e),
            OverlayError::Codec(msg) => Self::Internal(msg),
        }
    }
}

impl From<DhtError> for ServiceError {
    fn from(e: DhtError) -> Self {
        match e {
            DhtError::NotFound => Self::NotFound,
            DhtError::InvalidNodeId { .. } => Self::InvalidArgument(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Error as serialized in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(e: &ServiceError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}
