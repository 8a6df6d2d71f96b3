//! # Lookup Service
//!
//! The request-handling façade implementing [`OverlayApi`](crate::ports::OverlayApi).

mod api;
mod errors;

pub use api::LookupService;
pub use errors::{ErrorResponse, ServiceError};

#[cfg(test)]
mod tests;
