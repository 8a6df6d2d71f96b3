//! Domain Errors for Routing and Lookup

use thiserror::Error;

/// Errors raised by the routing table and the lookup protocol.
///
/// Transient per-contact failures are absorbed inside an iterative lookup;
/// only whole-lookup failures reach callers as `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DhtError {
    /// Target is absent from the reachable network. Not retried.
    #[error("node not found")]
    NotFound,

    /// A single contact failed to respond (after one immediate retry).
    #[error("contact unreachable at {address}")]
    Unreachable {
        /// Address that was probed.
        address: String,
    },

    /// No seed responded during bootstrap. Fatal to node startup.
    #[error("bootstrap failed: none of {attempted} seeds reachable")]
    BootstrapFailed {
        /// Number of seeds that were tried.
        attempted: usize,
    },

    /// A discovered contact carries an address that cannot be parsed.
    #[error("malformed address {address:?}: {reason}")]
    MalformedAddress {
        /// Raw address text.
        address: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Identifier is not 20 bytes long.
    #[error("invalid node id length {len}, expected 20")]
    InvalidNodeId {
        /// Length that was supplied.
        len: usize,
    },

    /// Attempted to add the local node to its own routing table.
    #[error("cannot add local node to routing table")]
    SelfInsertion,
}

/// Result type for routing and lookup operations.
pub type DhtResult<T> = Result<T, DhtError>;
