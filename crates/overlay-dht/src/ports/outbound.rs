//! # Driven Ports (Outbound SPI)
//!
//! Interfaces this crate **requires** the host application to implement.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Contact, KademliaConfig, NodeAddress, NodeId, OverlayConfig, Timestamp};
use crate::wire::{RpcRequest, RpcResponse};

/// Errors from a single RPC exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response before the deadline.
    #[error("rpc timed out")]
    Timeout,
    /// Remote end refused the connection.
    #[error("connection refused by peer")]
    ConnectionRefused,
    /// Any other I/O failure.
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// Request/response transport to other nodes.
///
/// The crate is agnostic to the serialization used on the wire; an
/// implementation only needs to deliver `request` to `to` and return the
/// peer's answer within `timeout`.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: lookups fan out probes from
/// many tasks at once.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(
        &self,
        to: &NodeAddress,
        request: RpcRequest,
        timeout: Duration,
    ) -> Result<RpcResponse, TransportError>;
}

/// Errors from the backing key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Underlying engine failure.
    #[error("storage i/o error: {0}")]
    Io(String),
    /// Stored bytes could not be interpreted.
    #[error("corrupt storage record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy sequence of `(key, value)` pairs in key order.
pub type KvIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Ordered key-value store backing the overlay cache.
///
/// Keys are raw NodeId bytes; values are opaque serialized records.
/// Methods take `&self` so one store can be shared behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or overwrite a value.
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Iterate over all entries whose key starts with `prefix`.
    fn iterate(&self, prefix: &[u8]) -> KvIter<'_>;
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Source of fresh node identifiers (self identity, random lookup targets).
pub trait NodeIdGenerator: Send + Sync {
    /// Produce a new identifier.
    fn generate(&self) -> NodeId;
}

/// Optional reputation collaborator used to rank Choose candidates.
pub trait ReputationScorer: Send + Sync {
    /// Higher is better.
    fn score(&self, node_id: &NodeId) -> f64;
}

/// Caller-supplied eligibility predicate for Choose.
pub trait NodeFilter: Send + Sync {
    /// Whether `contact` can serve a request needing `min_free` units of
    /// free space or bandwidth.
    fn is_eligible(&self, contact: &Contact, min_free: u64) -> bool;
}

/// Abstract interface for configuration loading.
///
/// Allows different configuration sources (file, environment, etc.)
pub trait ConfigProvider: Send + Sync {
    /// Full node configuration.
    fn get_overlay_config(&self) -> OverlayConfig;

    /// Seeds to bootstrap from, falling back to the intro node.
    fn get_bootstrap_nodes(&self) -> Vec<NodeAddress> {
        self.get_overlay_config().bootstrap_seeds()
    }

    /// Get Kademlia configuration parameters.
    fn get_kademlia_config(&self) -> KademliaConfig {
        self.get_overlay_config().kademlia
    }
}
