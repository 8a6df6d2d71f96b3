//! # Driving Ports (Inbound API)
//!
//! The lookup API this crate exposes to local callers and remote peers.

use async_trait::async_trait;

use crate::service::ServiceError;
use crate::wire::Node;

/// Network-facing lookup API.
///
/// Identifiers arrive as raw bytes and are validated by the implementation;
/// results use the wire [`Node`] shape.
///
/// # Example
///
/// ```rust,ignore
/// use overlay_dht::ports::OverlayApi;
///
/// async fn resolve<T: OverlayApi>(api: &T, id: &[u8]) {
///     match api.lookup(id).await {
///         Ok(node) => println!("{} at {}", hex::encode(&node.id), node.address.address),
///         Err(e) => println!("lookup failed: {e}"),
///     }
/// }
/// ```
#[async_trait]
pub trait OverlayApi: Send + Sync {
    /// Resolve one node, from the cache or the network.
    async fn lookup(&self, id: &[u8]) -> Result<Node, ServiceError>;

    /// Resolve many nodes. One entry per input, in input order.
    async fn bulk_lookup(&self, ids: &[Vec<u8>]) -> Vec<Result<Node, ServiceError>>;

    /// Pick `count` distinct nodes with at least `free` capacity.
    async fn choose(&self, count: usize, free: u64) -> Result<Vec<Node>, ServiceError>;

    /// Network lookup for an exact node, bypassing the cache.
    async fn find_node(&self, id: &[u8]) -> Result<Node, ServiceError>;
}
