//! Test utilities for the overlay.
//!
//! Deterministic clocks and identifier generators, plus an in-process
//! network that routes RPCs straight into other nodes' protocol handlers.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use overlay_dht::test_utils::FixedTimeSource;
//! use overlay_dht::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! assert_eq!(time_source.now().as_secs(), 1000);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{KademliaConfig, NodeAddress, NodeId, Timestamp, NODE_ID_LEN};
use crate::ports::outbound::{NodeIdGenerator, RpcTransport, TimeSource, TransportError};
use crate::protocol::LookupProtocol;
use crate::wire::{RpcRequest, RpcResponse};

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    /// Create a new fixed time source with the given timestamp (in seconds).
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }
}

/// A clock tests can move forward while it is shared.
#[derive(Debug, Default)]
pub struct ControllableTimeSource {
    secs: AtomicU64,
}

impl ControllableTimeSource {
    /// Start the clock at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ControllableTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

/// Deterministic identifiers: `prefix` in the first byte, a counter in the
/// last eight.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: u8,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Generator whose ids all start with `prefix`.
    pub fn new(prefix: u8) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }
}

impl NodeIdGenerator for SequentialIdGenerator {
    fn generate(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[0] = self.prefix;
        bytes[NODE_ID_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        NodeId::new(bytes)
    }
}

/// In-process network delivering RPCs to registered protocol instances.
///
/// Nodes are keyed by their advertised address and held weakly, so
/// dropping a node's last `Arc` takes it off the network. Every `send`
/// is counted, including ones to unknown or downed addresses.
#[derive(Default)]
pub struct SimulatedNetwork {
    nodes: RwLock<HashMap<NodeAddress, Weak<LookupProtocol>>>,
    down: RwLock<HashSet<NodeAddress>>,
    calls: AtomicUsize,
}

impl SimulatedNetwork {
    /// Create an empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a node attached to this network and register it.
    pub fn spawn_node(
        self: &Arc<Self>,
        id: NodeId,
        address: NodeAddress,
        config: KademliaConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Arc<LookupProtocol> {
        let transport: Arc<dyn RpcTransport> = self.clone();
        let node = Arc::new(LookupProtocol::new(
            id,
            address,
            config,
            transport,
            time_source,
        ));
        self.register(&node);
        node
    }

    /// Make `node` reachable at its advertised address.
    pub fn register(&self, node: &Arc<LookupProtocol>) {
        self.nodes
            .write()
            .insert(node.local_contact().address.clone(), Arc::downgrade(node));
    }

    /// Take an address offline or bring it back.
    pub fn set_down(&self, address: &NodeAddress, down: bool) {
        let mut set = self.down.write();
        if down {
            set.insert(address.clone());
        } else {
            set.remove(address);
        }
    }

    /// Number of `send` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reset the call counter.
    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl RpcTransport for SimulatedNetwork {
    async fn send(
        &self,
        to: &NodeAddress,
        request: RpcRequest,
        _timeout: Duration,
    ) -> Result<RpcResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.down.read().contains(to) {
            return Err(TransportError::ConnectionRefused);
        }
        let node = self.nodes.read().get(to).and_then(Weak::upgrade);
        let Some(node) = node else {
            return Err(TransportError::ConnectionRefused);
        };

        node.handle_request(request)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_time_source_returns_configured_value() {
        let source = FixedTimeSource::new(1000);
        assert_eq!(source.now().as_secs(), 1000);
    }

    #[test]
    fn test_controllable_time_source_advances() {
        let clock = ControllableTimeSource::new(100);
        clock.advance(50);
        assert_eq!(clock.now().as_secs(), 150);
        clock.set(10);
        assert_eq!(clock.now().as_secs(), 10);
    }

    #[test]
    fn test_sequential_ids_are_distinct_and_prefixed() {
        let ids = SequentialIdGenerator::new(0xa0);
        let a = ids.generate();
        let b = ids.generate();
        assert_ne!(a, b);
        assert_eq!(a.as_bytes()[0], 0xa0);
        assert_eq!(b.as_bytes()[NODE_ID_LEN - 1], 2);
    }

    #[tokio::test]
    async fn test_unknown_address_is_refused_and_counted() {
        let net = SimulatedNetwork::new();
        let result = net
            .send(
                &NodeAddress::tcp("10.0.0.1", 1),
                RpcRequest::Ping {
                    sender: crate::wire::Node::new(&NodeId::zero(), &NodeAddress::tcp("10.0.0.2", 1)),
                },
                Duration::from_millis(10),
            )
            .await;
        assert_eq!(result, Err(TransportError::ConnectionRefused));
        assert_eq!(net.calls(), 1);
    }
}
