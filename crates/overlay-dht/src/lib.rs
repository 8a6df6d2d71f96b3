//! # Overlay DHT
//!
//! Kademlia routing and node discovery for a storage network overlay.
//!
//! Every node carries a 160-bit [`NodeId`]. Distance between identifiers
//! is their XOR, and each node keeps a [`RoutingTable`] of k-buckets split
//! around its own identifier. An [`OverlayCache`] in front of the
//! [`LookupProtocol`] answers "where is node X?" from a persistent address
//! book and only walks the network on a miss. The [`LookupService`] is the
//! external request handler on top.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Pure Kademlia logic (XOR distance, k-buckets, routing table)
//! - **Ports Layer:** Traits for transport, storage, clocks and the external API
//! - **Protocol Layer:** Ping, FindNode, iterative lookup and bootstrap
//! - **Cache Layer:** Persistent address book with discovery on miss
//! - **Service Layer:** Validation and the external wire shapes
//! - **Adapters Layer:** In-memory and RocksDB stores, clocks, config loading
//!
//! ## Example
//!
//! ```rust
//! use overlay_dht::{Contact, KademliaConfig, NodeAddress, NodeId, RoutingTable, Timestamp};
//!
//! let table = RoutingTable::new(NodeId::new([0u8; 20]), KademliaConfig::default());
//!
//! let peer = Contact::new(
//!     NodeId::new([0x80; 20]),
//!     NodeAddress::tcp("192.168.1.100", 7777),
//!     Timestamp::new(1000),
//! );
//! table.admit(peer, Timestamp::new(1000)).unwrap();
//!
//! let closest = table.closest_to(&NodeId::new([0xff; 20]), 1);
//! assert_eq!(closest.len(), 1);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod domain;
pub mod ports;
pub mod wire;

pub mod cache;
pub mod protocol;
pub mod service;

/// Adapters for storage, time, identity and configuration.
/// The RocksDB store requires feature `rocksdb`; TOML loading requires `config`.
pub mod adapters;

/// Test utilities (clocks, ID generators, simulated network)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    Contact, DhtError, DhtResult, Distance, KBucket, KademliaConfig, LookupQuery, NodeAddress,
    NodeId, OverlayConfig, RoutingTable, RoutingTableStats, Timestamp, Transport, NODE_ID_LEN,
};

// Domain services
pub use domain::{find_k_closest, shared_prefix_len, sort_by_distance, xor_distance};

// Port traits
pub use ports::{
    ConfigProvider, KeyValueStore, NodeFilter, NodeIdGenerator, OverlayApi, ReputationScorer,
    RpcTransport, StorageError, TimeSource, TransportError,
};

// Layers
pub use cache::{BulkResult, ChooseCriteria, OverlayCache, OverlayError};
pub use protocol::{LookupOutcome, LookupProtocol};
pub use service::{ErrorResponse, LookupService, ServiceError};
pub use wire::{Node, RpcRequest, RpcResponse, WireAddress};

// =============================================================================
// ADAPTER RE-EXPORTS
// =============================================================================

pub use adapters::{InMemoryKVStore, RandomNodeIdGenerator, StaticConfigProvider, SystemTimeSource};

#[cfg(feature = "config")]
pub use adapters::{ConfigError, TomlConfigProvider};

#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};

// =============================================================================
// TEST UTILITIES (Requires `test-utils` feature)
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{FixedTimeSource, SimulatedNetwork};
