//! Value Objects for the Overlay
//!
//! Distance, tuning parameters and the per-request lookup query.

use std::collections::HashSet;
use std::time::Duration;

use super::entities::{NodeAddress, NodeId, NODE_ID_BITS, NODE_ID_LEN};

/// XOR distance between two identifiers, as a 160-bit big-endian integer.
///
/// Ordering is numeric: a smaller distance means closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance(pub [u8; NODE_ID_LEN]);

impl Distance {
    /// Distance of an identifier to itself.
    pub const ZERO: Distance = Distance([0u8; NODE_ID_LEN]);

    /// Largest representable distance.
    pub const MAX: Distance = Distance([0xff; NODE_ID_LEN]);

    /// Number of leading zero bits, i.e. the shared-prefix length of the
    /// two identifiers that produced this distance (160 when equal).
    pub fn leading_zeros(&self) -> usize {
        for (i, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                return i * 8 + byte.leading_zeros() as usize;
            }
        }
        NODE_ID_BITS
    }

    /// True if the two identifiers were identical.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// Kademlia tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KademliaConfig {
    /// Bucket size and default lookup width (default: 20)
    pub k: usize,
    /// Concurrent probes per lookup round (default: 3)
    pub alpha: usize,
    /// Hard bound on lookup rounds (default: 20)
    pub max_rounds: usize,
    /// Deadline for a single RPC (default: 3s)
    pub rpc_timeout: Duration,
    /// Deadline for one lookup round (default: 5s)
    pub round_timeout: Duration,
    /// Consecutive failures before a contact is evicted (default: 3)
    pub failure_threshold: u32,
}

impl Default for KademliaConfig {
    fn default() -> Self {
        Self {
            k: 20,
            alpha: 3,
            max_rounds: 20,
            rpc_timeout: Duration::from_secs(3),
            round_timeout: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

impl KademliaConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self {
            k: 3,
            alpha: 2,
            max_rounds: 10,
            rpc_timeout: Duration::from_millis(200),
            round_timeout: Duration::from_millis(500),
            failure_threshold: 2,
        }
    }
}

/// Hostname of the well-known intro node.
pub const INTRO_NODE_HOST: &str = "bootstrap.storj.io";

/// Port of the well-known intro node.
pub const INTRO_NODE_PORT: u16 = 8080;

/// Well-known seed used when nothing else is configured.
pub fn default_intro_node() -> NodeAddress {
    NodeAddress::tcp(INTRO_NODE_HOST, INTRO_NODE_PORT)
}

/// Node-level overlay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Address this node advertises to peers.
    pub listen: NodeAddress,
    /// Seeds for bootstrap. Empty means the intro node.
    pub seeds: Vec<NodeAddress>,
    /// Routing and lookup parameters.
    pub kademlia: KademliaConfig,
    /// Age after which a cached address is refreshed (0 disables expiry).
    pub cache_ttl_secs: u64,
    /// Upper bound on `count` for a single Choose request.
    pub max_choose: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            listen: NodeAddress::tcp("127.0.0.1", 7777),
            seeds: Vec::new(),
            kademlia: KademliaConfig::default(),
            cache_ttl_secs: 3600,
            max_choose: 100,
        }
    }
}

impl OverlayConfig {
    /// Seeds to bootstrap from, falling back to the intro node.
    pub fn bootstrap_seeds(&self) -> Vec<NodeAddress> {
        if self.seeds.is_empty() {
            vec![default_intro_node()]
        } else {
            self.seeds.clone()
        }
    }
}

/// Transient description of one lookup request.
///
/// Created per request and dropped when it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// Identifier being searched for.
    pub target: NodeId,
    /// Maximum number of results.
    pub limit: usize,
    /// Identifiers that must not appear in the result.
    pub exclude: HashSet<NodeId>,
}

impl LookupQuery {
    /// Query for `limit` nodes closest to `target`.
    pub fn new(target: NodeId, limit: usize) -> Self {
        Self {
            target,
            limit,
            exclude: HashSet::new(),
        }
    }

    /// Exclude the given identifiers from results.
    #[must_use]
    pub fn excluding(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.exclude.extend(ids);
        self
    }
}
