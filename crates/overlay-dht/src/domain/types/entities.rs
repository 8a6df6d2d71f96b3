//! Core Domain Entities for the Overlay
//!
//! Node identities, addresses and the routing-table contact record.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::errors::DhtError;

/// Width of a node identifier in bytes (160 bits).
pub const NODE_ID_LEN: usize = 20;

/// Width of a node identifier in bits.
pub const NODE_ID_BITS: usize = NODE_ID_LEN * 8;

/// 160-bit opaque node identifier.
///
/// Immutable once assigned. Identifiers are only ever compared through the
/// XOR metric (see [`crate::domain::xor_distance`]); the derived `Ord` exists
/// so identifiers can key ordered collections and must not be read as
/// closeness.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    /// Create a NodeId from a raw 20-byte array.
    pub fn new(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a NodeId from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DhtError> {
        let arr: [u8; NODE_ID_LEN] = bytes
            .try_into()
            .map_err(|_| DhtError::InvalidNodeId { len: bytes.len() })?;
        Ok(Self(arr))
    }

    /// Underlying bytes, used as the storage key and for XOR distance.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// All-zero identifier.
    pub fn zero() -> Self {
        Self([0u8; NODE_ID_LEN])
    }

    /// Lowercase hex rendering for logs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Transport kind a node is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    /// Plain TCP (the only transport the overlay currently tags).
    #[default]
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Parsed network address of a node: transport tag plus host and port.
///
/// The host is kept as text so DNS names (e.g. the intro node) survive
/// until the transport resolves them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    /// Transport kind.
    pub transport: Transport,
    /// Hostname or IP literal (IPv6 without brackets).
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl NodeAddress {
    /// Create a TCP address.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            transport: Transport::Tcp,
            host: host.into(),
            port,
        }
    }

    /// Parse a `"host:port"` string (IPv6 hosts in brackets).
    pub fn parse(transport: Transport, address: &str) -> Result<Self, DhtError> {
        let malformed = |reason: &str| DhtError::MalformedAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing port"))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| malformed("unterminated IPv6 bracket"))?,
            None if host.contains(':') => return Err(malformed("IPv6 host must be bracketed")),
            None => host,
        };

        if host.is_empty() {
            return Err(malformed("empty host"));
        }

        let port: u16 = port.parse().map_err(|_| malformed("invalid port"))?;

        Ok(Self {
            transport,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for NodeAddress {
    /// Renders `host:port`, bracketing IPv6 hosts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A remote node as tracked by the routing table.
///
/// Created on the first successful exchange with an unknown NodeId;
/// `last_seen` and `failures` change on every later interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Node identifier.
    pub node_id: NodeId,
    /// Where to reach it.
    pub address: NodeAddress,
    /// Last successful interaction. Zero for contacts only heard about
    /// second-hand.
    pub last_seen: Timestamp,
    /// Consecutive failed RPCs since the last success.
    pub failures: u32,
}

impl Contact {
    /// Create a contact with a clean failure record.
    pub fn new(node_id: NodeId, address: NodeAddress, last_seen: Timestamp) -> Self {
        Self {
            node_id,
            address,
            last_seen,
            failures: 0,
        }
    }

    /// Contact reported by another peer, never talked to directly.
    pub fn reported(node_id: NodeId, address: NodeAddress) -> Self {
        Self::new(node_id, address, Timestamp::new(0))
    }
}

/// Unix timestamp in seconds
///
/// Clamped to a reasonable maximum so hostile values cannot corrupt
/// recency ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Seconds elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
