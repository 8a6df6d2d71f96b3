//! Persisted address book record.

use serde::{Deserialize, Serialize};

use super::error::{OverlayError, OverlayResult};
use crate::domain::{Contact, NodeAddress, NodeId, Timestamp};
use crate::ports::StorageError;
use crate::wire::Node;

/// What the store holds for one node, keyed by its raw id bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookEntry {
    /// Node record in wire form.
    pub node: Node,
    /// When the record was last written (unix seconds).
    pub refreshed_at: u64,
}

impl AddressBookEntry {
    /// Record for `id` at `address`, stamped `now`.
    pub fn new(id: &NodeId, address: &NodeAddress, now: Timestamp) -> Self {
        Self {
            node: Node::new(id, address),
            refreshed_at: now.as_secs(),
        }
    }

    /// Serialize with bincode.
    pub fn encode(&self) -> OverlayResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| OverlayError::Codec(e.to_string()))
    }

    /// Decode stored bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    /// Contact described by this record.
    pub fn contact(&self) -> Result<Contact, StorageError> {
        let mut contact =
            Contact::try_from(&self.node).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        contact.last_seen = Timestamp::new(self.refreshed_at);
        Ok(contact)
    }

    /// True once the record is older than `ttl_secs`. A zero TTL never
    /// expires.
    pub fn is_expired(&self, now: Timestamp, ttl_secs: u64) -> bool {
        ttl_secs != 0 && now.secs_since(Timestamp::new(self.refreshed_at)) > ttl_secs
    }
}
