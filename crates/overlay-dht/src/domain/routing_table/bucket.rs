//! K-Bucket implementation for Kademlia routing.

use crate::domain::{Contact, NodeAddress, NodeId, Timestamp};

/// A k-bucket storing up to k contacts whose shared-prefix length with the
/// local node falls in this bucket's range.
///
/// Contacts are ordered least-recently-seen first; the tail is the
/// most-recently-seen end. A full bucket is never grown: a newcomer either
/// triggers a split (local range only) or a liveness challenge against
/// the head.
#[derive(Debug, Clone)]
pub struct KBucket {
    /// Contacts in this bucket (max size = K, default 20)
    pub(crate) contacts: Vec<Contact>,
}

impl KBucket {
    /// Create a new empty k-bucket
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
        }
    }

    /// Get the number of contacts in this bucket
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Check if the bucket is full
    pub fn is_full(&self, k: usize) -> bool {
        self.contacts.len() >= k
    }

    /// Least recently seen contact (eviction candidate)
    pub fn least_recent(&self) -> Option<&Contact> {
        self.contacts.first()
    }

    /// All contacts, least recently seen first
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Append a contact at the most-recently-seen end (assumes not full).
    pub(crate) fn push(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    /// Remove a contact by NodeId.
    pub(crate) fn remove(&mut self, node_id: &NodeId) -> Option<Contact> {
        self.contacts
            .iter()
            .position(|c| &c.node_id == node_id)
            .map(|pos| self.contacts.remove(pos))
    }

    /// Mark a contact alive: move it to the tail, stamp it and clear its
    /// failure count. When `address` is given the stored address is replaced.
    pub(crate) fn refresh(
        &mut self,
        node_id: &NodeId,
        address: Option<&NodeAddress>,
        now: Timestamp,
    ) -> bool {
        let Some(pos) = self.contacts.iter().position(|c| &c.node_id == node_id) else {
            return false;
        };
        let mut contact = self.contacts.remove(pos);
        contact.last_seen = now;
        contact.failures = 0;
        if let Some(address) = address {
            contact.address = address.clone();
        }
        self.contacts.push(contact);
        true
    }

    /// Count one failed exchange; returns the new consecutive count.
    pub(crate) fn record_failure(&mut self, node_id: &NodeId) -> Option<u32> {
        let contact = self.contacts.iter_mut().find(|c| &c.node_id == node_id)?;
        contact.failures = contact.failures.saturating_add(1);
        Some(contact.failures)
    }

    /// Look up a contact.
    pub(crate) fn get(&self, node_id: &NodeId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.node_id == node_id)
    }

    /// Check if bucket contains a contact
    pub(crate) fn contains(&self, node_id: &NodeId) -> bool {
        self.get(node_id).is_some()
    }
}

impl Default for KBucket {
    fn default() -> Self {
        Self::new()
    }
}
