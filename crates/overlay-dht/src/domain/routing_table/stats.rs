//! Routing table outcome and statistics types.

use crate::domain::Contact;

/// Result of the synchronous admission step of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Contact was new and the bucket had room.
    Inserted,
    /// Contact was already known; moved to the most-recently-seen end.
    Refreshed,
    /// Bucket is full and cannot split. The caller must ping `lru` and
    /// report back through `RoutingTable::resolve_challenge`.
    Challenge {
        /// Least-recently-seen contact of the full bucket.
        lru: Contact,
    },
}

/// Final outcome of inserting a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Contact now sits at the most-recently-seen end of its bucket.
    Inserted,
    /// Contact took the place of an unresponsive least-recently-seen one.
    Replaced,
    /// Bucket full and its least-recently-seen contact is alive.
    RejectedFull,
}

/// Statistics about the routing table state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTableStats {
    /// Total number of contacts in buckets
    pub total_contacts: usize,
    /// Number of buckets (grows by splitting)
    pub bucket_count: usize,
    /// Number of buckets with at least one contact
    pub buckets_used: usize,
    /// Age of the least recently seen contact in seconds
    pub oldest_contact_age_secs: u64,
}
