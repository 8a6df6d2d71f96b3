//! Main RoutingTable implementation.

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::domain::{
    shared_prefix_len, sort_by_distance, Contact, DhtError, KademliaConfig, NodeId, Timestamp,
};

use super::bucket::KBucket;
use super::config::MAX_BUCKETS;
use super::stats::{Admission, InsertOutcome, RoutingTableStats};

/// The Kademlia routing table of one node.
///
/// Buckets are keyed by shared-prefix length with the local id: bucket `i`
/// (for `i < len - 1`) holds contacts sharing exactly `i` leading bits, and
/// the last bucket holds everything sharing at least `len - 1` bits. Only
/// that last bucket covers the local node's own range, so it is the only
/// one that splits.
///
/// # Concurrency
/// Each bucket sits behind its own mutex, so mutations on one bucket never
/// interleave while different buckets proceed in parallel. The outer
/// `RwLock` is taken for writing only to split. No lock is held across a
/// suspension point: liveness challenges go through
/// [`RoutingTable::admit`] / [`RoutingTable::resolve_challenge`].
#[derive(Debug)]
pub struct RoutingTable {
    /// Our own node ID (immutable after creation)
    local_node_id: NodeId,
    /// Buckets ordered by shared-prefix length
    buckets: RwLock<Vec<Mutex<KBucket>>>,
    /// Configuration (k is the bucket capacity)
    config: KademliaConfig,
}

impl RoutingTable {
    /// Create a new routing table with a single bucket covering the whole
    /// identifier space.
    pub fn new(local_node_id: NodeId, config: KademliaConfig) -> Self {
        Self {
            local_node_id,
            buckets: RwLock::new(vec![Mutex::new(KBucket::new())]),
            config,
        }
    }

    /// Get our local node ID
    pub fn local_node_id(&self) -> &NodeId {
        &self.local_node_id
    }

    /// Get the configuration
    pub fn config(&self) -> &KademliaConfig {
        &self.config
    }

    /// Bucket index owning `node_id` given the current bucket count.
    fn index_for(&self, bucket_count: usize, node_id: &NodeId) -> usize {
        shared_prefix_len(&self.local_node_id, node_id).min(bucket_count - 1)
    }

    /// First step of an insert; never blocks on the network.
    ///
    /// Known contacts are refreshed (their address replaced by the newer
    /// one). New contacts are appended if the owning bucket has room; a
    /// full bucket covering the local range is split and the insert
    /// retried; any other full bucket yields [`Admission::Challenge`].
    pub fn admit(&self, contact: Contact, now: Timestamp) -> Result<Admission, DhtError> {
        if contact.node_id == self.local_node_id {
            return Err(DhtError::SelfInsertion);
        }

        loop {
            let bucket_count = {
                let buckets = self.buckets.read();
                let idx = self.index_for(buckets.len(), &contact.node_id);
                let mut bucket = buckets[idx].lock();

                if bucket.refresh(&contact.node_id, Some(&contact.address), now) {
                    return Ok(Admission::Refreshed);
                }

                if !bucket.is_full(self.config.k) {
                    let mut contact = contact;
                    contact.last_seen = now;
                    contact.failures = 0;
                    bucket.push(contact);
                    return Ok(Admission::Inserted);
                }

                let splittable = idx == buckets.len() - 1 && buckets.len() < MAX_BUCKETS;
                if !splittable {
                    let lru = bucket
                        .least_recent()
                        .cloned()
                        .ok_or(DhtError::NotFound)?;
                    return Ok(Admission::Challenge { lru });
                }

                buckets.len()
            };

            self.split_last(bucket_count);
        }
    }

    /// Split the last bucket at the next bit. `expected_len` guards against
    /// a concurrent split having happened in between.
    fn split_last(&self, expected_len: usize) {
        let mut buckets = self.buckets.write();
        if buckets.len() != expected_len || buckets.len() >= MAX_BUCKETS {
            return;
        }

        let depth = buckets.len() - 1;
        let local = self.local_node_id;
        let Some(last) = buckets.last_mut() else {
            return;
        };
        let last = last.get_mut();

        let (stay, moved): (Vec<Contact>, Vec<Contact>) = last
            .contacts
            .drain(..)
            .partition(|c| shared_prefix_len(&local, &c.node_id) == depth);
        last.contacts = stay;

        let mut next = KBucket::new();
        next.contacts = moved;

        debug!(
            depth,
            kept = last.contacts.len(),
            moved = next.contacts.len(),
            "split routing table bucket"
        );
        buckets.push(Mutex::new(next));
    }

    /// Second step of an insert, after the challenged `lru` contact was
    /// pinged.
    ///
    /// A dead `lru` is evicted and `candidate` takes its place; a live one
    /// is refreshed and `candidate` is rejected. Bucket state is re-read, so
    /// concurrent changes since [`RoutingTable::admit`] are respected.
    pub fn resolve_challenge(
        &self,
        lru: &NodeId,
        lru_alive: bool,
        candidate: Contact,
        now: Timestamp,
    ) -> InsertOutcome {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), &candidate.node_id);
        let mut bucket = buckets[idx].lock();

        if bucket.refresh(&candidate.node_id, Some(&candidate.address), now) {
            return InsertOutcome::Inserted;
        }

        let evicted = if lru_alive {
            bucket.refresh(lru, None, now);
            false
        } else {
            bucket.remove(lru).is_some()
        };

        if bucket.is_full(self.config.k) {
            return InsertOutcome::RejectedFull;
        }

        let mut candidate = candidate;
        candidate.last_seen = now;
        candidate.failures = 0;
        bucket.push(candidate);

        if evicted {
            InsertOutcome::Replaced
        } else {
            InsertOutcome::Inserted
        }
    }

    /// Refresh last-seen for a known contact; no-op if absent.
    pub fn touch(&self, node_id: &NodeId, now: Timestamp) -> bool {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), node_id);
        let refreshed = buckets[idx].lock().refresh(node_id, None, now);
        refreshed
    }

    /// Count one failed exchange with a known contact.
    ///
    /// Returns the new consecutive failure count, or `None` if unknown.
    pub fn record_failure(&self, node_id: &NodeId) -> Option<u32> {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), node_id);
        let count = buckets[idx].lock().record_failure(node_id);
        count
    }

    /// Unconditional eviction of a contact confirmed dead.
    pub fn remove(&self, node_id: &NodeId) -> Option<Contact> {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), node_id);
        let removed = buckets[idx].lock().remove(node_id);
        removed
    }

    /// Look up a single contact.
    pub fn get(&self, node_id: &NodeId) -> Option<Contact> {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), node_id);
        let contact = buckets[idx].lock().get(node_id).cloned();
        contact
    }

    /// Check if a contact is known.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        let buckets = self.buckets.read();
        let idx = self.index_for(buckets.len(), node_id);
        let found = buckets[idx].lock().contains(node_id);
        found
    }

    /// Up to `limit` contacts ordered by ascending XOR distance to `target`,
    /// ties broken most-recently-seen first.
    ///
    /// Scans outward from the target's own bucket: first that bucket, then
    /// every deeper bucket (all equally far at the first differing bit),
    /// then shallower buckets one at a time, stopping as soon as a complete
    /// distance class has filled `limit`.
    pub fn closest_to(&self, target: &NodeId, limit: usize) -> Vec<Contact> {
        if limit == 0 {
            return Vec::new();
        }

        let buckets = self.buckets.read();
        let n = buckets.len();
        let t = self.index_for(n, target);

        let mut groups: Vec<Vec<usize>> = Vec::with_capacity(t + 2);
        groups.push(vec![t]);
        if t + 1 < n {
            groups.push((t + 1..n).collect());
        }
        groups.extend((0..t).rev().map(|i| vec![i]));

        let mut found: Vec<Contact> = Vec::new();
        for group in groups {
            for idx in group {
                found.extend(buckets[idx].lock().contacts().iter().cloned());
            }
            if found.len() >= limit {
                break;
            }
        }
        drop(buckets);

        sort_by_distance(&mut found, target);
        found.truncate(limit);
        found
    }

    /// Every contact in the table, bucket by bucket.
    pub fn all_contacts(&self) -> Vec<Contact> {
        self.buckets
            .read()
            .iter()
            .flat_map(|b| b.lock().contacts().to_vec())
            .collect()
    }

    /// Get total contact count across all buckets
    pub fn len(&self) -> usize {
        self.buckets.read().iter().map(|b| b.lock().len()).sum()
    }

    /// True if no contact is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Snapshot of one bucket by index.
    pub fn bucket(&self, index: usize) -> Option<KBucket> {
        self.buckets.read().get(index).map(|b| b.lock().clone())
    }

    /// Get routing table statistics
    pub fn stats(&self, now: Timestamp) -> RoutingTableStats {
        let buckets = self.buckets.read();
        let mut stats = RoutingTableStats {
            bucket_count: buckets.len(),
            ..Default::default()
        };

        for bucket in buckets.iter() {
            let bucket = bucket.lock();
            stats.total_contacts += bucket.len();
            if !bucket.is_empty() {
                stats.buckets_used += 1;
            }
            if let Some(oldest) = bucket.least_recent() {
                stats.oldest_contact_age_secs =
                    stats.oldest_contact_age_secs.max(now.secs_since(oldest.last_seen));
            }
        }

        stats
    }
}
