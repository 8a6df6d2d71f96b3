//! Contact sorting and selection.

use std::cmp::Ordering;

use super::distance::xor_distance;
use crate::domain::{Contact, NodeId};

/// Closeness order of two contacts relative to `target`.
///
/// Ascending XOR distance; ties go to the most recently seen contact.
pub fn compare_by_distance(a: &Contact, b: &Contact, target: &NodeId) -> Ordering {
    let dist_a = xor_distance(&a.node_id, target);
    let dist_b = xor_distance(&b.node_id, target);
    dist_a
        .cmp(&dist_b)
        .then_with(|| b.last_seen.cmp(&a.last_seen))
}

/// Sort contacts in place by XOR distance from a target (closest first).
pub fn sort_by_distance(contacts: &mut [Contact], target: &NodeId) {
    contacts.sort_by(|a, b| compare_by_distance(a, b, target));
}

/// Find the k closest contacts to a target from a list
///
/// # Returns
/// Up to k contacts sorted by distance (closest first)
pub fn find_k_closest(contacts: &[Contact], target: &NodeId, k: usize) -> Vec<Contact> {
    let mut sorted = contacts.to_vec();
    sort_by_distance(&mut sorted, target);
    sorted.truncate(k);
    sorted
}
