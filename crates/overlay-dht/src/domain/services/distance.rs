//! Kademlia distance calculations.

use crate::domain::{Distance, NodeId, NODE_ID_LEN};

/// XOR distance between two NodeIds.
///
/// - Symmetric: `xor_distance(a, b) == xor_distance(b, a)`
/// - Zero only for identical identifiers
pub fn xor_distance(a: &NodeId, b: &NodeId) -> Distance {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut out = [0u8; NODE_ID_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a_bytes[i] ^ b_bytes[i];
    }
    Distance(out)
}

/// Length of the common bit prefix of two identifiers (0..=160).
///
/// Equal to the position of the highest differing bit; this is the only
/// place identifier bits are read positionally, for bucket indexing.
#[inline]
pub fn shared_prefix_len(a: &NodeId, b: &NodeId) -> usize {
    xor_distance(a, b).leading_zeros()
}
