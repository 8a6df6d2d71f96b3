//! Tests for Domain Services - XOR metric and distance ordering

use super::*;
use crate::domain::{Contact, Distance, NodeAddress, NodeId, Timestamp, NODE_ID_LEN};
use proptest::prelude::*;

fn make_node_id(first_byte: u8) -> NodeId {
    let mut bytes = [0u8; NODE_ID_LEN];
    bytes[0] = first_byte;
    NodeId::new(bytes)
}

fn make_contact(first_byte: u8, last_seen: u64) -> Contact {
    Contact::new(
        make_node_id(first_byte),
        NodeAddress::tcp("127.0.0.1", 7000 + first_byte as u16),
        Timestamp::new(last_seen),
    )
}

fn arb_node_id() -> impl Strategy<Value = NodeId> {
    prop::array::uniform20(any::<u8>()).prop_map(NodeId::new)
}

// =============================================================================
// Metric properties
// =============================================================================

proptest! {
    #[test]
    fn prop_xor_distance_is_symmetric(a in arb_node_id(), b in arb_node_id()) {
        prop_assert_eq!(xor_distance(&a, &b), xor_distance(&b, &a));
    }

    #[test]
    fn prop_xor_distance_to_self_is_zero(a in arb_node_id()) {
        prop_assert_eq!(xor_distance(&a, &a), Distance::ZERO);
        prop_assert_eq!(shared_prefix_len(&a, &a), 160);
    }

    #[test]
    fn prop_distinct_ids_have_nonzero_distance(a in arb_node_id(), b in arb_node_id()) {
        prop_assume!(a != b);
        prop_assert!(!xor_distance(&a, &b).is_zero());
    }

    #[test]
    fn prop_longer_shared_prefix_means_closer(
        target in arb_node_id(),
        a in arb_node_id(),
        b in arb_node_id(),
    ) {
        let pa = shared_prefix_len(&target, &a);
        let pb = shared_prefix_len(&target, &b);
        prop_assume!(pa != pb);
        let closer_by_prefix = pa > pb;
        let closer_by_distance = xor_distance(&target, &a) < xor_distance(&target, &b);
        prop_assert_eq!(closer_by_prefix, closer_by_distance);
    }
}

#[test]
fn test_shared_prefix_len_finds_highest_differing_bit() {
    let a = make_node_id(0b1010_0000);
    let b = make_node_id(0b1011_0000);
    assert_eq!(shared_prefix_len(&a, &b), 3);

    let c = make_node_id(0b0010_0000);
    assert_eq!(shared_prefix_len(&a, &c), 0);
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn test_sort_by_distance_closest_first() {
    let target = make_node_id(0b1000_0000);
    let mut contacts = vec![
        make_contact(0b0000_0001, 10),
        make_contact(0b1000_0001, 10),
        make_contact(0b1100_0000, 10),
    ];

    sort_by_distance(&mut contacts, &target);

    assert_eq!(contacts[0].node_id, make_node_id(0b1000_0001));
    assert_eq!(contacts[1].node_id, make_node_id(0b1100_0000));
    assert_eq!(contacts[2].node_id, make_node_id(0b0000_0001));
}

#[test]
fn test_distance_ties_prefer_most_recently_seen() {
    let target = make_node_id(0x40);
    let older = make_contact(0x41, 100);
    let mut newer = make_contact(0x41, 200);
    newer.address = NodeAddress::tcp("10.0.0.9", 9000);

    let mut contacts = vec![older.clone(), newer.clone()];
    sort_by_distance(&mut contacts, &target);

    assert_eq!(contacts[0], newer);
    assert_eq!(contacts[1], older);
}

#[test]
fn test_find_k_closest_truncates() {
    let target = make_node_id(0);
    let contacts: Vec<_> = (1..=10).map(|i| make_contact(i, 1)).collect();

    let closest = find_k_closest(&contacts, &target, 3);

    assert_eq!(closest.len(), 3);
    assert_eq!(closest[0].node_id, make_node_id(1));
    assert_eq!(closest[1].node_id, make_node_id(2));
    assert_eq!(closest[2].node_id, make_node_id(3));
}
