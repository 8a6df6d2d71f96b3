//! Tests for the lookup service façade.

use std::sync::Arc;

use super::*;
use crate::adapters::InMemoryKVStore;
use crate::cache::OverlayCache;
use crate::domain::{KademliaConfig, NodeAddress, NodeId, OverlayConfig, Transport, NODE_ID_LEN};
use crate::ports::{KeyValueStore, OverlayApi};
use crate::protocol::LookupProtocol;
use crate::test_utils::{ControllableTimeSource, SimulatedNetwork};
use crate::wire::Node;

const MAX_CHOOSE: usize = 5;

fn make_node_id(prefix: u8, tag: u8) -> NodeId {
    let mut bytes = [0u8; NODE_ID_LEN];
    bytes[0] = prefix;
    bytes[NODE_ID_LEN - 1] = tag;
    NodeId::new(bytes)
}

fn make_address(prefix: u8, tag: u8) -> NodeAddress {
    NodeAddress::tcp(format!("10.{prefix}.0.{tag}"), 7777)
}

struct Fixture {
    net: Arc<SimulatedNetwork>,
    clock: Arc<ControllableTimeSource>,
    store: Arc<InMemoryKVStore>,
    node: Arc<LookupProtocol>,
    service: LookupService,
}

impl Fixture {
    fn new() -> Self {
        let net = SimulatedNetwork::new();
        let clock = Arc::new(ControllableTimeSource::new(1000));
        let node = net.spawn_node(
            make_node_id(0x00, 1),
            make_address(0x00, 1),
            KademliaConfig::for_testing(),
            clock.clone(),
        );
        let store = Arc::new(InMemoryKVStore::new());
        let cache = Arc::new(OverlayCache::new(store.clone(), node.clone(), 3600));
        Self {
            net,
            clock,
            store,
            node,
            service: LookupService::new(cache, MAX_CHOOSE),
        }
    }

    fn peer(&self, prefix: u8, tag: u8) -> Arc<LookupProtocol> {
        self.net.spawn_node(
            make_node_id(prefix, tag),
            make_address(prefix, tag),
            KademliaConfig::for_testing(),
            self.clock.clone(),
        )
    }
}

async fn link(from: &LookupProtocol, to: &LookupProtocol) {
    from.insert(to.local_contact().clone()).await.unwrap();
}

// =============================================================================
// Test Group 1: Lookup
// =============================================================================

#[tokio::test]
async fn test_lookup_hit_returns_wire_node() {
    let fx = Fixture::new();
    let id = make_node_id(0x80, 1);
    fx.service.cache().put(&id, &make_address(0x80, 1)).unwrap();

    let node = fx.service.lookup(id.as_bytes()).await.unwrap();

    assert_eq!(node.id, id.as_bytes().to_vec());
    assert_eq!(node.address.transport, Transport::Tcp);
    assert_eq!(node.address.address, "10.128.0.1:7777");
    assert_eq!(fx.net.calls(), 0);
}

#[tokio::test]
async fn test_lookup_rejects_malformed_ids() {
    let fx = Fixture::new();

    let empty = fx.service.lookup(&[]).await;
    let short = fx.service.lookup(&[1, 2, 3]).await;

    assert!(matches!(empty, Err(ServiceError::InvalidArgument(_))));
    assert!(matches!(short, Err(ServiceError::InvalidArgument(_))));
    assert_eq!(fx.net.calls(), 0);
}

#[tokio::test]
async fn test_lookup_unknown_id_is_not_found() {
    let fx = Fixture::new();
    let b = fx.peer(0x80, 1);
    link(&fx.node, &b).await;

    let result = fx.service.lookup(make_node_id(0x42, 7).as_bytes()).await;

    assert_eq!(result, Err(ServiceError::NotFound));
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn test_lookup_discovers_through_network() {
    let fx = Fixture::new();
    let b = fx.peer(0x80, 1);
    let c = fx.peer(0xc0, 1);
    link(&fx.node, &b).await;
    link(&b, &c).await;

    let node = fx.service.lookup(c.local_id().as_bytes()).await.unwrap();

    assert_eq!(node, Node::from(c.local_contact()));
    assert!(fx.store.get(c.local_id().as_bytes()).unwrap().is_some());
}

// =============================================================================
// Test Group 2: Bulk Lookup
// =============================================================================

#[tokio::test]
async fn test_bulk_lookup_preserves_input_order() {
    let fx = Fixture::new();
    let a = make_node_id(0x80, 1);
    let c = make_node_id(0x40, 1);
    fx.service.cache().put(&a, &make_address(0x80, 1)).unwrap();
    fx.service.cache().put(&c, &make_address(0x40, 1)).unwrap();
    let unknown = make_node_id(0x20, 9);

    let ids = vec![
        a.as_bytes().to_vec(),
        unknown.as_bytes().to_vec(),
        c.as_bytes().to_vec(),
    ];
    let results = fx.service.bulk_lookup(&ids).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0], Ok(Node::new(&a, &make_address(0x80, 1))));
    assert_eq!(results[1], Err(ServiceError::NotFound));
    assert_eq!(results[2], Ok(Node::new(&c, &make_address(0x40, 1))));
}

#[tokio::test]
async fn test_bulk_lookup_reports_invalid_entries_in_place() {
    let fx = Fixture::new();
    let a = make_node_id(0x80, 1);
    fx.service.cache().put(&a, &make_address(0x80, 1)).unwrap();

    let ids = vec![Vec::new(), a.as_bytes().to_vec(), vec![0xff; 3]];
    let results = fx.service.bulk_lookup(&ids).await;

    assert!(matches!(results[0], Err(ServiceError::InvalidArgument(_))));
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(ServiceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_bulk_lookup_of_nothing_is_empty() {
    let fx = Fixture::new();

    assert!(fx.service.bulk_lookup(&[]).await.is_empty());
    assert_eq!(fx.net.calls(), 0);
}

// =============================================================================
// Test Group 3: Choose
// =============================================================================

#[tokio::test]
async fn test_choose_validates_count() {
    let fx = Fixture::new();

    let zero = fx.service.choose(0, 0).await;
    let too_many = fx.service.choose(MAX_CHOOSE + 1, 0).await;

    assert!(matches!(zero, Err(ServiceError::InvalidArgument(_))));
    assert!(matches!(too_many, Err(ServiceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_choose_returns_known_nodes() {
    let fx = Fixture::new();
    let b = fx.peer(0x80, 1);
    let c = fx.peer(0x40, 1);
    link(&fx.node, &b).await;
    link(&fx.node, &c).await;

    let chosen = fx.service.choose(2, 0).await.unwrap();

    assert_eq!(chosen.len(), 2);
    assert!(chosen.iter().all(|n| n.id != fx.node.local_id().as_bytes().to_vec()));
    assert!(chosen.contains(&Node::from(b.local_contact())));
    assert!(chosen.contains(&Node::from(c.local_contact())));
}

// =============================================================================
// Test Group 4: FindNode
// =============================================================================

#[tokio::test]
async fn test_find_node_bypasses_cache() {
    let fx = Fixture::new();
    let b = fx.peer(0x80, 1);
    let c = fx.peer(0xc0, 1);
    link(&fx.node, &b).await;
    link(&b, &c).await;

    let node = fx.service.find_node(c.local_id().as_bytes()).await.unwrap();

    assert_eq!(node, Node::from(c.local_contact()));
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn test_find_node_unknown_is_not_found() {
    let fx = Fixture::new();
    let b = fx.peer(0x80, 1);
    link(&fx.node, &b).await;

    let result = fx.service.find_node(make_node_id(0x42, 7).as_bytes()).await;

    assert_eq!(result, Err(ServiceError::NotFound));
}

#[tokio::test]
async fn test_find_node_rejects_empty_id() {
    let fx = Fixture::new();

    let result = fx.service.find_node(&[]).await;

    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
}

// =============================================================================
// Test Group 5: Start and Errors
// =============================================================================

#[tokio::test]
async fn test_start_bootstraps_once() {
    let fx = Fixture::new();
    let seed = fx.peer(0x80, 1);
    let config = OverlayConfig {
        seeds: vec![seed.local_contact().address.clone()],
        ..OverlayConfig::default()
    };

    assert_eq!(fx.service.start(&config).await, Ok(1));
    assert!(fx.node.routing_table().contains(seed.local_id()));

    fx.net.reset_calls();
    assert_eq!(fx.service.start(&config).await, Ok(0));
    assert_eq!(fx.net.calls(), 0);
}

#[tokio::test]
async fn test_start_without_reachable_seeds_fails() {
    let fx = Fixture::new();

    // No seeds configured: the intro node is tried and is unknown here.
    let result = fx.service.start(&OverlayConfig::default()).await;

    assert!(matches!(result, Err(ServiceError::Internal(_))));
    assert!(fx.node.routing_table().is_empty());
}

#[test]
fn test_error_codes_are_distinct() {
    let errors = [
        ServiceError::NotFound,
        ServiceError::InvalidArgument("x".to_string()),
        ServiceError::Storage("x".to_string()),
        ServiceError::Internal("x".to_string()),
    ];
    let mut codes: Vec<i32> = errors.iter().map(ServiceError::code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());

    let response = ErrorResponse::from(&ServiceError::NotFound);
    assert_eq!(response.code, ServiceError::NotFound.code());
    assert_eq!(response.message, "node not found");
}
