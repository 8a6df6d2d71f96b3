//! End-to-end lookups over an in-process network of overlay nodes.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing_subscriber::EnvFilter;

use overlay_dht::test_utils::{FixedTimeSource, SimulatedNetwork};
use overlay_dht::{
    xor_distance, DhtError, KademliaConfig, LookupProtocol, NodeAddress, NodeId, NODE_ID_LEN,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn random_id(rng: &mut StdRng) -> NodeId {
    let mut bytes = [0u8; NODE_ID_LEN];
    rng.fill_bytes(&mut bytes);
    NodeId::new(bytes)
}

/// Spawn `n` nodes; every node after the first bootstraps from the first.
async fn build_mesh(
    net: &Arc<SimulatedNetwork>,
    n: usize,
    config: &KademliaConfig,
    seed: u64,
) -> Vec<Arc<LookupProtocol>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let clock = Arc::new(FixedTimeSource::new(1_000));

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let address = NodeAddress::tcp(format!("10.0.{}.{}", i / 250, i % 250 + 1), 7777);
        let node = net.spawn_node(random_id(&mut rng), address, config.clone(), clock.clone());
        nodes.push(node);
    }

    let seed_address = nodes[0].local_contact().address.clone();
    for node in nodes.iter().skip(1) {
        node.bootstrap(std::slice::from_ref(&seed_address))
            .await
            .expect("seed is reachable");
    }
    nodes
}

fn brute_force_closest(nodes: &[Arc<LookupProtocol>], target: &NodeId, limit: usize) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = nodes.iter().map(|n| *n.local_id()).collect();
    ids.sort_by_key(|id| xor_distance(id, target));
    ids.truncate(limit);
    ids
}

#[tokio::test]
async fn test_small_network_lookup_returns_true_closest() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let config = KademliaConfig::default();
    let nodes = build_mesh(&net, 15, &config, 7).await;

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..5 {
        let target = random_id(&mut rng);
        let expected = brute_force_closest(&nodes, &target, config.k);

        for origin in [&nodes[0], &nodes[7], &nodes[14]] {
            let found = origin.iterative_lookup(&target, config.k).await.unwrap();
            let found: Vec<NodeId> = found.iter().map(|c| c.node_id).collect();
            assert_eq!(found, expected);
        }
    }
}

#[tokio::test]
async fn test_lookup_of_existing_node_finds_it() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let nodes = build_mesh(&net, 12, &KademliaConfig::default(), 11).await;

    let wanted = *nodes[9].local_id();
    let found = nodes[3].iterative_lookup(&wanted, 1).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].node_id, wanted);
    assert_eq!(found[0].address, nodes[9].local_contact().address);
}

#[tokio::test]
async fn test_large_network_lookup_terminates_sorted() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let config = KademliaConfig::default();
    let nodes = build_mesh(&net, 60, &config, 3).await;

    let mut rng = StdRng::seed_from_u64(5);
    let target = random_id(&mut rng);
    let outcome = nodes[42]
        .lookup(overlay_dht::LookupQuery::new(target, config.k))
        .await
        .unwrap();

    assert!(outcome.rounds <= config.max_rounds);
    assert!(outcome.closest.len() <= config.k);
    assert!(outcome
        .closest
        .windows(2)
        .all(|w| xor_distance(&w[0].node_id, &target) <= xor_distance(&w[1].node_id, &target)));
}

#[tokio::test]
async fn test_exact_lookups_in_large_network_find_target_in_log_rounds() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let config = KademliaConfig::default();
    let n = 200;
    let nodes = build_mesh(&net, n, &config, 17).await;
    let round_bound = 2 * (n as f64).log2().ceil() as usize;

    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..100 {
        let origin = &nodes[(rng.next_u32() as usize) % n];
        let wanted = &nodes[(rng.next_u32() as usize) % n];
        let target = *wanted.local_id();

        let outcome = origin
            .lookup(overlay_dht::LookupQuery::new(target, 1))
            .await
            .unwrap();

        assert_eq!(outcome.closest.len(), 1);
        assert_eq!(outcome.closest[0].node_id, target);
        assert_eq!(outcome.closest[0].address, wanted.local_contact().address);
        assert!(
            outcome.rounds <= round_bound,
            "{} rounds for {n} nodes",
            outcome.rounds
        );
    }
}

#[tokio::test]
async fn test_single_node_lookup_returns_itself() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let nodes = build_mesh(&net, 1, &KademliaConfig::default(), 1).await;

    let target = NodeId::new([0x5a; NODE_ID_LEN]);
    let found = nodes[0].iterative_lookup(&target, 20).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(&found[0].node_id, nodes[0].local_id());
    assert_eq!(net.calls(), 0);
}

#[tokio::test]
async fn test_self_lookup_terminates() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let nodes = build_mesh(&net, 8, &KademliaConfig::default(), 21).await;

    let own = *nodes[4].local_id();
    let found = nodes[4].iterative_lookup(&own, 20).await.unwrap();

    assert_eq!(found[0].node_id, own);
    assert_eq!(found.len(), 8);
}

#[tokio::test]
async fn test_bootstrap_without_seeds_fails_and_leaves_table_empty() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let node = net.spawn_node(
        NodeId::new([1; NODE_ID_LEN]),
        NodeAddress::tcp("10.0.0.1", 7777),
        KademliaConfig::for_testing(),
        Arc::new(FixedTimeSource::new(1_000)),
    );

    let result = node.bootstrap(&[]).await;

    assert!(matches!(result, Err(DhtError::BootstrapFailed { .. })));
    assert!(node.routing_table().is_empty());
    assert_eq!(net.calls(), 0);
}

#[tokio::test]
async fn test_dead_nodes_are_routed_around() {
    init_tracing();
    let net = SimulatedNetwork::new();
    let nodes = build_mesh(&net, 10, &KademliaConfig::default(), 13).await;

    for dead in &nodes[2..6] {
        net.set_down(&dead.local_contact().address, true);
    }

    let wanted = *nodes[8].local_id();
    let found = nodes[9].iterative_lookup(&wanted, 1).await.unwrap();

    assert_eq!(found[0].node_id, wanted);
}
