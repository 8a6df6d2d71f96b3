//! LookupProtocol state, single-peer RPCs and contact insertion.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::domain::{
    Admission, Contact, DhtError, DhtResult, InsertOutcome, KademliaConfig, NodeAddress, NodeId,
    RoutingTable, Timestamp,
};
use crate::ports::{RpcTransport, TimeSource, TransportError};
use crate::wire::{Node, RpcRequest, RpcResponse};

/// Kademlia lookup protocol for one node.
///
/// Owns the node's [`RoutingTable`] and drives it from RPC outcomes:
/// responders are inserted or refreshed, failures are counted and a
/// contact is evicted once its consecutive failures reach
/// `failure_threshold`.
///
/// # Example
///
/// ```rust,ignore
/// let protocol = LookupProtocol::new(local, KademliaConfig::default(), transport, clock);
/// protocol.bootstrap(&config.bootstrap_seeds()).await?;
/// let closest = protocol.iterative_lookup(&target, 20).await?;
/// ```
pub struct LookupProtocol {
    /// This node as advertised to peers
    pub(crate) local: Contact,
    /// Routing state (owned, never shared across processes)
    pub(crate) table: RoutingTable,
    pub(crate) transport: Arc<dyn RpcTransport>,
    pub(crate) time_source: Arc<dyn TimeSource>,
}

impl LookupProtocol {
    /// Create a protocol instance with an empty routing table.
    pub fn new(
        local_id: NodeId,
        local_address: NodeAddress,
        config: KademliaConfig,
        transport: Arc<dyn RpcTransport>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let now = time_source.now();
        Self {
            local: Contact::new(local_id, local_address, now),
            table: RoutingTable::new(local_id, config),
            transport,
            time_source,
        }
    }

    /// Our own identifier.
    pub fn local_id(&self) -> &NodeId {
        &self.local.node_id
    }

    /// Our own contact record.
    pub fn local_contact(&self) -> &Contact {
        &self.local
    }

    /// Get the underlying routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// Get the configuration
    pub fn config(&self) -> &KademliaConfig {
        self.table.config()
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    pub(crate) fn local_node(&self) -> Node {
        Node::from(&self.local)
    }

    /// Up to `limit` known contacts closest to `start` (default: our own
    /// id), served from the table without network traffic.
    pub fn local_nodes(&self, start: Option<NodeId>, limit: usize) -> Vec<Contact> {
        let start = start.unwrap_or(self.local.node_id);
        self.table.closest_to(&start, limit)
    }

    /// One request/response exchange, retried once immediately on failure.
    pub(crate) async fn exchange(
        &self,
        address: &NodeAddress,
        request: RpcRequest,
    ) -> DhtResult<RpcResponse> {
        let timeout = self.config().rpc_timeout;

        for attempt in 0..2 {
            let sent = self.transport.send(address, request.clone(), timeout);
            let error = match tokio::time::timeout(timeout, sent).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout,
            };
            debug!(%address, attempt, %error, "rpc failed");
        }

        Err(DhtError::Unreachable {
            address: address.to_string(),
        })
    }

    /// Count a failed exchange; evicts the contact once the threshold is hit.
    pub(crate) fn note_failure(&self, node_id: &NodeId) {
        let Some(failures) = self.table.record_failure(node_id) else {
            return;
        };
        if failures >= self.config().failure_threshold {
            self.table.remove(node_id);
            info!(node = %node_id, failures, "evicted unresponsive contact");
        }
    }

    /// Liveness probe. A failure counts toward eviction; a success inserts
    /// or refreshes the responder.
    pub async fn ping(&self, contact: &Contact) -> bool {
        match self.ping_address(&contact.address).await {
            Ok(responder) => {
                if responder.node_id != contact.node_id {
                    debug!(
                        expected = %contact.node_id,
                        actual = %responder.node_id,
                        "ping answered by a different node"
                    );
                }
                if let Err(e) = self.insert(responder).await {
                    debug!(error = %e, "ping responder not recorded");
                }
                true
            }
            Err(_) => {
                self.note_failure(&contact.node_id);
                false
            }
        }
    }

    /// Ping an address whose identity may be unknown; returns the responder.
    pub(crate) async fn ping_address(&self, address: &NodeAddress) -> DhtResult<Contact> {
        let request = RpcRequest::Ping {
            sender: self.local_node(),
        };
        match self.exchange(address, request).await? {
            RpcResponse::Pong { responder } => Contact::try_from(&responder),
            RpcResponse::Nodes { .. } => Err(DhtError::Unreachable {
                address: address.to_string(),
            }),
        }
    }

    /// Single FindNode round trip to `contact`.
    ///
    /// Returns the contacts it reports closest to `target`. Only the
    /// responder is touched in the routing table.
    pub async fn find_node(
        &self,
        contact: &Contact,
        target: &NodeId,
        limit: usize,
    ) -> DhtResult<Vec<Contact>> {
        let (responder, nodes) = self.query(contact, target, limit).await?;
        self.table.touch(&responder.node_id, self.now());
        Ok(nodes)
    }

    /// FindNode exchange returning the responder's own record as well.
    ///
    /// Malformed entries in the answer are dropped and logged.
    pub(crate) async fn query(
        &self,
        contact: &Contact,
        target: &NodeId,
        limit: usize,
    ) -> DhtResult<(Contact, Vec<Contact>)> {
        let request = RpcRequest::FindNode {
            sender: self.local_node(),
            target: target.as_bytes().to_vec(),
            limit,
        };

        let response = match self.exchange(&contact.address, request).await {
            Ok(response) => response,
            Err(e) => {
                self.note_failure(&contact.node_id);
                return Err(e);
            }
        };

        let RpcResponse::Nodes { responder, nodes } = response else {
            self.note_failure(&contact.node_id);
            return Err(DhtError::Unreachable {
                address: contact.address.to_string(),
            });
        };

        let responder = match Contact::try_from(&responder) {
            Ok(responder) => responder,
            Err(e) => {
                warn!(peer = %contact.address, error = %e, "dropping response with malformed responder");
                self.note_failure(&contact.node_id);
                return Err(e);
            }
        };

        let nodes = nodes
            .iter()
            .filter_map(|node| match Contact::try_from(node) {
                Ok(contact) => Some(contact),
                Err(e) => {
                    warn!(peer = %responder.address, error = %e, "dropping malformed contact");
                    None
                }
            })
            .collect();

        Ok((responder, nodes))
    }

    /// Insert or refresh a contact, pinging the least-recently-seen entry
    /// of a full bucket before deciding.
    pub async fn insert(&self, contact: Contact) -> DhtResult<InsertOutcome> {
        let now = self.now();
        match self.table.admit(contact.clone(), now)? {
            Admission::Inserted | Admission::Refreshed => Ok(InsertOutcome::Inserted),
            Admission::Challenge { lru } => {
                let alive = self.ping_address(&lru.address).await.is_ok();
                let outcome = self
                    .table
                    .resolve_challenge(&lru.node_id, alive, contact, self.now());
                debug!(lru = %lru.node_id, alive, ?outcome, "resolved bucket challenge");
                Ok(outcome)
            }
        }
    }

    /// Ping the challenged least-recently-seen contacts concurrently and
    /// settle each bucket. A ping still pending at `deadline` keeps the
    /// incumbent.
    pub(crate) async fn settle_challenges(
        &self,
        challenges: Vec<(Contact, Contact)>,
        deadline: Instant,
    ) {
        if challenges.is_empty() {
            return;
        }
        let pings = challenges
            .iter()
            .map(|(lru, _)| timeout_at(deadline, self.ping_address(&lru.address)));
        let answers = join_all(pings).await;

        for ((lru, candidate), answer) in challenges.into_iter().zip(answers) {
            let alive = match answer {
                Ok(Ok(_)) => true,
                Ok(Err(_)) => false,
                Err(_) => {
                    debug!(lru = %lru.node_id, "challenge cut off by round deadline");
                    true
                }
            };
            let outcome = self
                .table
                .resolve_challenge(&lru.node_id, alive, candidate, self.now());
            debug!(lru = %lru.node_id, alive, ?outcome, "resolved bucket challenge");
        }
    }

    /// Populate the routing table from `seeds`.
    ///
    /// Every seed is pinged to learn its identity, then a lookup for our own
    /// id runs from the seeds that answered. Returns those seeds.
    pub async fn bootstrap(&self, seeds: &[NodeAddress]) -> DhtResult<Vec<Contact>> {
        if seeds.is_empty() {
            warn!("bootstrap called without seeds");
            return Err(DhtError::BootstrapFailed { attempted: 0 });
        }
        info!(seeds = seeds.len(), "bootstrapping routing table");

        let answers = join_all(seeds.iter().map(|seed| self.ping_address(seed))).await;

        let mut responded = Vec::new();
        for (seed, answer) in seeds.iter().zip(answers) {
            match answer {
                Ok(contact) if contact.node_id == self.local.node_id => {
                    debug!(%seed, "seed is this node");
                }
                Ok(contact) => {
                    if self.insert(contact.clone()).await.is_ok() {
                        responded.push(contact);
                    }
                }
                Err(e) => debug!(%seed, error = %e, "seed unreachable"),
            }
        }

        if responded.is_empty() {
            warn!(attempted = seeds.len(), "bootstrap failed: no seed reachable");
            return Err(DhtError::BootstrapFailed {
                attempted: seeds.len(),
            });
        }

        let target = self.local.node_id;
        if let Err(e) = self.iterative_lookup(&target, self.config().k).await {
            debug!(error = %e, "self lookup after bootstrap found nothing new");
        }

        info!(
            seeds = responded.len(),
            contacts = self.table.len(),
            "bootstrap complete"
        );
        Ok(responded)
    }
}
