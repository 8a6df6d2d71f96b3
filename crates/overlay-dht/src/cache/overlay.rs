//! OverlayCache: persisted address book in front of the lookup protocol.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::entry::AddressBookEntry;
use super::error::{OverlayError, OverlayResult};
use crate::adapters::RandomNodeIdGenerator;
use crate::domain::{Contact, DhtError, LookupQuery, NodeAddress, NodeId};
use crate::ports::{KeyValueStore, NodeFilter, NodeIdGenerator, ReputationScorer};
use crate::protocol::LookupProtocol;

/// Requirements a chosen node must meet.
#[derive(Debug, Clone, Default)]
pub struct ChooseCriteria {
    /// Free space or bandwidth the node must offer, checked by the
    /// configured [`NodeFilter`].
    pub min_free: u64,
    /// Nodes that must not be returned.
    pub exclude: HashSet<NodeId>,
}

/// Outcome of a bulk get.
#[derive(Debug, Default)]
pub struct BulkResult {
    /// Nodes that resolved.
    pub found: HashMap<NodeId, NodeAddress>,
    /// Every node that did not resolve, with the reason.
    pub errors: Vec<(NodeId, OverlayError)>,
}

/// Address book mapping node ids to addresses.
///
/// Reads hit the store first; misses and stale entries go to the network
/// through [`LookupProtocol::iterative_lookup`] and successful discoveries
/// are written back. Misses are never cached.
pub struct OverlayCache {
    store: Arc<dyn KeyValueStore>,
    protocol: Arc<LookupProtocol>,
    ttl_secs: u64,
    filter: Option<Arc<dyn NodeFilter>>,
    scorer: Option<Arc<dyn ReputationScorer>>,
    id_generator: Arc<dyn NodeIdGenerator>,
}

impl OverlayCache {
    /// Create a cache over `store`. Entries older than `ttl_secs` are
    /// refreshed on read (0 disables expiry).
    pub fn new(store: Arc<dyn KeyValueStore>, protocol: Arc<LookupProtocol>, ttl_secs: u64) -> Self {
        Self {
            store,
            protocol,
            ttl_secs,
            filter: None,
            scorer: None,
            id_generator: Arc::new(RandomNodeIdGenerator),
        }
    }

    /// Eligibility predicate applied by [`OverlayCache::choose`].
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Reputation ranking applied by [`OverlayCache::choose`].
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn ReputationScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Source of random lookup targets for [`OverlayCache::choose`].
    #[must_use]
    pub fn with_id_generator(mut self, id_generator: Arc<dyn NodeIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// The protocol this cache discovers through.
    pub fn protocol(&self) -> &Arc<LookupProtocol> {
        &self.protocol
    }

    /// Read and decode a stored record. Undecodable records read as absent.
    fn cached(&self, id: &NodeId) -> OverlayResult<Option<(AddressBookEntry, Contact)>> {
        let bytes = self.store.get(id.as_bytes()).map_err(|e| {
            warn!(node = %id, error = %e, "overlay cache read failed");
            e
        })?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let decoded = AddressBookEntry::decode(&bytes)
            .and_then(|entry| entry.contact().map(|contact| (entry, contact)));
        match decoded {
            Ok((entry, contact)) if &contact.node_id == id => Ok(Some((entry, contact))),
            Ok(_) => {
                warn!(node = %id, "cache record stored under the wrong key");
                Ok(None)
            }
            Err(e) => {
                warn!(node = %id, error = %e, "ignoring corrupt cache record");
                Ok(None)
            }
        }
    }

    /// Resolve a node's address.
    pub async fn get(&self, id: &NodeId) -> OverlayResult<NodeAddress> {
        let now = self.protocol.now();
        let cached = self.cached(id)?;

        match &cached {
            Some((entry, contact)) if !entry.is_expired(now, self.ttl_secs) => {
                debug!(node = %id, "overlay cache hit");
                return Ok(contact.address.clone());
            }
            Some(_) => debug!(node = %id, "overlay cache entry stale"),
            None => debug!(node = %id, "overlay cache miss"),
        }

        match self.protocol.iterative_lookup(id, 1).await {
            Ok(found) => {
                if let Some(contact) = found.into_iter().find(|c| &c.node_id == id) {
                    self.put(id, &contact.address)?;
                    debug!(node = %id, address = %contact.address, "cached discovered address");
                    return Ok(contact.address);
                }
            }
            Err(DhtError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        if cached.is_some() {
            self.store.delete(id.as_bytes())?;
            debug!(node = %id, "dropped stale entry for vanished node");
        }
        Err(OverlayError::NotFound)
    }

    /// Upsert an address. Last write wins.
    pub fn put(&self, id: &NodeId, address: &NodeAddress) -> OverlayResult<()> {
        let entry = AddressBookEntry::new(id, address, self.protocol.now());
        self.store
            .put(id.as_bytes(), &entry.encode()?)
            .map_err(|e| {
                warn!(node = %id, error = %e, "overlay cache write failed");
                OverlayError::from(e)
            })
    }

    /// [`OverlayCache::get`] for each id, concurrently.
    pub async fn bulk_get(&self, ids: &[NodeId]) -> BulkResult {
        let lookups = ids.iter().map(|id| async move { (*id, self.get(id).await) });

        let mut result = BulkResult::default();
        for (id, outcome) in join_all(lookups).await {
            match outcome {
                Ok(address) => {
                    result.found.insert(id, address);
                }
                Err(e) => result.errors.push((id, e)),
            }
        }
        result
    }

    /// Pick up to `count` distinct eligible contacts.
    ///
    /// Samples the routing table first and falls back to a lookup around a
    /// random target when the table holds too few eligible contacts. With a
    /// scorer configured, candidates are ranked by descending score. Returns
    /// fewer than `count` when the reachable network cannot supply more.
    pub async fn choose(&self, count: usize, criteria: &ChooseCriteria) -> OverlayResult<Vec<Contact>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let local = *self.protocol.local_id();
        let eligible = |c: &Contact| {
            c.node_id != local
                && !criteria.exclude.contains(&c.node_id)
                && self
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.is_eligible(c, criteria.min_free))
        };

        let mut sampled = self.protocol.routing_table().all_contacts();
        sampled.shuffle(&mut rand::thread_rng());
        let mut chosen: Vec<Contact> = sampled.into_iter().filter(|c| eligible(c)).collect();

        if chosen.len() < count {
            let target = self.id_generator.generate();
            let width = self.protocol.config().k.max(count);
            let query = LookupQuery::new(target, width)
                .excluding(criteria.exclude.iter().copied())
                .excluding(chosen.iter().map(|c| c.node_id))
                .excluding([local]);

            debug!(%target, have = chosen.len(), count, "choose falling back to network lookup");
            match self.protocol.lookup(query).await {
                Ok(outcome) => chosen.extend(outcome.closest.into_iter().filter(|c| eligible(c))),
                Err(e) => debug!(error = %e, "choose lookup found nothing"),
            }
        }

        if let Some(scorer) = &self.scorer {
            let mut scored: Vec<(f64, Contact)> = chosen
                .into_iter()
                .map(|c| (scorer.score(&c.node_id), c))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            chosen = scored.into_iter().map(|(_, c)| c).collect();
        }

        if chosen.len() < count {
            warn!(requested = count, found = chosen.len(), "not enough eligible nodes");
        }
        chosen.truncate(count);
        Ok(chosen)
    }

    /// Bootstrap the protocol and record the seeds that answered.
    ///
    /// A failure to persist a seed is logged; routing is still usable.
    pub async fn bootstrap(&self, seeds: &[NodeAddress]) -> OverlayResult<Vec<Contact>> {
        let responded = self.protocol.bootstrap(seeds).await?;
        for seed in &responded {
            if let Err(e) = self.put(&seed.node_id, &seed.address) {
                warn!(node = %seed.node_id, error = %e, "could not record bootstrap seed");
            }
        }
        Ok(responded)
    }

    /// Delete expired and undecodable records. Returns how many were removed.
    pub fn prune_expired(&self) -> OverlayResult<usize> {
        let now = self.protocol.now();
        let mut doomed = Vec::new();

        for item in self.store.iterate(&[]) {
            let (key, value) = item?;
            let expired = match AddressBookEntry::decode(&value) {
                Ok(entry) => entry.is_expired(now, self.ttl_secs),
                Err(_) => true,
            };
            if expired {
                doomed.push(key);
            }
        }

        for key in &doomed {
            self.store.delete(key)?;
        }
        if !doomed.is_empty() {
            info!(pruned = doomed.len(), "pruned overlay cache");
        }
        Ok(doomed.len())
    }
}
