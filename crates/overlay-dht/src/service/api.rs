use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::errors::ServiceError;
use crate::cache::{ChooseCriteria, OverlayCache, OverlayError};
use crate::domain::{NodeId, OverlayConfig, NODE_ID_LEN};
use crate::ports::OverlayApi;
use crate::wire::Node;

/// Stateless request handler over the overlay cache.
///
/// Validates inputs and translates cache and lookup outcomes into the
/// external [`Node`] / [`ServiceError`] shapes. All state lives in the
/// wrapped cache and its routing table.
///
/// # Example
///
/// ```rust,ignore
/// let service = LookupService::new(cache, config.max_choose);
/// service.start(&config).await?;
/// let node = service.lookup(&id_bytes).await?;
/// ```
pub struct LookupService {
    cache: Arc<OverlayCache>,
    max_choose: usize,
}

impl LookupService {
    /// Wrap `cache`, accepting Choose requests for up to `max_choose` nodes.
    pub fn new(cache: Arc<OverlayCache>, max_choose: usize) -> Self {
        Self { cache, max_choose }
    }

    /// The wrapped cache.
    pub fn cache(&self) -> &Arc<OverlayCache> {
        &self.cache
    }

    /// Bootstrap when the routing table is still empty.
    ///
    /// Uses the configured seeds, or the intro node when none are set.
    /// Returns how many seeds answered (zero if no bootstrap was needed).
    pub async fn start(&self, config: &OverlayConfig) -> Result<usize, ServiceError> {
        if !self.cache.protocol().routing_table().is_empty() {
            debug!("routing table already populated, skipping bootstrap");
            return Ok(0);
        }
        let seeds = config.bootstrap_seeds();
        let responded = self.cache.bootstrap(&seeds).await?;
        info!(seeds = responded.len(), "overlay started");
        Ok(responded.len())
    }

    fn parse_id(id: &[u8]) -> Result<NodeId, ServiceError> {
        if id.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "node id must not be empty".to_string(),
            ));
        }
        NodeId::from_slice(id).map_err(|_| {
            ServiceError::InvalidArgument(format!(
                "node id must be {NODE_ID_LEN} bytes, got {}",
                id.len()
            ))
        })
    }
}

#[async_trait]
impl OverlayApi for LookupService {
    async fn lookup(&self, id: &[u8]) -> Result<Node, ServiceError> {
        let id = Self::parse_id(id)?;
        let address = self.cache.get(&id).await?;
        Ok(Node::new(&id, &address))
    }

    async fn bulk_lookup(&self, ids: &[Vec<u8>]) -> Vec<Result<Node, ServiceError>> {
        let parsed: Vec<Result<NodeId, ServiceError>> =
            ids.iter().map(|raw| Self::parse_id(raw)).collect();
        let valid: Vec<NodeId> = parsed.iter().filter_map(|p| p.as_ref().ok().copied()).collect();

        let result = self.cache.bulk_get(&valid).await;
        let failures: HashMap<NodeId, OverlayError> = result.errors.into_iter().collect();

        parsed
            .into_iter()
            .map(|p| {
                let id = p?;
                if let Some(address) = result.found.get(&id) {
                    return Ok(Node::new(&id, address));
                }
                Err(failures
                    .get(&id)
                    .cloned()
                    .map(ServiceError::from)
                    .unwrap_or(ServiceError::NotFound))
            })
            .collect()
    }

    async fn choose(&self, count: usize, free: u64) -> Result<Vec<Node>, ServiceError> {
        if count == 0 || count > self.max_choose {
            return Err(ServiceError::InvalidArgument(format!(
                "count must be between 1 and {}, got {count}",
                self.max_choose
            )));
        }

        let criteria = ChooseCriteria {
            min_free: free,
            ..ChooseCriteria::default()
        };
        let chosen = self.cache.choose(count, &criteria).await?;
        Ok(chosen.iter().map(Node::from).collect())
    }

    async fn find_node(&self, id: &[u8]) -> Result<Node, ServiceError> {
        let id = Self::parse_id(id)?;
        let found = self.cache.protocol().iterative_lookup(&id, 1).await?;
        found
            .iter()
            .find(|c| c.node_id == id)
            .map(Node::from)
            .ok_or(ServiceError::NotFound)
    }
}
