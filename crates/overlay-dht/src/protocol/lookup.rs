//! Iterative node lookup.

use std::collections::HashSet;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::core::LookupProtocol;
use crate::domain::{
    sort_by_distance, xor_distance, Admission, Contact, DhtError, DhtResult, Distance,
    LookupQuery, NodeAddress, NodeId,
};

/// Result of one iterative lookup.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    /// Closest visited contacts, ascending by distance.
    pub closest: Vec<Contact>,
    /// Number of contacts that answered a FindNode.
    pub responded: usize,
    /// Rounds executed.
    pub rounds: usize,
}

impl LookupProtocol {
    /// Find the `limit` contacts closest to `target` across the network.
    ///
    /// The local node counts as visited, so a node with no peers gets
    /// itself back. Fails with `NotFound` only when candidates existed but
    /// none of them answered.
    pub async fn iterative_lookup(&self, target: &NodeId, limit: usize) -> DhtResult<Vec<Contact>> {
        let outcome = self.lookup(LookupQuery::new(*target, limit)).await?;
        Ok(outcome.closest)
    }

    /// Run a lookup described by `query`.
    ///
    /// The search always spans `max(k, limit)` candidates; `limit` only
    /// trims the result. Each round probes up to `alpha` unqueried
    /// candidates concurrently under a shared round deadline. Once a round
    /// brings no closer candidate, every unqueried entry of the shortlist is
    /// probed at once. The lookup stops when the whole shortlist has been
    /// queried or after `max_rounds`.
    pub async fn lookup(&self, query: LookupQuery) -> DhtResult<LookupOutcome> {
        let config = self.config();
        let target = query.target;
        let width = config.k.max(query.limit);
        let local_id = self.local.node_id;

        let mut shortlist: Vec<Contact> = self.table.closest_to(&target, width);
        let had_candidates = !shortlist.is_empty();

        // A node reported at several addresses stays a candidate at each
        // of them until one answers.
        let mut seen: HashSet<(NodeId, NodeAddress)> = shortlist.iter().map(candidate_key).collect();
        let mut queried: HashSet<(NodeId, NodeAddress)> = HashSet::new();
        let mut answered: HashSet<NodeId> = HashSet::from([local_id]);
        let mut visited: Vec<Contact> = vec![self.local.clone()];
        let mut best = shortlist
            .first()
            .map(|c| xor_distance(&c.node_id, &target))
            .unwrap_or(Distance::MAX);
        let mut rounds = 0;
        let mut converged = false;

        while rounds < config.max_rounds {
            let fan_out = if converged { width } else { config.alpha };
            let mut batch_ids: HashSet<NodeId> = HashSet::new();
            let batch: Vec<Contact> = shortlist
                .iter()
                .filter(|c| !answered.contains(&c.node_id) && !queried.contains(&candidate_key(c)))
                .filter(|c| batch_ids.insert(c.node_id))
                .take(fan_out)
                .cloned()
                .collect();
            if batch.is_empty() {
                debug!(%target, rounds, "lookup exhausted candidates");
                break;
            }
            rounds += 1;
            queried.extend(batch.iter().map(candidate_key));

            let deadline = Instant::now() + config.round_timeout;
            let probes = batch.iter().map(|contact| async move {
                let answer = timeout_at(deadline, self.query(contact, &target, width)).await;
                (contact, answer)
            });
            let answers = join_all(probes).await;

            let now = self.now();
            let mut failed: HashSet<(NodeId, NodeAddress)> = HashSet::new();
            let mut challenges: Vec<(Contact, Contact)> = Vec::new();
            for (contact, answer) in answers {
                match answer {
                    Ok(Ok((responder, nodes))) => {
                        if answered.insert(responder.node_id) {
                            match self.table.admit(responder.clone(), now) {
                                Ok(Admission::Challenge { lru }) => {
                                    challenges.push((lru, responder.clone()));
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    debug!(peer = %responder.node_id, error = %e, "responder not recorded");
                                }
                            }
                            visited.push(responder);
                        }
                        for node in nodes {
                            if answered.contains(&node.node_id) {
                                continue;
                            }
                            if let Some(known) = self.table.get(&node.node_id) {
                                if seen.insert(candidate_key(&known)) {
                                    shortlist.push(known);
                                }
                            }
                            if seen.insert(candidate_key(&node)) {
                                shortlist.push(node);
                            }
                        }
                    }
                    Ok(Err(_)) => {
                        failed.insert(candidate_key(contact));
                    }
                    Err(_) => {
                        debug!(peer = %contact.node_id, "probe missed round deadline");
                        self.note_failure(&contact.node_id);
                        failed.insert(candidate_key(contact));
                    }
                }
            }
            self.settle_challenges(challenges, deadline).await;

            shortlist.retain(|c| !failed.contains(&candidate_key(c)));
            sort_by_distance(&mut shortlist, &target);
            shortlist.truncate(width);

            let round_best = shortlist
                .first()
                .map(|c| xor_distance(&c.node_id, &target))
                .unwrap_or(Distance::MAX);
            debug!(
                %target,
                round = rounds,
                shortlist = shortlist.len(),
                visited = visited.len() - 1,
                "lookup round complete"
            );

            let settled = shortlist
                .iter()
                .all(|c| answered.contains(&c.node_id) || queried.contains(&candidate_key(c)));
            if settled {
                debug!(%target, rounds, "closest candidates all visited");
                break;
            }
            if round_best < best {
                best = round_best;
            } else if !converged {
                debug!(%target, rounds, "no closer candidate found");
                converged = true;
            }
        }

        let responded = visited.len() - 1;
        if had_candidates && responded == 0 {
            debug!(%target, rounds, "no candidate answered");
            return Err(DhtError::NotFound);
        }

        visited.retain(|c| !query.exclude.contains(&c.node_id));
        sort_by_distance(&mut visited, &target);
        visited.dedup_by(|a, b| a.node_id == b.node_id);
        visited.truncate(query.limit);

        Ok(LookupOutcome {
            closest: visited,
            responded,
            rounds,
        })
    }
}

fn candidate_key(contact: &Contact) -> (NodeId, NodeAddress) {
    (contact.node_id, contact.address.clone())
}
