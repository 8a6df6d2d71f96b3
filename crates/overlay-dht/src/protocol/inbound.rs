//! Serving RPCs from other nodes.

use tracing::{debug, warn};

use super::core::LookupProtocol;
use crate::domain::{sort_by_distance, Admission, Contact, DhtResult, NodeId};
use crate::wire::{Node, RpcRequest, RpcResponse};

impl LookupProtocol {
    /// Answer a request from a peer.
    ///
    /// A well-formed sender is admitted to the routing table when its bucket
    /// has room. `FindNode` answers from the routing table and includes this
    /// node itself when it is among the closest.
    pub async fn handle_request(&self, request: RpcRequest) -> DhtResult<RpcResponse> {
        self.observe_sender(request.sender());

        match request {
            RpcRequest::Ping { .. } => Ok(RpcResponse::Pong {
                responder: self.local_node(),
            }),
            RpcRequest::FindNode {
                sender,
                target,
                limit,
            } => {
                let target = NodeId::from_slice(&target)?;
                let requester = NodeId::from_slice(&sender.id).ok();

                let mut closest: Vec<Contact> = self
                    .table
                    .closest_to(&target, limit.saturating_add(1))
                    .into_iter()
                    .filter(|c| Some(c.node_id) != requester)
                    .collect();
                closest.push(self.local.clone());
                sort_by_distance(&mut closest, &target);
                closest.truncate(limit);

                debug!(%target, returned = closest.len(), "served find_node");
                Ok(RpcResponse::Nodes {
                    responder: self.local_node(),
                    nodes: closest.iter().map(Node::from).collect(),
                })
            }
        }
    }

    /// Admit without a liveness challenge; no RPC is issued while serving one.
    fn observe_sender(&self, sender: &Node) {
        match Contact::try_from(sender) {
            Ok(contact) if contact.node_id == self.local.node_id => {}
            Ok(contact) => {
                let id = contact.node_id;
                if let Ok(Admission::Challenge { .. }) = self.table.admit(contact, self.now()) {
                    debug!(sender = %id, "bucket full, sender not recorded");
                }
            }
            Err(e) => warn!(error = %e, "ignoring malformed sender record"),
        }
    }
}
