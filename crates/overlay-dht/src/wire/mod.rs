//! Protocol representation of nodes and RPC messages.
//!
//! Everything here is plain data: identifiers are raw bytes and addresses
//! are `"host:port"` strings. Conversion into routing-table contacts is a
//! pure function at this boundary so that the routing and lookup layers
//! never see wire shapes.

use serde::{Deserialize, Serialize};

use crate::domain::{Contact, DhtError, NodeAddress, NodeId, Transport};

/// Address as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAddress {
    /// Transport tag.
    pub transport: Transport,
    /// `"host:port"`.
    pub address: String,
}

/// Node record exchanged between peers and returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Raw identifier bytes.
    pub id: Vec<u8>,
    /// Where the node can be reached.
    pub address: WireAddress,
}

impl Node {
    /// Build a node record from its parts.
    pub fn new(id: &NodeId, address: &NodeAddress) -> Self {
        Self {
            id: id.as_bytes().to_vec(),
            address: WireAddress::from(address),
        }
    }
}

impl From<&NodeAddress> for WireAddress {
    fn from(address: &NodeAddress) -> Self {
        Self {
            transport: address.transport,
            address: address.to_string(),
        }
    }
}

impl TryFrom<&WireAddress> for NodeAddress {
    type Error = DhtError;

    fn try_from(wire: &WireAddress) -> Result<Self, Self::Error> {
        NodeAddress::parse(wire.transport, &wire.address)
    }
}

impl From<&Contact> for Node {
    fn from(contact: &Contact) -> Self {
        Node::new(&contact.node_id, &contact.address)
    }
}

impl TryFrom<&Node> for Contact {
    type Error = DhtError;

    /// Contacts built from wire records have never been talked to directly.
    fn try_from(node: &Node) -> Result<Self, Self::Error> {
        let node_id = NodeId::from_slice(&node.id)?;
        let address = NodeAddress::try_from(&node.address)?;
        Ok(Contact::reported(node_id, address))
    }
}

/// Requests a node can send to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcRequest {
    /// Liveness probe.
    Ping {
        /// The requesting node.
        sender: Node,
    },
    /// Ask for the peer's closest known nodes to `target`.
    FindNode {
        /// The requesting node.
        sender: Node,
        /// Raw identifier bytes being searched for.
        target: Vec<u8>,
        /// Maximum number of nodes to return.
        limit: usize,
    },
}

impl RpcRequest {
    /// The node that issued this request.
    pub fn sender(&self) -> &Node {
        match self {
            Self::Ping { sender } | Self::FindNode { sender, .. } => sender,
        }
    }
}

/// Replies to [`RpcRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Answer to `Ping`.
    Pong {
        /// The answering node.
        responder: Node,
    },
    /// Answer to `FindNode`, closest first.
    Nodes {
        /// The answering node.
        responder: Node,
        /// Closest nodes the responder knows of.
        nodes: Vec<Node>,
    },
}
