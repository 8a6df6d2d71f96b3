//! # Lookup Protocol
//!
//! Ping, FindNode, iterative lookup and bootstrap over a pluggable
//! [`RpcTransport`](crate::ports::RpcTransport), plus the handler that
//! answers the same RPCs for remote peers.

mod core;
mod inbound;
mod lookup;

pub use self::core::LookupProtocol;
pub use lookup::LookupOutcome;
