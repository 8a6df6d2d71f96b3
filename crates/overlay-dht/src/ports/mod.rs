//! # Ports Layer - Hexagonal Architecture Interfaces
//!
//! - `inbound`: the API this crate exposes (driving ports)
//! - `outbound`: capabilities the host must supply (driven ports)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
