//! Domain Layer - Pure business logic with no I/O
//!
//! This module contains the Kademlia core:
//! - Node identifiers, addresses and XOR distance
//! - Routing table with split-on-local-range k-buckets
//! - Tuning parameters and lookup queries

pub mod routing_table;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use routing_table::*;
pub use services::*;
pub use types::*;
