//! Routing Table Implementation
//!
//! Kademlia routing table with split-on-local-range k-buckets and
//! ping-before-evict replacement.

mod bucket;
mod config;
mod stats;
mod table;

pub use bucket::KBucket;
pub use config::MAX_BUCKETS;
pub use stats::{Admission, InsertOutcome, RoutingTableStats};
pub use table::RoutingTable;
