//! Routing table constants.

use crate::domain::NODE_ID_BITS;

/// Upper bound on buckets after repeated splits (one per prefix length).
pub const MAX_BUCKETS: usize = NODE_ID_BITS;
