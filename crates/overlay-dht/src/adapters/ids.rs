use rand::RngCore;

use crate::domain::{NodeId, NODE_ID_LEN};
use crate::ports::NodeIdGenerator;

/// Uniformly random 160-bit identifiers from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNodeIdGenerator;

impl NodeIdGenerator for RandomNodeIdGenerator {
    fn generate(&self) -> NodeId {
        let mut bytes = [0u8; NODE_ID_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        NodeId::new(bytes)
    }
}
