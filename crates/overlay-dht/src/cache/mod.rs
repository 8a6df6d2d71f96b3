//! # Overlay Cache
//!
//! Persisted NodeId → address book fronting the routing table, plus
//! node selection for storage placement.

mod entry;
mod error;
mod overlay;

pub use entry::AddressBookEntry;
pub use error::{OverlayError, OverlayResult};
pub use overlay::{BulkResult, ChooseCriteria, OverlayCache};
