//! Wall-clock [`TimeSource`] for running nodes.

use std::time::SystemTime;

use crate::domain::Timestamp;
use crate::ports::TimeSource;

/// Reads the host clock in whole Unix seconds.
///
/// A clock set before 1970 reads as zero, which makes every contact look
/// stale rather than failing the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::UNIX_EPOCH.elapsed().unwrap_or_default();
        Timestamp::new(since_epoch.as_secs())
    }
}
