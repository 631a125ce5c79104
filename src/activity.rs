//! Lock-free timestamps shared between the session and its background actors.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A millisecond wall-clock timestamp that can be read without the mailbox lock.
///
/// Cloning shares the underlying value.
#[derive(Debug, Clone, Default)]
pub struct Timestamp(Arc<AtomicI64>);

impl Timestamp {
    /// A timestamp set to the current time.
    pub fn now() -> Self {
        let ts = Timestamp::default();
        ts.touch();
        ts
    }

    /// Move the timestamp to the current time.
    pub fn touch(&self) {
        self.0.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Milliseconds since the epoch, or 0 if never set.
    pub fn millis(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    /// The stored instant, or `None` if never set.
    pub fn get(&self) -> Option<DateTime<Utc>> {
        match self.millis() {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// How long ago the timestamp was set. Never-set timestamps are infinitely old.
    pub fn elapsed(&self) -> Duration {
        match self.millis() {
            0 => Duration::MAX,
            ms => {
                let delta = Utc::now().timestamp_millis().saturating_sub(ms);
                Duration::from_millis(u64::try_from(delta).unwrap_or(0))
            }
        }
    }
}
