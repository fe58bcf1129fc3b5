//! # Clock
//!
//! The vault program never reads the wall clock directly. It asks a
//! [`Clock`], which the runtime injects. Production uses [`SystemClock`];
//! tests use [`ManualClock`] and move time forward explicitly, so the
//! unlock boundary can be tested to the second without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// A source of the current unix time, in seconds.
pub trait Clock: Send + Sync {
    fn unix_timestamp(&self) -> u64;
}

/// Wall-clock time via `chrono`. Times before the epoch read as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, timestamp: u64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `seconds`, saturating at `u64::MAX`.
    pub fn advance(&self, seconds: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(seconds)));
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
