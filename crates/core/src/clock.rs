// SPDX-License-Identifier: MIT

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock seconds, abstracted so job timestamps can be tested
/// without depending on real time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> u64;
}

/// Reads the real system clock, truncated to whole seconds (the original
/// daemon's timestamps are second-resolution `time_t` values and every
/// client-visible reply format follows that).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // A clock set before 1970 isn't a condition this daemon can recover
        // from meaningfully; treat it the same as "no time has passed yet"
        // rather than panicking a long-running process over it.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only advances when told to. Used by scheduler and job-list
/// tests that need deterministic `sub_time`/`start_time`/`end_time` values.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl FakeClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(start)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, value: u64) {
        self.now.store(value, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
