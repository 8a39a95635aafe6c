//! Shared stagger delay for a single drain run.
//!
//! Every rate-limit signal bumps the delay by a fixed step. There is no decay:
//! once the backend has pushed back, the rest of the run stays at the higher
//! delay. Atomics only, so in-flight deletes of one page can report
//! concurrently without a lock.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

pub const DEFAULT_INITIAL_DELAY_MS: u64 = 400;
pub const DEFAULT_RATE_LIMIT_STEP_MS: u64 = 100;

#[derive(Debug)]
pub struct RateState {
    delay_ms: AtomicU64,
    step_ms: u64,
    total_throttled: AtomicU64,
}

impl RateState {
    pub fn new(initial_delay_ms: u64, step_ms: u64) -> Self {
        Self {
            delay_ms: AtomicU64::new(initial_delay_ms),
            step_ms,
            total_throttled: AtomicU64::new(0),
        }
    }

    pub fn current_delay(&self) -> u64 {
        self.delay_ms.load(Relaxed)
    }

    /// Raises the delay by one step and returns the new value.
    pub fn on_rate_limited(&self) -> u64 {
        self.total_throttled.fetch_add(1, Relaxed);
        self.delay_ms.fetch_add(self.step_ms, Relaxed) + self.step_ms
    }

    pub fn total_throttled(&self) -> u64 {
        self.total_throttled.load(Relaxed)
    }
}

impl Default for RateState {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY_MS, DEFAULT_RATE_LIMIT_STEP_MS)
    }
}
