//! Per-key token bucket with windowed refill

use std::time::Duration;
use tokio::time::Instant;

/// Token bucket for a single caller key
///
/// Refill is computed from the time since the previous check, truncated to
/// whole tokens, and the check time is reset on every call (allowed or not).
/// With short request gaps the fractional refill is lost, so sustained
/// traffic can be throttled below the nominal rate.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    tokens: u32,
    last_check: Instant,
}

impl Bucket {
    /// A fresh bucket that has already admitted its first request
    pub fn first_request(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: capacity.saturating_sub(1),
            last_check: now,
        }
    }

    /// Refill for the elapsed time and try to take one token
    pub fn try_acquire(&mut self, capacity: u32, window: Duration, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_check);
        let refill = (elapsed.as_secs_f64() / window.as_secs_f64() * capacity as f64) as u32;

        self.tokens = capacity.min(self.tokens.saturating_add(refill));
        self.last_check = now;

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// True once the bucket has been idle for longer than `max_idle`
    pub fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        now.saturating_duration_since(self.last_check) > max_idle
    }
}
