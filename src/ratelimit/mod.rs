//! Windowed per-key rate limiter
//!
//! One bucket per caller key (client IP or `user:<id>`), all guarded by a
//! single mutex. `allow` never suspends. A background sweep drops buckets
//! that have been idle for two windows.

mod bucket;

pub use bucket::Bucket;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::logger::{self, LogTag};

pub struct RateLimiter {
    name: &'static str,
    capacity: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Limiter without a sweep task
    ///
    /// Idle buckets are only removed by explicit `sweep` calls.
    pub fn new(name: &'static str, capacity: u32, window: Duration) -> Self {
        Self {
            name,
            capacity,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with a background sweep every `sweep_interval`
    ///
    /// Must be called inside a tokio runtime. The sweep task holds only a
    /// weak reference and exits once the limiter is dropped.
    pub fn spawn(
        name: &'static str,
        capacity: u32,
        window: Duration,
        sweep_interval: Duration,
    ) -> Arc<Self> {
        let limiter = Arc::new(Self::new(name, capacity, window));
        tokio::spawn(sweep_loop(Arc::downgrade(&limiter), sweep_interval));
        limiter
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request for `key`
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();

        let allowed = match buckets.get_mut(key) {
            Some(bucket) => bucket.try_acquire(self.capacity, self.window, now),
            None => {
                buckets.insert(key.to_string(), Bucket::first_request(self.capacity, now));
                true
            }
        };
        drop(buckets);

        if !allowed {
            logger::debug(
                LogTag::RateLimit,
                &format!("[{}] rejected request for key={}", self.name, key),
            );
        }

        allowed
    }

    /// Remove buckets idle for more than two windows, returning how many
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let max_idle = self.window * 2;
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_idle(now, max_idle));
        before - buckets.len()
    }

    /// Number of keys currently holding a bucket
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }
}

async fn sweep_loop(limiter: Weak<RateLimiter>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(limiter) = limiter.upgrade() else {
            break;
        };

        let removed = limiter.sweep();
        if removed > 0 {
            logger::debug(
                LogTag::RateLimit,
                &format!(
                    "[{}] swept {} idle keys ({} remaining)",
                    limiter.name,
                    removed,
                    limiter.tracked_keys()
                ),
            );
        }
    }
}
