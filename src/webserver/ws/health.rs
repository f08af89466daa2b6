/// Connection liveness settings
///
/// Heartbeat cadence, write deadline and inbound frame limit shared by the
/// reader and writer pumps.
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::WebSocketConfig;

// ============================================================================
// PUMP CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Ping cadence on an otherwise idle connection
    pub heartbeat_interval: Duration,

    /// Upper bound for any single frame write
    pub write_timeout: Duration,

    /// Inbound frames larger than this close the connection
    pub max_message_bytes: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::from_config(&WebSocketConfig::default())
    }
}

impl PumpConfig {
    pub fn from_config(config: &WebSocketConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            write_timeout: config.write_timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }
}

/// Heartbeat ticker whose first tick is one full period away
pub fn heartbeat_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
