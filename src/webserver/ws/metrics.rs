/// Delivery metrics
///
/// Lifetime counters for the hub and per-connection writer stats.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// CONNECTION METRICS
// ============================================================================

/// Per-connection writer statistics
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    frames_sent: AtomicU64,
    pings_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_frame(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_ping(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub frames_sent: u64,
    pub pings_sent: u64,
    pub bytes_sent: u64,
}

// ============================================================================
// HUB METRICS
// ============================================================================

/// Hub lifetime counters
///
/// Written only by the control loop, readable from anywhere.
#[derive(Debug, Default)]
pub struct HubMetrics {
    total_registered: AtomicU64,
    total_unregistered: AtomicU64,
    messages_published: AtomicU64,
    messages_delivered: AtomicU64,
    slow_consumer_evictions: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connection_registered(&self) {
        self.total_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_unregistered(&self) {
        self.total_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_delivered(&self, count: u64) {
        self.messages_delivered.fetch_add(count, Ordering::Relaxed);
    }

    /// A connection was evicted because its outbound queue was full
    pub fn slow_consumer_evicted(&self) {
        self.slow_consumer_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_registered: self.total_registered.load(Ordering::Relaxed),
            total_unregistered: self.total_unregistered.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            slow_consumer_evictions: self.slow_consumer_evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_registered: u64,
    pub total_unregistered: u64,
    pub messages_published: u64,
    pub messages_delivered: u64,
    pub slow_consumer_evictions: u64,
}

/// Point-in-time view of the hub, answered by the control loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubStatsSnapshot {
    pub connections: usize,
    pub subscribers: usize,
    #[serde(flatten)]
    pub lifetime: HubMetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_metrics() {
        let metrics = ConnectionMetrics::new();
        metrics.record_frame(10);
        metrics.record_frame(5);
        metrics.record_ping();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.bytes_sent, 15);
        assert_eq!(snapshot.pings_sent, 1);
    }

    #[test]
    fn test_hub_stats_serialization_is_flat() {
        let metrics = HubMetrics::new();
        metrics.connection_registered();
        metrics.message_published();
        metrics.messages_delivered(3);
        metrics.slow_consumer_evicted();

        let stats = HubStatsSnapshot {
            connections: 1,
            subscribers: 1,
            lifetime: metrics.snapshot(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["connections"], 1);
        assert_eq!(value["total_registered"], 1);
        assert_eq!(value["messages_delivered"], 3);
        assert_eq!(value["slow_consumer_evictions"], 1);
    }
}
