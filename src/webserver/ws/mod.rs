/// Real-time notification delivery
///
/// ## Architecture
/// - Single `/ws` endpoint, one socket per client tab
/// - `Hub` control loop owns the connection registry (by id and by user)
/// - Per-connection bounded queues; a full queue evicts the client
/// - Reader/writer pumps per socket with heartbeat and write deadlines
///
/// ## Key Components
/// - `hub`: registry, fan-out, queries and shutdown
/// - `connection`: socket pumps and close-once guard
/// - `message`: routed payloads
/// - `health`: heartbeat and frame limits
/// - `metrics`: hub and connection counters
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;

pub use connection::{serve_connection, CloseGuard};
pub use health::PumpConfig;
pub use hub::{Connection, ConnectionId, Hub, HubHandle};
pub use message::{HubMessage, Outbound};
pub use metrics::{HubMetricsSnapshot, HubStatsSnapshot};
