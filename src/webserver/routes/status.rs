use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    ratelimit::RateLimiter,
    webserver::{state::AppState, utils::success_response, ws::HubStatsSnapshot},
};

/// Simple health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    pub name: String,
    pub capacity: u32,
    pub window_secs: u64,
    pub tracked_keys: usize,
}

impl LimiterStats {
    fn of(limiter: &RateLimiter) -> Self {
        Self {
            name: limiter.name().to_string(),
            capacity: limiter.capacity(),
            window_secs: limiter.window().as_secs(),
            tracked_keys: limiter.tracked_keys(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeStatsResponse {
    pub hub: HubStatsSnapshot,
    pub rate_limits: Vec<LimiterStats>,
}

/// Routes outside `/api/v1`
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// Routes mounted under `/api/v1`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/realtime/stats", get(realtime_stats))
}

/// GET /health
async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, "Health check endpoint called");
    }

    success_response(HealthResponse {
        status: "ok".to_string(),
        service: "api-gateway".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// GET /api/v1/realtime/stats
async fn realtime_stats(State(state): State<Arc<AppState>>) -> Response {
    let hub = state.hub.stats().await;

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "Realtime stats (connections={}, subscribers={})",
                hub.connections, hub.subscribers
            ),
        );
    }

    success_response(RealtimeStatsResponse {
        hub,
        rate_limits: vec![
            LimiterStats::of(&state.api_limiter),
            LimiterStats::of(&state.auth_limiter),
        ],
    })
}
