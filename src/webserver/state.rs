/// Shared application state for the webserver
///
/// Holds the hub handle, the auth client, both rate limiters and the
/// notification facade. Route handlers receive it as `State<Arc<AppState>>`.
use std::sync::Arc;

use crate::{
    auth::AuthClient,
    config::Config,
    notifications::Notifier,
    ratelimit::RateLimiter,
    webserver::ws::{Hub, HubHandle, PumpConfig},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Real-time connection registry
    pub hub: HubHandle,

    /// Hook for content write paths (claps, comments, follows, bookmarks)
    pub notifier: Notifier,

    pub auth: Arc<dyn AuthClient>,

    /// Limiter for every `/api/v1` route
    pub api_limiter: Arc<RateLimiter>,

    /// Stricter limiter for `/api/v1/auth`
    pub auth_limiter: Arc<RateLimiter>,

    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Start the hub and limiter sweeps for `config`
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config, auth: Arc<dyn AuthClient>) -> Self {
        let hub = Hub::start(config.websocket.send_queue_capacity);
        let limits = &config.rate_limit;

        let api_limiter = RateLimiter::spawn(
            "api",
            limits.api_requests,
            limits.api_window(),
            limits.sweep_interval(),
        );
        let auth_limiter = RateLimiter::spawn(
            "auth",
            limits.auth_requests,
            limits.auth_window(),
            limits.sweep_interval(),
        );

        Self {
            notifier: Notifier::new(hub.clone()),
            hub,
            auth,
            api_limiter,
            auth_limiter,
            config: Arc::new(config),
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig::from_config(&self.config.websocket)
    }

    /// True when `origin` may open a WebSocket
    ///
    /// A missing `Origin` header is accepted (same-origin and non-browser
    /// clients); `*` in the allow list accepts any origin.
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        self.config
            .webserver
            .allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }

    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::StaticAuthClient;

    #[tokio::test]
    async fn test_origin_check() {
        let mut config = Config::default();
        config.webserver.allowed_origins = vec!["https://blog.example".to_string()];
        let state = AppState::new(config, Arc::new(StaticAuthClient::default()));

        assert!(state.is_origin_allowed(None));
        assert!(state.is_origin_allowed(Some("https://blog.example")));
        assert!(!state.is_origin_allowed(Some("https://evil.example")));

        let open = AppState::new(Config::default(), Arc::new(StaticAuthClient::default()));
        assert!(open.is_origin_allowed(Some("https://anything.example")));
    }

    #[tokio::test]
    async fn test_limiters_follow_config() {
        let mut config = Config::default();
        config.rate_limit.auth_requests = 3;
        let state = AppState::new(config, Arc::new(StaticAuthClient::default()));

        assert_eq!(state.api_limiter.capacity(), 100);
        assert_eq!(state.auth_limiter.capacity(), 3);
        assert_eq!(state.pump_config().max_message_bytes, 512);
    }

    #[tokio::test]
    async fn test_notifier_publishes_through_state_hub() {
        use crate::auth::SubscriberId;
        use crate::notifications::{Notification, NotificationKind};

        let state = AppState::new(Config::default(), Arc::new(StaticAuthClient::default()));
        let (_, mut queue) = state.hub.open_connection(Some(SubscriberId::from("author")));

        let published = state.notifier.notify(&Notification {
            id: "n-1".to_string(),
            user_id: SubscriberId::from("author"),
            kind: NotificationKind::Follow,
            actor_id: SubscriberId::from("reader"),
            actor_name: "Ada".to_string(),
            actor_avatar_url: String::new(),
            post_id: None,
            post_title: None,
            created_at: chrono::Utc::now(),
            read: false,
        });

        assert!(published);
        let frame = queue.recv().await.unwrap();
        assert!(frame.contains(r#""type":"notification""#));
    }
}
