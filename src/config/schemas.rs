/// Configuration schemas for the gateway
///
/// Every section is declared with `config_struct!`, so an empty or partial
/// `config.toml` still yields a complete `Config`.
use std::time::Duration;

use crate::errors::ConfigurationError;

// ============================================================================
// WEBSERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// HTTP listener settings
    pub struct WebserverConfig {
        host: String = "0.0.0.0".to_string(),
        port: u16 = 8080,
        /// Origins accepted on the WebSocket upgrade; `*` accepts any
        allowed_origins: Vec<String> = vec!["*".to_string()],
        /// Read the client address from `X-Forwarded-For` / `X-Real-IP`.
        /// Disable when not behind a proxy that overwrites these headers.
        trust_forwarded_headers: bool = true,
    }
}

// ============================================================================
// WEBSOCKET CONFIGURATION
// ============================================================================

config_struct! {
    /// Per-connection delivery settings
    pub struct WebSocketConfig {
        /// Bounded outbound queue per connection; a full queue evicts the client
        send_queue_capacity: usize = 256,
        heartbeat_interval_secs: u64 = 30,
        write_timeout_secs: u64 = 10,
        /// Inbound frames above this size close the connection
        max_message_bytes: usize = 512,
    }
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

// ============================================================================
// RATE LIMIT CONFIGURATION
// ============================================================================

config_struct! {
    /// Request admission limits
    pub struct RateLimitConfig {
        api_requests: u32 = 100,
        api_window_secs: u64 = 60,
        auth_requests: u32 = 10,
        auth_window_secs: u64 = 60,
        /// How often idle buckets are swept
        sweep_interval_secs: u64 = 300,
    }
}

impl RateLimitConfig {
    pub fn api_window(&self) -> Duration {
        Duration::from_secs(self.api_window_secs)
    }

    pub fn auth_window(&self) -> Duration {
        Duration::from_secs(self.auth_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ============================================================================
// AUTH CONFIGURATION
// ============================================================================

config_struct! {
    /// Auth service collaborator
    pub struct AuthConfig {
        service_url: String = "http://localhost:8081".to_string(),
        request_timeout_secs: u64 = 5,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    pub struct Config {
        webserver: WebserverConfig = WebserverConfig::default(),
        websocket: WebSocketConfig = WebSocketConfig::default(),
        rate_limit: RateLimitConfig = RateLimitConfig::default(),
        auth: AuthConfig = AuthConfig::default(),
    }
}

impl Config {
    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("QUILLGATE_HOST") {
            self.webserver.host = host;
        }
        if let Some(port) = lookup("QUILLGATE_PORT") {
            self.webserver.port = port.parse().map_err(|_| ConfigurationError::InvalidConfig {
                field: "QUILLGATE_PORT".to_string(),
                reason: format!("'{}' is not a valid port", port),
            })?;
        }
        if let Some(trust) = lookup("QUILLGATE_TRUST_FORWARDED_HEADERS") {
            self.webserver.trust_forwarded_headers =
                trust.parse().map_err(|_| ConfigurationError::InvalidConfig {
                    field: "QUILLGATE_TRUST_FORWARDED_HEADERS".to_string(),
                    reason: format!("'{}' is not true or false", trust),
                })?;
        }
        if let Some(url) = lookup("AUTH_SERVICE_URL") {
            self.auth.service_url = url;
        }
        if let Some(origins) = lookup("QUILLGATE_ALLOWED_ORIGINS") {
            self.webserver.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        fn positive(field: &str, value: u64) -> Result<(), ConfigurationError> {
            if value == 0 {
                return Err(ConfigurationError::InvalidConfig {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        positive(
            "websocket.send_queue_capacity",
            self.websocket.send_queue_capacity as u64,
        )?;
        positive(
            "websocket.heartbeat_interval_secs",
            self.websocket.heartbeat_interval_secs,
        )?;
        positive(
            "websocket.write_timeout_secs",
            self.websocket.write_timeout_secs,
        )?;
        positive(
            "websocket.max_message_bytes",
            self.websocket.max_message_bytes as u64,
        )?;
        positive("rate_limit.api_requests", self.rate_limit.api_requests as u64)?;
        positive("rate_limit.api_window_secs", self.rate_limit.api_window_secs)?;
        positive(
            "rate_limit.auth_requests",
            self.rate_limit.auth_requests as u64,
        )?;
        positive("rate_limit.auth_window_secs", self.rate_limit.auth_window_secs)?;
        positive(
            "rate_limit.sweep_interval_secs",
            self.rate_limit.sweep_interval_secs,
        )?;

        let url = &self.auth.service_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidConfig {
                field: "auth.service_url".to_string(),
                reason: format!("'{}' must be an http(s) URL", url),
            });
        }

        Ok(())
    }
}
