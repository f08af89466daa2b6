//! Auth service collaborator
//!
//! The gateway never verifies credentials itself. Tokens are handed to the
//! auth service, which answers with the subscriber identity they belong to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::errors::{AuthError, GatewayError};
use crate::logger::{self, LogTag};

/// Identity of an authenticated user (the auth service's user id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Token validation against the auth service
///
/// `Ok(Some(id))` for a valid token, `Ok(None)` for an invalid or expired
/// one, `Err` when the service could not be asked.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn validate_token(&self, token: &str) -> Result<Option<SubscriberId>, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    valid: bool,
    #[serde(default)]
    user_id: String,
}

/// `AuthClient` backed by the auth service's HTTP API
pub struct HttpAuthClient {
    client: reqwest::Client,
    validate_url: String,
}

impl HttpAuthClient {
    pub fn new(config: &AuthConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            validate_url: format!(
                "{}/api/v1/auth/validate",
                config.service_url.trim_end_matches('/')
            ),
        })
    }

    pub fn validate_url(&self) -> &str {
        &self.validate_url
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn validate_token(&self, token: &str) -> Result<Option<SubscriberId>, AuthError> {
        let response = self
            .client
            .post(&self.validate_url)
            .json(&ValidateRequest { token })
            .send()
            .await
            .map_err(|e| AuthError::ServiceUnavailable {
                endpoint: self.validate_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            logger::warning(
                LogTag::Auth,
                &format!("Auth service returned HTTP {}", status.as_u16()),
            );
            return Err(AuthError::UnexpectedResponse {
                status: status.as_u16(),
            });
        }

        let body: ValidateResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::ServiceUnavailable {
                    endpoint: self.validate_url.clone(),
                    reason: format!("malformed response: {}", e),
                })?;

        if !body.valid || body.user_id.is_empty() {
            logger::debug(LogTag::Auth, "Token rejected by auth service");
            return Ok(None);
        }

        Ok(Some(SubscriberId::from(body.user_id)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory token table for handler and middleware tests
    #[derive(Default)]
    pub struct StaticAuthClient {
        tokens: HashMap<String, SubscriberId>,
        unavailable: bool,
        calls: AtomicUsize,
    }

    impl StaticAuthClient {
        pub fn with_token(mut self, token: &str, user: &str) -> Self {
            self.tokens.insert(token.to_string(), SubscriberId::from(user));
            self
        }

        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        /// Number of `validate_token` calls made so far
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthClient for StaticAuthClient {
        async fn validate_token(&self, token: &str) -> Result<Option<SubscriberId>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(AuthError::ServiceUnavailable {
                    endpoint: "static".to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(self.tokens.get(token).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    async fn fake_validate(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        match body["token"].as_str() {
            Some("good") => (
                StatusCode::OK,
                Json(json!({"valid": true, "user_id": "u1"})),
            ),
            Some("boom") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
            _ => (StatusCode::OK, Json(json!({"valid": false}))),
        }
    }

    async fn spawn_auth_service() -> String {
        let app = Router::new().route("/api/v1/auth/validate", post(fake_validate));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_http_auth_client_against_service() {
        let url = spawn_auth_service().await;
        let client = HttpAuthClient::new(&AuthConfig {
            service_url: url,
            request_timeout_secs: 5,
        })
        .unwrap();
        // trailing slash on the base URL is not doubled
        assert!(!client.validate_url().contains("//api"));

        let user = client.validate_token("good").await.unwrap();
        assert_eq!(user, Some(SubscriberId::from("u1")));

        assert_eq!(client.validate_token("nope").await.unwrap(), None);

        let err = client.validate_token("boom").await.unwrap_err();
        assert!(matches!(err, AuthError::UnexpectedResponse { status: 500 }));
    }

    #[tokio::test]
    async fn test_http_auth_client_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpAuthClient::new(&AuthConfig {
            service_url: format!("http://{}", addr),
            request_timeout_secs: 2,
        })
        .unwrap();

        let err = client.validate_token("good").await.unwrap_err();
        assert!(matches!(err, AuthError::ServiceUnavailable { .. }));
    }
}
