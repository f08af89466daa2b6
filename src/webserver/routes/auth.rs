/// Token validation proxy
///
/// `POST /api/v1/auth/validate` forwards a token to the auth service. It sits
/// behind both the API limiter and the stricter auth limiter.
use axum::{extract::State, response::Response, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::SubscriberId,
    errors::{AuthError, GatewayError},
    logger::{self, LogTag},
    webserver::{state::AppState, utils::success_response},
};

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user_id: SubscriberId,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/validate", post(validate_token))
}

/// POST /api/v1/auth/validate
async fn validate_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateTokenRequest>,
) -> Result<Response, GatewayError> {
    if request.token.is_empty() {
        return Err(AuthError::MissingToken.into());
    }

    match state.auth.validate_token(&request.token).await {
        Ok(Some(user_id)) => Ok(success_response(ValidateTokenResponse {
            valid: true,
            user_id,
        })),
        Ok(None) => Err(AuthError::InvalidToken.into()),
        Err(e) => {
            logger::error(LogTag::Auth, &format!("Token validation failed: {}", e));
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::testing::StaticAuthClient;
    use crate::config::Config;
    use crate::webserver::{routes::create_router, state::AppState};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post_validate(app: Router, token: &str, ip: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/validate")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({ "token": token }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn app(auth: StaticAuthClient, auth_requests: u32) -> Router {
        let mut config = Config::default();
        config.rate_limit.auth_requests = auth_requests;
        create_router(Arc::new(AppState::new(config, Arc::new(auth))))
    }

    #[tokio::test]
    async fn test_validate_outcomes() {
        let app = app(StaticAuthClient::default().with_token("tok-u1", "u1"), 10);

        let (status, body) = post_validate(app.clone(), "tok-u1", "203.0.113.7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"valid": true, "user_id": "u1"}));

        let (status, body) = post_validate(app.clone(), "nope", "203.0.113.7").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");

        let (status, body) = post_validate(app, "", "203.0.113.7").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_auth_service_down_is_bad_gateway() {
        let app = app(StaticAuthClient::unavailable(), 10);

        let (status, body) = post_validate(app, "tok-u1", "203.0.113.7").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "AUTH_SERVICE_ERROR");
        assert_eq!(body["error"]["message"], "Failed to validate token");
    }

    #[tokio::test]
    async fn test_auth_limiter_is_stricter() {
        let app = app(StaticAuthClient::default(), 3);

        for _ in 0..3 {
            let (status, _) = post_validate(app.clone(), "nope", "203.0.113.7").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, body) = post_validate(app.clone(), "nope", "203.0.113.7").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");

        // the general API budget for this client is untouched by the auth limit
        let request = Request::builder()
            .uri("/api/v1/realtime/stats")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
