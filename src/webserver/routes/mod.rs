use crate::webserver::{
    middleware::{api_rate_limit, auth_rate_limit, optional_auth},
    state::AppState,
};
use axum::{middleware::from_fn_with_state, Router};
use std::sync::Arc;

pub mod auth;
pub mod status;
pub mod ws;

/// Build the gateway router
///
/// `/health` and `/ws` are not rate limited. Everything under `/api/v1`
/// passes the API limiter before anything else, so a throttled request never
/// reaches the auth service. `/api/v1/auth` is additionally gated by the auth
/// limiter; optional auth is attached only to the routes that read the
/// caller's identity.
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes =
        auth::routes().layer(from_fn_with_state(state.clone(), auth_rate_limit));

    let identified_routes =
        status::api_routes().layer(from_fn_with_state(state.clone(), optional_auth));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .merge(identified_routes)
        .layer(from_fn_with_state(state.clone(), api_rate_limit));

    Router::new()
        .merge(status::routes())
        .merge(ws::routes())
        .nest("/api/v1", api)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::StaticAuthClient;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app(auth: Arc<StaticAuthClient>, api_requests: u32) -> Router {
        let mut config = Config::default();
        config.rate_limit.api_requests = api_requests;
        create_router(Arc::new(AppState::new(config, auth)))
    }

    #[tokio::test]
    async fn test_throttled_requests_never_reach_auth_service() {
        let auth = Arc::new(StaticAuthClient::default());
        let app = app(auth.clone(), 1);

        let mut throttled = 0;
        for i in 0..5 {
            let request = Request::builder()
                .uri("/api/v1/realtime/stats")
                .header("x-forwarded-for", "203.0.113.7")
                .header("authorization", format!("Bearer junk{}", i))
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
            }
        }

        assert_eq!(throttled, 4);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_auth_route_skips_optional_auth() {
        let auth = Arc::new(StaticAuthClient::default().with_token("tok-u1", "u1"));
        let app = app(auth.clone(), 100);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/validate")
            .header("content-type", "application/json")
            .header("authorization", "Bearer tok-u1")
            .body(Body::from(json!({ "token": "tok-u1" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // only the body token was validated, not the bearer header
        assert_eq!(auth.calls(), 1);
    }
}
