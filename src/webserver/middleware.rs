/// Webserver middleware
///
/// Request interceptors for identity extraction and admission control
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    auth::{bearer_token, SubscriberId},
    errors::{GatewayError, RateLimitError},
    logger::{self, LogTag},
    ratelimit::RateLimiter,
    webserver::state::AppState,
};

/// Identity attached by [`optional_auth`] when the request carried a valid
/// bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub SubscriberId);

/// Attach the caller's identity when a valid bearer token is present
///
/// Never rejects: a missing, malformed or invalid token, or an unreachable
/// auth service, leaves the request anonymous.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(|t| t.to_string());

    if let Some(token) = token {
        match state.auth.validate_token(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => {
                logger::warning(
                    LogTag::Auth,
                    &format!("Optional auth skipped, auth service error: {}", e),
                );
            }
        }
    }

    next.run(request).await
}

/// Admission control for every `/api/v1` route
pub async fn api_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &state.api_limiter, request, next).await
}

/// Stricter admission control for `/api/v1/auth`
pub async fn auth_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &state.auth_limiter, request, next).await
}

async fn enforce(
    state: &AppState,
    limiter: &RateLimiter,
    request: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&request, state.config.webserver.trust_forwarded_headers);

    if limiter.allow(&key) {
        return next.run(request).await;
    }

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "Throttled {} {} for {} ({} limiter)",
                request.method(),
                request.uri().path(),
                key,
                limiter.name()
            ),
        );
    }

    GatewayError::from(RateLimitError::Exceeded { key }).into_response()
}

/// Key a request is counted under: `user:<id>` when an outer layer already
/// authenticated it, else the client IP
///
/// The gateway's own limiters run before any auth call, so for them this is
/// always the client IP.
pub fn rate_limit_key(request: &Request, trust_forwarded: bool) -> String {
    if let Some(AuthenticatedUser(user)) = request.extensions().get::<AuthenticatedUser>() {
        return format!("user:{}", user);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    client_ip(request.headers(), peer, trust_forwarded)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer
///
/// With `trust_forwarded` off only the socket peer is used.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if !trust_forwarded {
        return peer
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
