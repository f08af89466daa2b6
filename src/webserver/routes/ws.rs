/// Real-time notification endpoint
///
/// `GET /ws?token=<token>` authenticates the caller with the auth service,
/// checks the `Origin` header, then upgrades and hands the socket to the
/// hub. Every rejection happens before the upgrade, so no connection is
/// ever registered for an unauthenticated client.
use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::{
    arguments::is_debug_webserver_enabled,
    errors::{AuthError, GatewayError},
    logger::{self, LogTag},
    webserver::{state::AppState, ws::serve_connection},
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = match query.token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => return GatewayError::from(AuthError::MissingToken).into_response(),
    };

    let user = match state.auth.validate_token(token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            logger::warning(LogTag::Websocket, "WebSocket auth failed: invalid token");
            return GatewayError::from(AuthError::InvalidToken).into_response();
        }
        Err(e) => {
            logger::warning(
                LogTag::Websocket,
                &format!("WebSocket auth failed: {}", e),
            );
            return GatewayError::from(AuthError::InvalidToken).into_response();
        }
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.is_origin_allowed(origin) {
        let origin = origin.unwrap_or_default().to_string();
        logger::warning(
            LogTag::Websocket,
            &format!("Rejected WebSocket from origin '{}' (user={})", origin, user),
        );
        return GatewayError::from(AuthError::OriginNotAllowed { origin }).into_response();
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!("WebSocket upgrade rejected for user {}: {}", user, rejection),
                );
            }
            return rejection.into_response();
        }
    };

    let pump_config = state.pump_config();
    let hub = state.hub.clone();

    upgrade
        .max_message_size(pump_config.max_message_bytes)
        .on_upgrade(move |socket| serve_connection(socket, hub, Some(user), pump_config))
}
