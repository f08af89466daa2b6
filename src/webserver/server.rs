/// Axum webserver implementation
///
/// Server lifecycle management including startup, shutdown, and graceful
/// termination. Shutdown closes every WebSocket through the hub, otherwise
/// graceful shutdown would wait on long-lived sockets forever.
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{
    config::WebserverConfig,
    errors::{ConfigurationError, GatewayError},
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Bind the configured address and serve until shutdown
pub async fn start_server(state: Arc<AppState>) -> Result<(), GatewayError> {
    let webserver = &state.config.webserver;
    let addr: SocketAddr = format!("{}:{}", webserver.host, webserver.port)
        .parse()
        .map_err(|e| ConfigurationError::InvalidConfig {
            field: "webserver.host".to_string(),
            reason: format!("invalid bind address: {}", e),
        })?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        logger::error(
            LogTag::Webserver,
            &format!("Failed to bind to {}: {}", addr, e),
        );
        GatewayError::Io(e)
    })?;

    serve(listener, state).await
}

/// Serve on an already bound listener until shutdown
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), GatewayError> {
    let addr = listener.local_addr()?;
    let app = build_app(state.clone());

    logger::info(LogTag::Webserver, &format!("Listening on http://{}", addr));
    logger::info(
        LogTag::Webserver,
        &format!("Real-time endpoint at ws://{}/ws", addr),
    );

    let hub = state.hub.clone();
    let shutdown_signal = async move {
        tokio::select! {
            _ = SHUTDOWN_NOTIFY.notified() => {}
            _ = tokio::signal::ctrl_c() => {
                logger::info(LogTag::System, "Ctrl-C received");
            }
        }
        logger::info(
            LogTag::Webserver,
            "Received shutdown signal, closing real-time connections...",
        );
        hub.shutdown();
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown...");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.webserver);
    routes::create_router(state).layer(cors)
}

/// CORS policy for the configured origins
///
/// Credentials are only allowed with an explicit origin list; a wildcard
/// policy cannot carry them.
pub fn cors_layer(config: &WebserverConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(12 * 60 * 60));

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                logger::warning(
                    LogTag::Config,
                    &format!("Ignoring invalid allowed origin '{}'", o),
                );
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
