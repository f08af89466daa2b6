/// Error handling for quillgate
///
/// One top-level `GatewayError` wraps per-domain error enums. Only request
/// paths (upgrade, admission, auth proxy) and startup produce errors; hub
/// delivery failures are contained per connection and never surface here.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::webserver::utils::error_response;

pub type Result<T> = std::result::Result<T, GatewayError>;

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// AUTH ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Origin '{origin}' is not allowed")]
    OriginNotAllowed { origin: String },

    #[error("Auth service unavailable at {endpoint}: {reason}")]
    ServiceUnavailable { endpoint: String, reason: String },

    #[error("Auth service returned HTTP {status}")]
    UnexpectedResponse { status: u16 },
}

// =============================================================================
// CONFIGURATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid config field '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

// =============================================================================
// RATE LIMIT ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("Too many requests. Please try again later.")]
    Exceeded { key: String },
}

impl GatewayError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(AuthError::MissingToken | AuthError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Auth(AuthError::OriginNotAllowed { .. }) => StatusCode::FORBIDDEN,
            GatewayError::Auth(
                AuthError::ServiceUnavailable { .. } | AuthError::UnexpectedResponse { .. },
            ) => StatusCode::BAD_GATEWAY,
            GatewayError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Configuration(_) | GatewayError::Io(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Auth(AuthError::MissingToken) => "UNAUTHORIZED",
            GatewayError::Auth(AuthError::InvalidToken) => "INVALID_TOKEN",
            GatewayError::Auth(AuthError::OriginNotAllowed { .. }) => "ORIGIN_NOT_ALLOWED",
            GatewayError::Auth(_) => "AUTH_SERVICE_ERROR",
            GatewayError::RateLimit(_) => "RATE_LIMITED",
            GatewayError::Configuration(_) => "CONFIGURATION_ERROR",
            GatewayError::Io(_) | GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to clients
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Auth(AuthError::ServiceUnavailable { .. })
            | GatewayError::Auth(AuthError::UnexpectedResponse { .. }) => {
                "Failed to validate token".to_string()
            }
            GatewayError::Auth(e) => e.to_string(),
            GatewayError::RateLimit(e) => e.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.code(), &self.public_message(), None)
    }
}
