/// JSON response helpers
///
/// Every API response uses the same envelope:
/// `{"success": true, "data": ...}` or
/// `{"success": false, "error": {"code": ..., "message": ..., "details"?: ...}}`
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// 200 with `data` wrapped in the success envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
    .into_response()
}

pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<&str>,
) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(ApiError {
            code: code.to_string(),
            message: message.to_string(),
            details: details.map(|d| d.to_string()),
        }),
    };
    (status, Json(body)).into_response()
}
