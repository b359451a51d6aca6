// Handlers module
// HTTP handlers for the REST API

pub mod availability;

use axum::{http::StatusCode, response::IntoResponse};

use crate::error::ApiError;

/// Health check handler
/// Returns "OK" with 200 status for monitoring purposes; never touches the database
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// CORS preflight: 200 with an empty body. Headers come from the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback for any method an endpoint does not serve
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
