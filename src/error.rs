use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised at the storage boundary.
/// The payload is the driver's message, which is echoed to the client as `details`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn connect(err: tokio_postgres::Error) -> Self {
        Self::Connect(postgres_message(&err))
    }

    pub fn query(err: tokio_postgres::Error) -> Self {
        Self::Query(postgres_message(&err))
    }

    /// The raw failure detail without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            StoreError::Connect(message) | StoreError::Query(message) => message,
        }
    }
}

// Server-side errors carry a clean message; everything else (I/O, TLS, closed
// connection) falls back to the driver's Display.
fn postgres_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db_error) => db_error.message().to_string(),
        None => err.to_string(),
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidJson(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::MethodNotAllowed => json!({ "error": "Method not allowed" }),
            ApiError::InvalidJson(ref err) => {
                tracing::debug!("Rejected request body: {}", err);
                json!({ "error": "Invalid JSON" })
            }
            ApiError::Validation(ref message) => {
                tracing::debug!("Validation error: {}", message);
                json!({ "error": message })
            }
            ApiError::Database(ref err) => {
                match err {
                    StoreError::Connect(detail) => {
                        tracing::error!("PostgreSQL connection error: {}", detail)
                    }
                    StoreError::Query(detail) => {
                        tracing::error!("PostgreSQL query error: {}", detail)
                    }
                }
                json!({ "error": "Database error", "details": err.detail() })
            }
        };

        (status, Json(body)).into_response()
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;
