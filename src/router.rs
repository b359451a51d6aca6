use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    db::SharedStore,
    handlers::{
        availability::{get_availability, update_availability},
        health_check, method_not_allowed, preflight,
    },
    middleware::{cors_headers, trace_layer},
};

/// Path prefix the calendar frontend uses for the two endpoints.
pub const FUNCTIONS_PREFIX: &str = "/.netlify/functions";

/// Create the Axum router with all endpoints and middleware.
/// The availability endpoints are served both at the root and under
/// [`FUNCTIONS_PREFIX`].
pub fn create_router(store: SharedStore) -> Router {
    let availability: Router<SharedStore> = Router::new()
        .route(
            "/get-availability",
            get(get_availability)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/update-availability",
            post(update_availability)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(cors_headers());

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(availability.clone())
        .nest(FUNCTIONS_PREFIX, availability)
        .with_state(store)
        .layer(trace_layer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const READ: &str = "/get-availability";
    const WRITE: &str = "/update-availability";

    fn app(store: &MemoryStore) -> Router {
        create_router(Arc::new(store.clone()))
    }

    async fn send(store: &MemoryStore, method: Method, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        app(store).oneshot(request).await.expect("Router is infallible")
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).expect("Body should be JSON")
    }

    async fn write(store: &MemoryStore, date_key: &str, is_available: bool) -> Response {
        let body = json!({ "dateKey": date_key, "isAvailable": is_available }).to_string();
        send(store, Method::POST, WRITE, &body).await
    }

    async fn read(store: &MemoryStore) -> Value {
        let response = send(store, Method::GET, READ, "").await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    fn assert_cors_headers(response: &Response) {
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_read_empty_table() {
        let store = MemoryStore::new();

        let response = send(&store, Method::GET, READ, "").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);
        assert_eq!(json_body(response).await, json!({}));
        assert_eq!(store.sessions_opened(), 1);
        assert_eq!(store.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();

        let response = write(&store, "2024-03-15", true).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({ "success": true, "dateKey": "2024-03-15", "isAvailable": true })
        );

        write(&store, "2024-03-16", false).await;

        assert_eq!(read(&store).await, json!({ "2024-03-15": true, "2024-03-16": false }));
    }

    #[tokio::test]
    async fn test_repeated_write_is_idempotent() {
        let store = MemoryStore::new();

        let first = json_body(write(&store, "2024-01-01", true).await).await;
        let state_after_first = read(&store).await;
        let second = json_body(write(&store, "2024-01-01", true).await).await;

        assert_eq!(first, second);
        assert_eq!(read(&store).await, state_after_first);
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_key() {
        let store = MemoryStore::new();

        write(&store, "2024-01-01", true).await;
        let response = write(&store, "2024-01-01", false).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read(&store).await, json!({ "2024-01-01": false }));

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_available);
    }

    #[tokio::test]
    async fn test_write_missing_flag() {
        let store = MemoryStore::new();

        let response = send(&store, Method::POST, WRITE, r#"{"dateKey": "2024-01-01"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors_headers(&response);
        assert_eq!(json_body(response).await, json!({ "error": "dateKey and isAvailable required" }));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_write_mistyped_flag() {
        let store = MemoryStore::new();

        let response = send(&store, Method::POST, WRITE, r#"{"dateKey":"2024-01-01","isAvailable":"yes"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "dateKey and isAvailable required" }));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_write_unparseable_body() {
        let store = MemoryStore::new();

        let response = send(&store, Method::POST, WRITE, "not json").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors_headers(&response);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid JSON" }));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_write_without_content_type() {
        let store = MemoryStore::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri(WRITE)
            .body(Body::from(r#"{"dateKey":"2024-05-01","isAvailable":true}"#))
            .unwrap();

        let response = app(&store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read(&store).await, json!({ "2024-05-01": true }));
    }

    #[tokio::test]
    async fn test_method_guards() {
        let store = MemoryStore::new();

        let response = send(&store, Method::GET, WRITE, "").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors_headers(&response);
        assert_eq!(json_body(response).await, json!({ "error": "Method not allowed" }));

        let response = send(&store, Method::POST, READ, "{}").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await, json!({ "error": "Method not allowed" }));

        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let response = send(&store, method, READ, "").await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }

        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_preflight_never_touches_storage() {
        let store = MemoryStore::new();

        for uri in [READ, WRITE] {
            let response = send(&store, Method::OPTIONS, uri, "").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_cors_headers(&response);
            assert!(body_bytes(response).await.is_empty());
        }

        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_on_read() {
        let store = MemoryStore::new();
        store.fail_connect("Connection refused (os error 111)");

        let response = send(&store, Method::GET, READ, "").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Database error", "details": "Connection refused (os error 111)" })
        );
    }

    #[tokio::test]
    async fn test_storage_failure_on_write_closes_session() {
        let store = MemoryStore::new();
        store.fail_queries("permission denied for table availability");

        let response = write(&store, "2024-01-01", true).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Database error", "details": "permission denied for table availability" })
        );
        assert_eq!(store.sessions_opened(), 1);
        assert_eq!(store.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_functions_prefix_routes() {
        let store = MemoryStore::new();

        let body = json!({ "dateKey": "2024-07-04", "isAvailable": false }).to_string();
        let uri = format!("{}{}", FUNCTIONS_PREFIX, WRITE);
        let response = send(&store, Method::POST, &uri, &body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let uri = format!("{}{}", FUNCTIONS_PREFIX, READ);
        let response = send(&store, Method::GET, &uri, "").await;
        assert_cors_headers(&response);
        assert_eq!(json_body(response).await, json!({ "2024-07-04": false }));
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = MemoryStore::new();

        let response = send(&store, Method::GET, "/health", "").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"OK");
        assert_eq!(store.sessions_opened(), 0);
    }
}
