//! HTTP transport for snapshot stores - serves a store as a remote draft service.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /drafts/:key` - 200 with the stored payload, 404 if absent.
//! - `PUT /drafts/:key` - store the request body. 507 when over quota.
//! - `DELETE /drafts/:key` - 204 if removed, 404 if absent.
//! - `GET /health` - `{ "ok": true }`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wizard_drafts::{FileSnapshotStore, store::http};
//!
//! let store = Arc::new(FileSnapshotStore::open("/var/lib/drafts")?);
//! http::serve(store, "0.0.0.0:3000").await?;
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use super::error::StorageError;
use super::SnapshotStore;

type SharedStore = Arc<dyn SnapshotStore>;

/// Build an axum `Router` exposing `store` under `/drafts/:key`.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/drafts/:key",
            get(read_handler).put(write_handler).delete(delete_handler),
        )
        .with_state(store)
}

/// Serve the store over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(store: SharedStore, addr: &str) -> Result<(), std::io::Error> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn read_handler(State(store): State<SharedStore>, Path(key): Path<String>) -> Response {
    match run_blocking(move || store.read_raw(&key)).await {
        Ok(Some(payload)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], payload).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

async fn write_handler(
    State(store): State<SharedStore>,
    Path(key): Path<String>,
    body: String,
) -> Response {
    match run_blocking(move || store.write_raw(&key, body)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_handler(State(store): State<SharedStore>, Path(key): Path<String>) -> Response {
    match run_blocking(move || store.delete(&key)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

/// Stores do blocking I/O; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Unavailable(format!("store task failed: {e}")))?
}

fn error_response(err: StorageError) -> Response {
    let status = match &err {
        StorageError::QuotaExceeded(_) => StatusCode::INSUFFICIENT_STORAGE,
        StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(%err, %status, "draft service request failed");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
