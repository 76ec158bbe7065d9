use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::path::{Component, PathBuf};
use tracing::warn;

/// Adds the operational endpoints and the generated-document file route to `router`.
pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/documents/*file", get(document_file_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Only plain relative paths resolve; anything that could climb out of the directory is refused.
fn relative_file(raw: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(raw);
    let plain = candidate
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    (plain && !raw.is_empty() && !raw.contains('\\')).then_some(candidate)
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "document file not found" })),
    )
        .into_response()
}

pub(crate) async fn document_file_endpoint(
    Extension(state): Extension<AppState>,
    Path(file): Path<String>,
) -> Response {
    let Some(relative) = relative_file(&file) else {
        warn!(%file, "refused document path");
        return not_found();
    };

    let path = state.documents_dir.join(&relative);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.essence_str().to_string())],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => not_found(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "document file unreadable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}
