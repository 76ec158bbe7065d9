use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::config::AppEnvironment;

const GENERIC_FAILURE: &str = "internal server error";

/// How much of an unexpected failure is echoed back to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisclosure {
    Detailed,
    Generic,
}

impl ErrorDisclosure {
    pub fn for_environment(environment: AppEnvironment) -> Self {
        if environment.exposes_internal_errors() {
            ErrorDisclosure::Detailed
        } else {
            ErrorDisclosure::Generic
        }
    }
}

/// Router state pairing a workflow service with the disclosure policy.
pub(crate) struct ServiceState<S> {
    pub(crate) service: Arc<S>,
    pub(crate) disclosure: ErrorDisclosure,
}

impl<S> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            disclosure: self.disclosure,
        }
    }
}

/// Optional body of the reject endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectionPayload {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

/// Errors that know which HTTP status they map to.
pub(crate) trait HttpFailure: std::fmt::Display {
    fn status(&self) -> StatusCode;
}

pub(crate) fn failure_response<E: HttpFailure>(err: &E, disclosure: ErrorDisclosure) -> Response {
    let status = err.status();
    let message = if status.is_server_error() {
        error!(error = %err, "request failed");
        match disclosure {
            ErrorDisclosure::Detailed => err.to_string(),
            ErrorDisclosure::Generic => GENERIC_FAILURE.to_string(),
        }
    } else {
        err.to_string()
    };

    (status, Json(json!({ "error": message }))).into_response()
}

/// Unreadable JSON bodies are validation failures.
pub(crate) fn payload_rejection(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": format!("malformed payload: {}", rejection.body_text()) });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl std::fmt::Display for Broken {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk quota exceeded on /var/lib/union")
        }
    }

    impl HttpFailure for Broken {
        fn status(&self) -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn generic_disclosure_hides_internal_detail() {
        let response = failure_response(&Broken, ErrorDisclosure::Generic);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains(GENERIC_FAILURE));
        assert!(!body.contains("quota"));
    }

    #[tokio::test]
    async fn detailed_disclosure_echoes_message() {
        let response = failure_response(&Broken, ErrorDisclosure::Detailed);
        assert!(body_text(response).await.contains("disk quota exceeded"));
    }

    #[test]
    fn production_maps_to_generic() {
        assert_eq!(
            ErrorDisclosure::for_environment(AppEnvironment::Production),
            ErrorDisclosure::Generic
        );
        assert_eq!(
            ErrorDisclosure::for_environment(AppEnvironment::Development),
            ErrorDisclosure::Detailed
        );
    }
}
