use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, ApplicationStatus, ApplicationSubmission, DocumentId};
use super::repository::{ApplicationFilter, ApplicationRepository, Notifier};
use super::review::ReviewRequest;
use super::service::MembershipService;
use crate::workflows::access::Actor;
use crate::workflows::http::{
    failure_response, payload_rejection, ErrorDisclosure, RejectionPayload, ServiceState,
};
use crate::workflows::organizations::{OrganizationId, OrganizationRepository};

type MembershipState<R, O, N> = ServiceState<MembershipService<R, O, N>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) organization_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

/// Router builder exposing intake, review, package and signing endpoints.
pub fn membership_router<R, O, N>(
    service: Arc<MembershipService<R, O, N>>,
    disclosure: ErrorDisclosure,
) -> Router
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/applications",
            post(submit_handler::<R, O, N>).get(list_handler::<R, O, N>),
        )
        .route(
            "/api/applications/:application_id",
            get(application_handler::<R, O, N>),
        )
        .route(
            "/api/applications/:application_id/status",
            patch(review_handler::<R, O, N>),
        )
        .route(
            "/api/applications/:application_id/documents",
            post(generate_documents_handler::<R, O, N>).get(documents_handler::<R, O, N>),
        )
        .route(
            "/api/documents/:document_id/sign",
            post(sign_document_handler::<R, O, N>),
        )
        .route(
            "/api/documents/:document_id/reject",
            post(reject_document_handler::<R, O, N>),
        )
        .route(
            "/api/documents/:document_id/send",
            post(send_document_handler::<R, O, N>),
        )
        .with_state(ServiceState {
            service,
            disclosure,
        })
}

pub(crate) async fn submit_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    payload: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return payload_rejection(rejection),
    };

    match state.service.submit(submission) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn list_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match ApplicationStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                let payload = json!({ "error": format!("unknown status '{raw}'") });
                return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
            }
        },
    };
    let filter = ApplicationFilter {
        organization_id: query
            .organization_id
            .filter(|value| !value.trim().is_empty())
            .map(OrganizationId),
        status,
        user_id: None,
    };

    match state.service.list(&actor, filter) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn application_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .service
        .get(&actor, &ApplicationId(application_id))
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn review_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(application_id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return payload_rejection(rejection),
    };

    match state
        .service
        .review(&actor, &ApplicationId(application_id), request)
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn generate_documents_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .service
        .generate_documents(&actor, &ApplicationId(application_id))
    {
        Ok(documents) => (StatusCode::CREATED, Json(documents)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn documents_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .service
        .documents(&actor, &ApplicationId(application_id))
    {
        Ok(documents) => (StatusCode::OK, Json(documents)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn sign_document_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(document_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .service
        .sign_document(&actor, &DocumentId(document_id))
    {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn reject_document_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(document_id): Path<String>,
    payload: Option<Json<RejectionPayload>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    let reason = payload.and_then(|Json(body)| body.reason);
    match state
        .service
        .reject_document(&actor, &DocumentId(document_id), reason)
    {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn send_document_handler<R, O, N>(
    State(state): State<MembershipState<R, O, N>>,
    actor: Actor,
    Path(document_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .service
        .send_to_union(&actor, &DocumentId(document_id))
    {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}
