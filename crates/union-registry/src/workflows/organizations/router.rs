use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::{
    NewOrganization, NewOrganizationalDocument, OrganizationId, OrganizationalDocumentId,
};
use super::repository::OrganizationRepository;
use super::service::OrganizationService;
use crate::workflows::access::Actor;
use crate::workflows::http::{
    failure_response, payload_rejection, ErrorDisclosure, RejectionPayload, ServiceState,
};

type OrganizationState<O> = ServiceState<OrganizationService<O>>;

/// Router for the hierarchy and organizational-document endpoints.
pub fn organization_router<O>(
    service: Arc<OrganizationService<O>>,
    disclosure: ErrorDisclosure,
) -> Router
where
    O: OrganizationRepository + 'static,
{
    Router::new()
        .route("/api/organizations", post(create_organization_handler::<O>))
        .route(
            "/api/organizations/:organization_id",
            get(organization_handler::<O>),
        )
        .route(
            "/api/organizations/:organization_id/children",
            get(children_handler::<O>),
        )
        .route(
            "/api/organizational-documents",
            post(create_document_handler::<O>),
        )
        .route(
            "/api/organizational-documents/:document_id",
            get(document_handler::<O>),
        )
        .route(
            "/api/organizational-documents/:document_id/sign",
            post(sign_document_handler::<O>),
        )
        .route(
            "/api/organizational-documents/:document_id/reject",
            post(reject_document_handler::<O>),
        )
        .with_state(ServiceState {
            service,
            disclosure,
        })
}

pub(crate) async fn create_organization_handler<O>(
    State(state): State<OrganizationState<O>>,
    actor: Actor,
    payload: Result<Json<NewOrganization>, JsonRejection>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return payload_rejection(rejection),
    };

    match state.service.create_organization(&actor, request) {
        Ok(organization) => (StatusCode::CREATED, Json(organization)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn organization_handler<O>(
    State(state): State<OrganizationState<O>>,
    Path(organization_id): Path<String>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    match state
        .service
        .get_organization(&OrganizationId(organization_id))
    {
        Ok(organization) => (StatusCode::OK, Json(organization)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn children_handler<O>(
    State(state): State<OrganizationState<O>>,
    Path(organization_id): Path<String>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    match state.service.children(&OrganizationId(organization_id)) {
        Ok(children) => (StatusCode::OK, Json(children)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn create_document_handler<O>(
    State(state): State<OrganizationState<O>>,
    actor: Actor,
    payload: Result<Json<NewOrganizationalDocument>, JsonRejection>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return payload_rejection(rejection),
    };

    match state.service.create_document(&actor, request) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn document_handler<O>(
    State(state): State<OrganizationState<O>>,
    actor: Actor,
    Path(document_id): Path<String>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    match state
        .service
        .get_document(&actor, &OrganizationalDocumentId(document_id))
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn sign_document_handler<O>(
    State(state): State<OrganizationState<O>>,
    actor: Actor,
    Path(document_id): Path<String>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    match state
        .service
        .sign_document(&actor, &OrganizationalDocumentId(document_id))
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}

pub(crate) async fn reject_document_handler<O>(
    State(state): State<OrganizationState<O>>,
    actor: Actor,
    Path(document_id): Path<String>,
    payload: Option<Json<RejectionPayload>>,
) -> Response
where
    O: OrganizationRepository + 'static,
{
    let reason = payload.and_then(|Json(body)| body.reason);
    match state
        .service
        .reject_document(&actor, &OrganizationalDocumentId(document_id), reason)
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => failure_response(&err, state.disclosure),
    }
}
