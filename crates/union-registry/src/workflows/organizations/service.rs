use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::info;

use super::domain::{
    NewOrganization, NewOrganizationalDocument, Organization, OrganizationId, OrganizationLevel,
    OrganizationalDocument, OrganizationalDocumentId, OrganizationalDocumentView, Participant,
};
use super::hierarchy::{self, has_authority};
use super::repository::OrganizationRepository;
use crate::workflows::access::{Actor, Capability};
use crate::workflows::http::HttpFailure;
use crate::workflows::signing::{apply_decision, SignatureDecision, SigningError, TransitionOutcome};
use crate::workflows::storage::RepositoryError;

static ORGANIZATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_organization_id() -> OrganizationId {
    let id = ORGANIZATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OrganizationId(format!("org-{id:06}"))
}

fn next_document_id() -> OrganizationalDocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OrganizationalDocumentId(format!("odoc-{id:06}"))
}

/// Validation failures for hierarchy and organizational-document payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrganizationViolation {
    #[error("organization name is required")]
    MissingName,
    #[error("a federal organization cannot have a parent")]
    FederalWithParent,
    #[error("a {} organization requires a parent", .0.label())]
    MissingParent(OrganizationLevel),
    #[error("parent organization {0} does not exist")]
    UnknownParent(String),
    #[error("a {} organization cannot be placed under a {} organization", .child.label(), .parent.label())]
    InvalidParent {
        parent: OrganizationLevel,
        child: OrganizationLevel,
    },
    #[error("document title is required")]
    MissingTitle,
    #[error("at least one participant is required")]
    NoParticipants,
    #[error("organization {0} does not exist")]
    UnknownOrganization(String),
}

#[derive(Debug, thiserror::Error)]
pub enum OrganizationServiceError {
    #[error(transparent)]
    Validation(#[from] OrganizationViolation),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HttpFailure for OrganizationServiceError {
    fn status(&self) -> StatusCode {
        match self {
            OrganizationServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            OrganizationServiceError::Signing(_) => StatusCode::CONFLICT,
            OrganizationServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrganizationServiceError::NotFound(_)
            | OrganizationServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            OrganizationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            OrganizationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Service over the organization hierarchy and multi-signer organizational documents.
pub struct OrganizationService<O> {
    repository: Arc<O>,
}

impl<O> OrganizationService<O>
where
    O: OrganizationRepository + 'static,
{
    pub fn new(repository: Arc<O>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<O> {
        &self.repository
    }

    /// Register an organization beneath a parent the caller presides over.
    pub fn create_organization(
        &self,
        actor: &Actor,
        request: NewOrganization,
    ) -> Result<Organization, OrganizationServiceError> {
        if !actor.can(Capability::ManageOrganizations) {
            return Err(OrganizationServiceError::Forbidden(
                "role cannot manage organizations",
            ));
        }

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(OrganizationViolation::MissingName.into());
        }

        match (request.level, &request.parent_id) {
            (OrganizationLevel::Federal, Some(_)) => {
                return Err(OrganizationViolation::FederalWithParent.into())
            }
            (OrganizationLevel::Federal, None) => {
                if !actor.is_super_admin() {
                    return Err(OrganizationServiceError::Forbidden(
                        "only super admins can register federal organizations",
                    ));
                }
            }
            (level, None) => return Err(OrganizationViolation::MissingParent(level).into()),
            (level, Some(parent_id)) => {
                let parent = self
                    .repository
                    .fetch(parent_id)?
                    .ok_or_else(|| OrganizationViolation::UnknownParent(parent_id.0.clone()))?;
                if !parent.level.can_parent(level) {
                    return Err(OrganizationViolation::InvalidParent {
                        parent: parent.level,
                        child: level,
                    }
                    .into());
                }
                if !has_authority(self.repository.as_ref(), actor, &parent.id)? {
                    return Err(OrganizationServiceError::Forbidden(
                        "parent organization is outside the caller's hierarchy",
                    ));
                }
            }
        }

        let organization = Organization {
            id: next_organization_id(),
            name,
            level: request.level,
            parent_id: request.parent_id,
            created_at: Utc::now(),
        };
        let stored = self.repository.insert(organization)?;
        info!(
            organization_id = %stored.id.0,
            level = stored.level.label(),
            "organization registered"
        );
        Ok(stored)
    }

    pub fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Organization, OrganizationServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(OrganizationServiceError::NotFound("organization"))
    }

    pub fn children(
        &self,
        id: &OrganizationId,
    ) -> Result<Vec<Organization>, OrganizationServiceError> {
        self.get_organization(id)?;
        Ok(self.repository.children(id)?)
    }

    /// Parent chain, nearest first.
    pub fn ancestors(
        &self,
        id: &OrganizationId,
    ) -> Result<Vec<Organization>, OrganizationServiceError> {
        let organization = self.get_organization(id)?;
        Ok(hierarchy::ancestors(self.repository.as_ref(), &organization)?)
    }

    pub fn create_document(
        &self,
        actor: &Actor,
        request: NewOrganizationalDocument,
    ) -> Result<OrganizationalDocumentView, OrganizationServiceError> {
        if !actor.can(Capability::CreateOrganizationalDocuments) {
            return Err(OrganizationServiceError::Forbidden(
                "role cannot create organizational documents",
            ));
        }

        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(OrganizationViolation::MissingTitle.into());
        }

        if self.repository.fetch(&request.organization_id)?.is_none() {
            let missing = request.organization_id.0.clone();
            return Err(OrganizationViolation::UnknownOrganization(missing).into());
        }
        if !has_authority(self.repository.as_ref(), actor, &request.organization_id)? {
            return Err(OrganizationServiceError::Forbidden(
                "organization is outside the caller's hierarchy",
            ));
        }

        let mut seen = HashSet::new();
        let participants: Vec<Participant> = request
            .participants
            .into_iter()
            .filter(|user_id| !user_id.0.trim().is_empty())
            .filter(|user_id| seen.insert(user_id.clone()))
            .map(Participant::pending)
            .collect();
        if participants.is_empty() {
            return Err(OrganizationViolation::NoParticipants.into());
        }

        let document = OrganizationalDocument {
            id: next_document_id(),
            organization_id: request.organization_id,
            kind: request.kind,
            title,
            created_by: actor.user_id.clone(),
            created_at: Utc::now(),
            participants,
        };
        let stored = self.repository.insert_document(document)?;
        info!(
            document_id = %stored.id.0,
            participants = stored.participants.len(),
            "organizational document created"
        );
        Ok(stored.into())
    }

    /// Visible to participants, the creator, and anyone presiding over the organization.
    pub fn get_document(
        &self,
        actor: &Actor,
        id: &OrganizationalDocumentId,
    ) -> Result<OrganizationalDocumentView, OrganizationServiceError> {
        let document = self.fetch_document(id)?;
        let visible = document.is_participant(&actor.user_id)
            || document.created_by == actor.user_id
            || has_authority(self.repository.as_ref(), actor, &document.organization_id)?;
        if !visible {
            return Err(OrganizationServiceError::Forbidden(
                "caller is not attached to this document",
            ));
        }
        Ok(document.into())
    }

    pub fn sign_document(
        &self,
        actor: &Actor,
        id: &OrganizationalDocumentId,
    ) -> Result<OrganizationalDocumentView, OrganizationServiceError> {
        self.decide(actor, id, SignatureDecision::Sign, None)
    }

    pub fn reject_document(
        &self,
        actor: &Actor,
        id: &OrganizationalDocumentId,
        reason: Option<String>,
    ) -> Result<OrganizationalDocumentView, OrganizationServiceError> {
        self.decide(actor, id, SignatureDecision::Reject, reason)
    }

    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<OrganizationalDocument, OrganizationServiceError> {
        self.repository
            .fetch_document(id)?
            .ok_or(OrganizationServiceError::NotFound("organizational document"))
    }

    /// The participant's status is read and written under one repository lock, so concurrent
    /// decisions by different participants never overwrite each other.
    fn decide(
        &self,
        actor: &Actor,
        id: &OrganizationalDocumentId,
        decision: SignatureDecision,
        reason: Option<String>,
    ) -> Result<OrganizationalDocumentView, OrganizationServiceError> {
        let mut outcome = TransitionOutcome::Unchanged;
        let document = self
            .repository
            .update_participant::<OrganizationServiceError, _>(id, &actor.user_id, |participant| {
                let participant = participant.ok_or(OrganizationServiceError::Forbidden(
                    "caller is not a participant of this document",
                ))?;
                outcome = apply_decision(participant.status, decision)?;
                if outcome == TransitionOutcome::Unchanged {
                    return Ok(());
                }

                participant.status = decision.target();
                match decision {
                    SignatureDecision::Sign => participant.signed_at = Some(Utc::now()),
                    SignatureDecision::Reject => {
                        participant.rejection_reason = reason
                            .map(|value| value.trim().to_string())
                            .filter(|value| !value.is_empty());
                    }
                }
                Ok(())
            })
            .map_err(|err| match err {
                OrganizationServiceError::Repository(RepositoryError::NotFound) => {
                    OrganizationServiceError::NotFound("organizational document")
                }
                other => other,
            })?;

        if outcome == TransitionOutcome::Applied {
            info!(
                document_id = %document.id.0,
                user_id = %actor.user_id.0,
                status = decision.target().label(),
                "participant decision recorded"
            );
        }
        Ok(document.into())
    }
}
