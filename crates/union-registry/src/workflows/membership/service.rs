use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{info, warn};

use super::documents::{DocumentPackager, PackageError, StoredFile};
use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission, ApplicationView,
    DocumentId, DocumentRecord,
};
use super::intake::{IntakeGuard, IntakeViolation};
use super::repository::{
    ApplicationFilter, ApplicationRepository, MemberNotification, Notifier,
};
use super::review::{plan_review, ReviewError, ReviewRequest, ReviewTransition};
use crate::workflows::access::{Actor, Capability};
use crate::workflows::http::HttpFailure;
use crate::workflows::organizations::hierarchy::has_authority;
use crate::workflows::organizations::OrganizationRepository;
use crate::workflows::signing::{
    apply_decision, DocumentStatus, SignatureDecision, SigningError, TransitionOutcome,
};
use crate::workflows::storage::RepositoryError;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

/// Error raised by the membership service.
#[derive(Debug, thiserror::Error)]
pub enum MembershipServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HttpFailure for MembershipServiceError {
    fn status(&self) -> StatusCode {
        match self {
            MembershipServiceError::Intake(_) => StatusCode::BAD_REQUEST,
            MembershipServiceError::Review(err) if err.is_conflict() => StatusCode::CONFLICT,
            MembershipServiceError::Review(_) => StatusCode::BAD_REQUEST,
            MembershipServiceError::Signing(_) | MembershipServiceError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            MembershipServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MembershipServiceError::NotFound(_)
            | MembershipServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            MembershipServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            MembershipServiceError::Package(_)
            | MembershipServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Service composing intake, review, document packages and signing.
pub struct MembershipService<R, O, N> {
    guard: IntakeGuard,
    applications: Arc<R>,
    organizations: Arc<O>,
    notifier: Arc<N>,
    packager: Arc<DocumentPackager>,
}

impl<R, O, N> MembershipService<R, O, N>
where
    R: ApplicationRepository + 'static,
    O: OrganizationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        applications: Arc<R>,
        organizations: Arc<O>,
        notifier: Arc<N>,
        packager: DocumentPackager,
    ) -> Self {
        Self {
            guard: IntakeGuard::default(),
            applications,
            organizations,
            notifier,
            packager: Arc::new(packager),
        }
    }

    pub fn with_guard(mut self, guard: IntakeGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Validate and persist a new application in PENDING state.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, MembershipServiceError> {
        let accepted = self.guard.accept(submission)?;
        if self.organizations.fetch(&accepted.organization_id)?.is_none() {
            return Err(
                IntakeViolation::UnknownOrganization(accepted.organization_id.0.clone()).into(),
            );
        }

        let record = ApplicationRecord {
            id: next_application_id(),
            organization_id: accepted.organization_id,
            user_id: accepted.user_id,
            applicant: accepted.applicant,
            status: ApplicationStatus::Pending,
            rejection_reason: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };

        let stored = self.applications.insert(record)?;
        info!(
            application_id = %stored.id.0,
            organization_id = %stored.organization_id.0,
            "membership application received"
        );
        self.notify(MemberNotification::application_received(&stored));
        Ok(stored)
    }

    /// Fetch an application with its documents.
    pub fn get(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<ApplicationView, MembershipServiceError> {
        let application = self.fetch_application(application_id)?;
        if !self.may_view(actor, &application)? {
            return Err(MembershipServiceError::Forbidden(
                "application is outside the caller's hierarchy",
            ));
        }
        let documents = self.applications.documents(application_id)?;
        Ok(ApplicationView {
            application,
            documents,
        })
    }

    /// Reviewers see their organization subtree; everyone else sees their own applications.
    pub fn list(
        &self,
        actor: &Actor,
        mut filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, MembershipServiceError> {
        if !actor.can(Capability::ReviewApplications) {
            filter.user_id = Some(actor.user_id.clone());
            return Ok(self.applications.list(&filter)?);
        }

        let mut visible = Vec::new();
        for record in self.applications.list(&filter)? {
            if has_authority(self.organizations.as_ref(), actor, &record.organization_id)? {
                visible.push(record);
            }
        }
        visible.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(visible)
    }

    /// Move a PENDING application to APPROVED or REJECTED and notify the applicant.
    pub fn review(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        request: ReviewRequest,
    ) -> Result<ApplicationRecord, MembershipServiceError> {
        let mut record = self.fetch_application(application_id)?;
        if !actor.can(Capability::ReviewApplications)
            || !has_authority(self.organizations.as_ref(), actor, &record.organization_id)?
        {
            return Err(MembershipServiceError::Forbidden(
                "caller cannot review applications of this organization",
            ));
        }

        let (status, reason) = match plan_review(record.status, request)? {
            ReviewTransition::Unchanged => return Ok(record),
            ReviewTransition::Apply { status, reason } => (status, reason),
        };

        record.status = status;
        record.rejection_reason = reason;
        record.reviewed_at = Some(Utc::now());
        record.reviewed_by = Some(actor.user_id.clone());
        self.applications.update(record.clone())?;

        info!(
            application_id = %record.id.0,
            status = record.status.label(),
            reviewer = %actor.user_id.0,
            "application reviewed"
        );
        self.notify(MemberNotification::application_reviewed(&record));
        Ok(record)
    }

    /// Render, store and record the three-document package.
    pub fn generate_documents(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentRecord>, MembershipServiceError> {
        let application = self.fetch_application(application_id)?;
        if !self.may_act(actor, &application, Capability::GenerateDocuments)? {
            return Err(MembershipServiceError::Forbidden(
                "caller cannot generate documents for this application",
            ));
        }
        if application.status == ApplicationStatus::Rejected {
            return Err(MembershipServiceError::Conflict(
                "documents cannot be generated for a rejected application",
            ));
        }

        let previous = self.applications.documents(application_id)?;
        if previous.iter().any(|document| document.status.is_decided()) {
            return Err(MembershipServiceError::Conflict(
                "package already contains signed or rejected documents",
            ));
        }

        let organization_name = self
            .organizations
            .fetch(&application.organization_id)?
            .map(|organization| organization.name)
            .unwrap_or_else(|| application.organization_id.0.clone());

        let now = Utc::now();
        let generated = self
            .packager
            .build(&application, &organization_name, now.date_naive())?;
        let documents: Vec<DocumentRecord> = generated
            .iter()
            .map(|generated| DocumentRecord {
                id: next_document_id(),
                application_id: application.id.clone(),
                kind: generated.kind,
                status: DocumentStatus::NotSigned,
                signed_at: None,
                rejection_reason: None,
                file_url: generated.file.url.clone(),
                file_path: generated.file.path.clone(),
                sent_to_union: false,
                sent_at: None,
                created_at: now,
            })
            .collect();

        let previous = match self
            .applications
            .replace_documents(application_id, documents.clone())
        {
            Ok(previous) => previous,
            Err(err) => {
                self.packager.discard(&generated);
                return Err(match err {
                    RepositoryError::Conflict => MembershipServiceError::Conflict(
                        "package already contains signed or rejected documents",
                    ),
                    other => other.into(),
                });
            }
        };

        let superseded = previous
            .into_iter()
            .filter(|document| {
                !generated
                    .iter()
                    .any(|file| file.file.path == document.file_path)
            })
            .map(|document| StoredFile {
                path: document.file_path,
                url: document.file_url,
            });
        self.packager.discard_paths(superseded);

        info!(
            application_id = %application.id.0,
            documents = documents.len(),
            "document package generated"
        );
        Ok(documents)
    }

    pub fn documents(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentRecord>, MembershipServiceError> {
        Ok(self.get(actor, application_id)?.documents)
    }

    pub fn sign_document(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
    ) -> Result<DocumentRecord, MembershipServiceError> {
        self.decide(actor, document_id, SignatureDecision::Sign, None)
    }

    pub fn reject_document(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
        reason: Option<String>,
    ) -> Result<DocumentRecord, MembershipServiceError> {
        self.decide(actor, document_id, SignatureDecision::Reject, reason)
    }

    /// Mark a signed document as forwarded to the union.
    pub fn send_to_union(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
    ) -> Result<DocumentRecord, MembershipServiceError> {
        let document = self.fetch_document(document_id)?;
        let application = self.fetch_application(&document.application_id)?;
        if !self.may_act(actor, &application, Capability::SendToUnion)? {
            return Err(MembershipServiceError::Forbidden(
                "caller cannot send this document",
            ));
        }

        let mut newly_sent = false;
        let document = self.update_document(document_id, |document| {
            if document.status != DocumentStatus::Signed {
                return Err(SigningError::NotSigned(document.status).into());
            }
            if !document.sent_to_union {
                document.sent_to_union = true;
                document.sent_at = Some(Utc::now());
                newly_sent = true;
            }
            Ok(())
        })?;
        if newly_sent {
            info!(document_id = %document.id.0, "document sent to union");
        }
        Ok(document)
    }

    /// The status is checked and written under one repository lock, so two decisions on the
    /// same document cannot both apply.
    fn decide(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
        decision: SignatureDecision,
        reason: Option<String>,
    ) -> Result<DocumentRecord, MembershipServiceError> {
        let document = self.fetch_document(document_id)?;
        let application = self.fetch_application(&document.application_id)?;
        if !application.is_owned_by(&actor.user_id) {
            return Err(MembershipServiceError::Forbidden(
                "only the applicant can sign or reject this document",
            ));
        }

        let mut outcome = TransitionOutcome::Unchanged;
        let document = self.update_document(document_id, |document| {
            outcome = apply_decision(document.status, decision)?;
            if outcome == TransitionOutcome::Unchanged {
                return Ok(());
            }
            document.status = decision.target();
            match decision {
                SignatureDecision::Sign => document.signed_at = Some(Utc::now()),
                SignatureDecision::Reject => {
                    document.rejection_reason = reason
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty());
                }
            }
            Ok(())
        })?;
        if outcome == TransitionOutcome::Applied {
            info!(
                document_id = %document.id.0,
                status = document.status.label(),
                "document decision recorded"
            );
        }
        Ok(document)
    }

    fn update_document<F>(
        &self,
        id: &DocumentId,
        edit: F,
    ) -> Result<DocumentRecord, MembershipServiceError>
    where
        F: FnOnce(&mut DocumentRecord) -> Result<(), MembershipServiceError>,
    {
        self.applications
            .update_document(id, edit)
            .map_err(|err| match err {
                MembershipServiceError::Repository(RepositoryError::NotFound) => {
                    MembershipServiceError::NotFound("document")
                }
                other => other,
            })
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, MembershipServiceError> {
        self.applications
            .fetch(id)?
            .ok_or(MembershipServiceError::NotFound("application"))
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<DocumentRecord, MembershipServiceError> {
        self.applications
            .fetch_document(id)?
            .ok_or(MembershipServiceError::NotFound("document"))
    }

    fn may_view(
        &self,
        actor: &Actor,
        application: &ApplicationRecord,
    ) -> Result<bool, MembershipServiceError> {
        self.may_act(actor, application, Capability::ReviewApplications)
    }

    /// The applicant, or a holder of `capability` presiding over the application's organization.
    fn may_act(
        &self,
        actor: &Actor,
        application: &ApplicationRecord,
        capability: Capability,
    ) -> Result<bool, MembershipServiceError> {
        if application.is_owned_by(&actor.user_id) {
            return Ok(true);
        }
        if !actor.can(capability) {
            return Ok(false);
        }
        Ok(has_authority(
            self.organizations.as_ref(),
            actor,
            &application.organization_id,
        )?)
    }

    /// Notification failures are logged and never undo the state change.
    fn notify(&self, notification: MemberNotification) {
        let application_id = notification.application_id.0.clone();
        if let Err(err) = self.notifier.notify(notification) {
            warn!(%application_id, error = %err, "member notification failed");
        }
    }
}
