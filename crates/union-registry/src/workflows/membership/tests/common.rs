use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::access::{Actor, Role, UserId};
use crate::workflows::http::ErrorDisclosure;
use crate::workflows::membership::documents::{
    DocumentPackager, DocumentRenderer, DocumentStore, HtmlRenderer, RenderError,
    RenderedDocument, StoreError, StoredFile,
};
use crate::workflows::membership::domain::{
    ApplicationId, ApplicationRecord, ApplicationSubmission, DocumentId, DocumentRecord,
};
use crate::workflows::membership::repository::{
    ApplicationFilter, ApplicationRepository, MemberNotification, NotificationError, Notifier,
};
use crate::workflows::membership::{
    membership_router, ApplicationStatus, DocumentKind, IntakeGuard, MembershipService,
    ReviewRequest,
};
use crate::workflows::organizations::{
    Organization, OrganizationId, OrganizationLevel, OrganizationRepository,
    OrganizationalDocument, OrganizationalDocumentId, Participant,
};
use crate::workflows::signing::DocumentStatus;
use crate::workflows::storage::RepositoryError;

pub(super) const FEDERAL: &str = "org-federal";
pub(super) const REGIONAL: &str = "org-north";
pub(super) const LOCAL: &str = "org-north-city";
pub(super) const PRIMARY: &str = "org-north-city-depot";
pub(super) const OTHER_REGIONAL: &str = "org-south";
pub(super) const APPLICANT: &str = "user-ivanov";

pub(super) type TestService =
    MembershipService<MemoryApplications, MemoryOrganizations, MemoryNotifier>;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        organization_id: PRIMARY.to_string(),
        user_id: Some(APPLICANT.to_string()),
        last_name: "Ivanov".to_string(),
        first_name: "Pyotr".to_string(),
        middle_name: Some("Sergeevich".to_string()),
        birth_date: "15.06.1990".to_string(),
        phone: "+7 900 123-45-67".to_string(),
        email: "P.Ivanov@Example.org".to_string(),
        address: Some("Lenina 1, apt. 5".to_string()),
        workplace: Some("City tram depot".to_string()),
        position: Some("Driver".to_string()),
        hire_date: Some("2015-09-01".to_string()),
    }
}

pub(super) fn applicant() -> Actor {
    Actor::new(APPLICANT, Role::Member, None)
}

pub(super) fn stranger() -> Actor {
    Actor::new("user-stranger", Role::Member, None)
}

pub(super) fn primary_chairman() -> Actor {
    Actor::new("user-depot-chair", Role::PrimaryChairman, Some(PRIMARY))
}

pub(super) fn regional_chairman() -> Actor {
    Actor::new("user-north-chair", Role::RegionalChairman, Some(REGIONAL))
}

pub(super) fn foreign_chairman() -> Actor {
    Actor::new("user-south-chair", Role::RegionalChairman, Some(OTHER_REGIONAL))
}

pub(super) fn super_admin() -> Actor {
    Actor::new("user-root", Role::SuperAdmin, None)
}

fn organization(id: &str, level: OrganizationLevel, parent: Option<&str>) -> Organization {
    Organization {
        id: OrganizationId(id.to_string()),
        name: format!("{id} union"),
        level,
        parent_id: parent.map(|parent| OrganizationId(parent.to_string())),
        created_at: Utc::now(),
    }
}

/// federal → north → north-city → depot, plus a sibling south region.
pub(super) fn hierarchy() -> MemoryOrganizations {
    let organizations = MemoryOrganizations::default();
    for org in [
        organization(FEDERAL, OrganizationLevel::Federal, None),
        organization(REGIONAL, OrganizationLevel::Regional, Some(FEDERAL)),
        organization(LOCAL, OrganizationLevel::Local, Some(REGIONAL)),
        organization(PRIMARY, OrganizationLevel::Primary, Some(LOCAL)),
        organization(OTHER_REGIONAL, OrganizationLevel::Regional, Some(FEDERAL)),
    ] {
        organizations.insert(org).expect("seed organization");
    }
    organizations
}

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) applications: Arc<MemoryApplications>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) store: MemoryStore,
}

pub(super) fn harness() -> Harness {
    harness_with(
        Box::new(HtmlRenderer),
        MemoryStore::default(),
        MemoryApplications::default(),
        MemoryNotifier::default(),
    )
}

pub(super) fn harness_with(
    renderer: Box<dyn DocumentRenderer>,
    store: MemoryStore,
    applications: MemoryApplications,
    notifier: MemoryNotifier,
) -> Harness {
    let applications = Arc::new(applications);
    let notifier = Arc::new(notifier);
    let packager = DocumentPackager::new(renderer, Box::new(store.clone()));
    let service = MembershipService::new(
        applications.clone(),
        Arc::new(hierarchy()),
        notifier.clone(),
        packager,
    )
    .with_guard(IntakeGuard::as_of(today()));

    Harness {
        service,
        applications,
        notifier,
        store,
    }
}

pub(super) fn router(harness: Harness) -> axum::Router {
    membership_router(Arc::new(harness.service), ErrorDisclosure::Detailed)
}

/// Submitted and approved application with a generated package.
pub(super) fn approved_with_documents(
    harness: &Harness,
) -> (ApplicationRecord, Vec<DocumentRecord>) {
    let record = harness.service.submit(submission()).expect("submitted");
    let record = harness
        .service
        .review(
            &primary_chairman(),
            &record.id,
            ReviewRequest {
                status: ApplicationStatus::Approved,
                reason: None,
            },
        )
        .expect("approved");
    let documents = harness
        .service
        .generate_documents(&primary_chairman(), &record.id)
        .expect("package generated");
    (record, documents)
}

#[derive(Default)]
pub(super) struct MemoryApplications {
    records: Mutex<HashMap<ApplicationId, ApplicationRecord>>,
    documents: Mutex<Vec<DocumentRecord>>,
    fail_document_writes: bool,
    sign_during_replace: bool,
    update_arrivals: Option<Barrier>,
}

impl MemoryApplications {
    pub(super) fn failing_document_writes() -> Self {
        Self {
            fail_document_writes: true,
            ..Self::default()
        }
    }

    /// Marks a stored document signed right before the package is swapped, as if the
    /// applicant signed while new files were being rendered.
    pub(super) fn signing_during_regeneration() -> Self {
        Self {
            sign_during_replace: true,
            ..Self::default()
        }
    }

    /// Holds each document update until `callers` updates are in flight at once.
    pub(super) fn lockstep_document_updates(callers: usize) -> Self {
        Self {
            update_arrivals: Some(Barrier::new(callers)),
            ..Self::default()
        }
    }

    pub(super) fn count(&self) -> usize {
        self.records.lock().expect("records mutex poisoned").len()
    }

    pub(super) fn document_count(&self) -> usize {
        self.documents.lock().expect("documents mutex poisoned").len()
    }
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        match guard.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("records mutex poisoned")
            .get(id)
            .cloned())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(records)
    }

    fn replace_documents(
        &self,
        application_id: &ApplicationId,
        documents: Vec<DocumentRecord>,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        if self.fail_document_writes {
            return Err(RepositoryError::Unavailable("document table locked".to_string()));
        }
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        if self.sign_during_replace {
            if let Some(document) = guard
                .iter_mut()
                .find(|document| &document.application_id == application_id)
            {
                document.status = DocumentStatus::Signed;
                document.signed_at = Some(Utc::now());
            }
        }
        if guard
            .iter()
            .any(|document| {
                &document.application_id == application_id && document.status.is_decided()
            })
        {
            return Err(RepositoryError::Conflict);
        }
        let (superseded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *guard)
            .into_iter()
            .partition(|document| &document.application_id == application_id);
        *guard = kept;
        guard.extend(documents);
        Ok(superseded)
    }

    fn documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        Ok(self
            .documents
            .lock()
            .expect("documents mutex poisoned")
            .iter()
            .filter(|document| &document.application_id == application_id)
            .cloned()
            .collect())
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>, RepositoryError> {
        Ok(self
            .documents
            .lock()
            .expect("documents mutex poisoned")
            .iter()
            .find(|document| &document.id == id)
            .cloned())
    }

    fn update_document<E, F>(&self, id: &DocumentId, edit: F) -> Result<DocumentRecord, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut DocumentRecord) -> Result<(), E>,
    {
        if let Some(arrivals) = &self.update_arrivals {
            arrivals.wait();
        }
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        let document = guard
            .iter_mut()
            .find(|document| &document.id == id)
            .ok_or(RepositoryError::NotFound)?;
        edit(document)?;
        Ok(document.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryOrganizations {
    organizations: Mutex<HashMap<OrganizationId, Organization>>,
    documents: Mutex<HashMap<OrganizationalDocumentId, OrganizationalDocument>>,
}

impl OrganizationRepository for MemoryOrganizations {
    fn insert(&self, organization: Organization) -> Result<Organization, RepositoryError> {
        let mut guard = self.organizations.lock().expect("organizations mutex poisoned");
        if guard.contains_key(&organization.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        Ok(self
            .organizations
            .lock()
            .expect("organizations mutex poisoned")
            .get(id)
            .cloned())
    }

    fn children(&self, id: &OrganizationId) -> Result<Vec<Organization>, RepositoryError> {
        Ok(self
            .organizations
            .lock()
            .expect("organizations mutex poisoned")
            .values()
            .filter(|organization| organization.parent_id.as_ref() == Some(id))
            .cloned()
            .collect())
    }

    fn insert_document(
        &self,
        document: OrganizationalDocument,
    ) -> Result<OrganizationalDocument, RepositoryError> {
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        guard.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn update_participant<E, F>(
        &self,
        id: &OrganizationalDocumentId,
        user_id: &UserId,
        edit: F,
    ) -> Result<OrganizationalDocument, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(Option<&mut Participant>) -> Result<(), E>,
    {
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        let document = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        edit(document.participant_mut(user_id))?;
        Ok(document.clone())
    }

    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<Option<OrganizationalDocument>, RepositoryError> {
        Ok(self
            .documents
            .lock()
            .expect("documents mutex poisoned")
            .get(id)
            .cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<MemberNotification>>,
    offline: bool,
}

impl MemoryNotifier {
    pub(super) fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub(super) fn sent(&self) -> Vec<MemberNotification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: MemberNotification) -> Result<(), NotificationError> {
        if self.offline {
            return Err(NotificationError::Transport(
                "smtp relay refused connection".to_string(),
            ));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Keeps stored bytes in memory and records removals.
#[derive(Debug, Default, Clone)]
pub(super) struct MemoryStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_on: Option<&'static str>,
}

impl MemoryStore {
    pub(super) fn failing_on(fragment: &'static str) -> Self {
        Self {
            fail_on: Some(fragment),
            ..Self::default()
        }
    }

    pub(super) fn file_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .files
            .lock()
            .expect("store mutex poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub(super) fn contents(&self, name: &str) -> Option<String> {
        self.files
            .lock()
            .expect("store mutex poisoned")
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl DocumentStore for MemoryStore {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
        if self.fail_on.is_some_and(|fragment| file_name.contains(fragment)) {
            return Err(StoreError::Write {
                path: file_name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.files
            .lock()
            .expect("store mutex poisoned")
            .insert(file_name.to_string(), bytes.to_vec());
        Ok(StoredFile {
            path: file_name.to_string(),
            url: format!("/documents/{file_name}"),
        })
    }

    fn remove(&self, file: &StoredFile) -> Result<(), StoreError> {
        self.files
            .lock()
            .expect("store mutex poisoned")
            .remove(&file.path);
        Ok(())
    }
}

/// Fails on one document kind so a package aborts half-way.
#[derive(Debug)]
pub(super) struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, document: &RenderedDocument) -> Result<Vec<u8>, RenderError> {
        match document.kind {
            DocumentKind::PaymentDeduction => {
                Err(RenderError::Pdf("font has no glyph for '₽'".to_string()))
            }
            _ => HtmlRenderer.render(document),
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
