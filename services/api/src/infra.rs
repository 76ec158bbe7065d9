use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use union_registry::workflows::membership::{
    ApplicationFilter, ApplicationId, ApplicationRecord, ApplicationRepository, DocumentId,
    DocumentRecord, MemberNotification, NotificationError, Notifier,
};
use union_registry::workflows::access::UserId;
use union_registry::workflows::organizations::{
    Organization, OrganizationId, OrganizationRepository, OrganizationalDocument,
    OrganizationalDocumentId, Participant,
};
use union_registry::workflows::storage::RepositoryError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) documents_dir: Arc<PathBuf>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
    documents: Arc<Mutex<Vec<DocumentRecord>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
        Ok(records)
    }

    fn replace_documents(
        &self,
        application_id: &ApplicationId,
        documents: Vec<DocumentRecord>,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        let mut guard = lock(&self.documents)?;
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
        Ok(lock(&self.documents)?
            .iter()
            .filter(|document| &document.application_id == application_id)
            .cloned()
            .collect())
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>, RepositoryError> {
        Ok(lock(&self.documents)?
            .iter()
            .find(|document| &document.id == id)
            .cloned())
    }

    fn update_document<E, F>(&self, id: &DocumentId, edit: F) -> Result<DocumentRecord, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut DocumentRecord) -> Result<(), E>,
    {
        let mut guard = lock(&self.documents)?;
        let document = guard
            .iter_mut()
            .find(|document| &document.id == id)
            .ok_or(RepositoryError::NotFound)?;
        edit(document)?;
        Ok(document.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOrganizationRepository {
    organizations: Arc<Mutex<HashMap<OrganizationId, Organization>>>,
    documents: Arc<Mutex<HashMap<OrganizationalDocumentId, OrganizationalDocument>>>,
}

impl OrganizationRepository for InMemoryOrganizationRepository {
    fn insert(&self, organization: Organization) -> Result<Organization, RepositoryError> {
        let mut guard = lock(&self.organizations)?;
        if guard.contains_key(&organization.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        Ok(lock(&self.organizations)?.get(id).cloned())
    }

    fn children(&self, id: &OrganizationId) -> Result<Vec<Organization>, RepositoryError> {
        let guard = lock(&self.organizations)?;
        let mut children: Vec<_> = guard
            .values()
            .filter(|organization| organization.parent_id.as_ref() == Some(id))
            .cloned()
            .collect();
        children.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(children)
    }

    fn insert_document(
        &self,
        document: OrganizationalDocument,
    ) -> Result<OrganizationalDocument, RepositoryError> {
        let mut guard = lock(&self.documents)?;
        if guard.contains_key(&document.id) {
            return Err(RepositoryError::Conflict);
        }
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
        let mut guard = lock(&self.documents)?;
        let document = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        edit(document.participant_mut(user_id))?;
        Ok(document.clone())
    }

    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<Option<OrganizationalDocument>, RepositoryError> {
        Ok(lock(&self.documents)?.get(id).cloned())
    }
}

/// Stands in for the mail transport: every message is written to the log.
#[derive(Debug, Clone)]
pub(crate) struct LoggingNotifier {
    sender: String,
    delivered: Arc<Mutex<Vec<MemberNotification>>>,
}

impl LoggingNotifier {
    pub(crate) fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            delivered: Arc::default(),
        }
    }

    pub(crate) fn delivered(&self) -> Vec<MemberNotification> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Notifier for LoggingNotifier {
    fn notify(&self, notification: MemberNotification) -> Result<(), NotificationError> {
        if !notification.recipient.contains('@') {
            return Err(NotificationError::Recipient(notification.recipient));
        }

        info!(
            from = %self.sender,
            to = %notification.recipient,
            subject = %notification.subject(),
            body = %notification.body(),
            "member notification dispatched"
        );
        self.delivered
            .lock()
            .map_err(|_| NotificationError::Transport("outbox poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}
