use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, DocumentId, DocumentRecord,
};
use crate::workflows::access::UserId;
use crate::workflows::organizations::OrganizationId;
use crate::workflows::storage::RepositoryError;

/// Narrowing applied when listing applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub organization_id: Option<OrganizationId>,
    pub status: Option<ApplicationStatus>,
    pub user_id: Option<UserId>,
}

impl ApplicationFilter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        self.organization_id
            .as_ref()
            .map_or(true, |id| &record.organization_id == id)
            && self.status.map_or(true, |status| record.status == status)
            && self
                .user_id
                .as_ref()
                .map_or(true, |user_id| record.is_owned_by(user_id))
    }
}

/// Storage abstraction for applications and their generated documents.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError>;

    /// Swap the whole package of an application in one call and return the records it
    /// replaced. Fails with `RepositoryError::Conflict` and leaves the package untouched when
    /// any current document is already signed or rejected.
    fn replace_documents(
        &self,
        application_id: &ApplicationId,
        documents: Vec<DocumentRecord>,
    ) -> Result<Vec<DocumentRecord>, RepositoryError>;
    fn documents(&self, application_id: &ApplicationId)
        -> Result<Vec<DocumentRecord>, RepositoryError>;
    fn fetch_document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>, RepositoryError>;

    /// Runs `edit` on the stored document while it is locked and returns the row as stored
    /// afterwards. A missing document fails with `RepositoryError::NotFound`.
    fn update_document<E, F>(&self, id: &DocumentId, edit: F) -> Result<DocumentRecord, E>
    where
        Self: Sized,
        E: From<RepositoryError>,
        F: FnOnce(&mut DocumentRecord) -> Result<(), E>;
}

/// Outbound member notifications (e-mail adapters and test doubles).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: MemberNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    ApplicationReceived,
    ApplicationApproved,
    ApplicationRejected,
}

/// Message payload handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberNotification {
    pub template: NotificationTemplate,
    pub application_id: ApplicationId,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("recipient '{0}' rejected")]
    Recipient(String),
}
