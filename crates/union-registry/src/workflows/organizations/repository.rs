use super::domain::{
    Organization, OrganizationId, OrganizationalDocument, OrganizationalDocumentId, Participant,
};
use crate::workflows::access::UserId;
use crate::workflows::storage::RepositoryError;

/// Storage abstraction for the organization hierarchy and its multi-signer documents.
pub trait OrganizationRepository: Send + Sync {
    fn insert(&self, organization: Organization) -> Result<Organization, RepositoryError>;
    fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, RepositoryError>;
    fn children(&self, id: &OrganizationId) -> Result<Vec<Organization>, RepositoryError>;

    fn insert_document(
        &self,
        document: OrganizationalDocument,
    ) -> Result<OrganizationalDocument, RepositoryError>;
    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<Option<OrganizationalDocument>, RepositoryError>;

    /// Runs `edit` against one participant while the document is locked and returns the
    /// document as stored afterwards. `edit` sees `None` when `user_id` is not a participant.
    /// A missing document fails with `RepositoryError::NotFound` before `edit` runs.
    fn update_participant<E, F>(
        &self,
        id: &OrganizationalDocumentId,
        user_id: &UserId,
        edit: F,
    ) -> Result<OrganizationalDocument, E>
    where
        Self: Sized,
        E: From<RepositoryError>,
        F: FnOnce(Option<&mut Participant>) -> Result<(), E>;
}
