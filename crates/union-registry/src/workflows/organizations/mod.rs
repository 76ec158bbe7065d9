//! The federal → regional → local → primary hierarchy and its multi-signer documents.

pub mod domain;
pub mod hierarchy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AggregateStatus, NewOrganization, NewOrganizationalDocument, Organization, OrganizationId,
    OrganizationLevel, OrganizationalDocument, OrganizationalDocumentId,
    OrganizationalDocumentKind, OrganizationalDocumentView, Participant, SignatureSummary,
};
pub use repository::OrganizationRepository;
pub use router::organization_router;
pub use service::{OrganizationService, OrganizationServiceError, OrganizationViolation};
