//! Membership intake: applications, review decisions, and the signed document package.

pub mod documents;
pub mod domain;
pub mod intake;
mod notifications;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission, ApplicationView,
    DocumentId, DocumentKind, DocumentRecord, MembershipApplicant,
};
pub use intake::{parse_flexible_date, IntakeGuard, IntakeViolation};
pub use repository::{
    ApplicationFilter, ApplicationRepository, MemberNotification, NotificationError,
    NotificationTemplate, Notifier,
};
pub use review::{ReviewError, ReviewRequest};
pub use router::membership_router;
pub use service::{MembershipService, MembershipServiceError};
