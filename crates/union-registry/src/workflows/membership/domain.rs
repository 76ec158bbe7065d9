use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::access::UserId;
use crate::workflows::organizations::OrganizationId;
use crate::workflows::signing::DocumentStatus;

/// Identifier wrapper for submitted membership applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Raw intake payload, exactly as the registration form posts it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub organization_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub workplace: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub hire_date: Option<String>,
}

/// Applicant details after validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipApplicant {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub workplace: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

impl MembershipApplicant {
    /// "Last First Middle", skipping an absent middle name.
    pub fn full_name(&self) -> String {
        let mut parts = vec![self.last_name.as_str(), self.first_name.as_str()];
        if let Some(middle) = self.middle_name.as_deref() {
            parts.push(middle);
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(ApplicationStatus::Pending),
            "APPROVED" => Some(ApplicationStatus::Approved),
            "REJECTED" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// The three documents generated for every application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    MembershipApplication,
    PersonalDataConsent,
    PaymentDeduction,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::MembershipApplication,
        DocumentKind::PersonalDataConsent,
        DocumentKind::PaymentDeduction,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            DocumentKind::MembershipApplication => "membership-application",
            DocumentKind::PersonalDataConsent => "personal-data-consent",
            DocumentKind::PaymentDeduction => "payment-deduction",
        }
    }
}

/// One generated document belonging to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub file_url: String,
    #[serde(skip_serializing, default)]
    pub file_path: String,
    pub sent_to_union: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Repository record for a membership application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub organization_id: OrganizationId,
    pub user_id: Option<UserId>,
    pub applicant: MembershipApplicant,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
}

impl ApplicationRecord {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }
}

/// Application together with its generated documents, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: ApplicationRecord,
    pub documents: Vec<DocumentRecord>,
}
