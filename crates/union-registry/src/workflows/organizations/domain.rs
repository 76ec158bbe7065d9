use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::access::UserId;
use crate::workflows::signing::DocumentStatus;

/// Identifier wrapper for organizations in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Tier of the union hierarchy, from the federal body down to primary cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationLevel {
    Federal,
    Regional,
    Local,
    Primary,
}

impl OrganizationLevel {
    /// Zero for the federal body, increasing towards primary organizations.
    pub const fn depth(self) -> u8 {
        match self {
            OrganizationLevel::Federal => 0,
            OrganizationLevel::Regional => 1,
            OrganizationLevel::Local => 2,
            OrganizationLevel::Primary => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            OrganizationLevel::Federal => "federal",
            OrganizationLevel::Regional => "regional",
            OrganizationLevel::Local => "local",
            OrganizationLevel::Primary => "primary",
        }
    }

    pub const fn can_parent(self, child: OrganizationLevel) -> bool {
        self.depth() < child.depth()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub level: OrganizationLevel,
    pub parent_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering a new organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub level: OrganizationLevel,
    #[serde(default)]
    pub parent_id: Option<OrganizationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationalDocumentId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationalDocumentKind {
    Agenda,
    Protocol,
    Decision,
    Other,
}

/// One signer attached to an organizational document. Participants decide independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub status: DocumentStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Participant {
    pub fn pending(user_id: UserId) -> Self {
        Self {
            user_id,
            status: DocumentStatus::NotSigned,
            signed_at: None,
            rejection_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalDocument {
    pub id: OrganizationalDocumentId,
    pub organization_id: OrganizationId,
    pub kind: OrganizationalDocumentKind,
    pub title: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
}

impl OrganizationalDocument {
    pub fn participant_mut(&mut self, user_id: &UserId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|participant| &participant.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.participants
            .iter()
            .any(|participant| &participant.user_id == user_id)
    }

    pub fn summary(&self) -> SignatureSummary {
        let mut summary = SignatureSummary {
            signed: 0,
            rejected: 0,
            pending: 0,
            status: AggregateStatus::AwaitingSignatures,
        };
        for participant in &self.participants {
            match participant.status {
                DocumentStatus::Signed => summary.signed += 1,
                DocumentStatus::Rejected => summary.rejected += 1,
                DocumentStatus::NotSigned => summary.pending += 1,
            }
        }
        summary.status = if summary.rejected > 0 {
            AggregateStatus::HasRejections
        } else if summary.pending == 0 && summary.signed > 0 {
            AggregateStatus::FullySigned
        } else {
            AggregateStatus::AwaitingSignatures
        };
        summary
    }
}

/// Informational roll-up of participant decisions. No quorum rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateStatus {
    AwaitingSignatures,
    FullySigned,
    HasRejections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSummary {
    pub signed: usize,
    pub rejected: usize,
    pub pending: usize,
    pub status: AggregateStatus,
}

/// Payload for creating an organizational document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganizationalDocument {
    pub organization_id: OrganizationId,
    pub kind: OrganizationalDocumentKind,
    pub title: String,
    pub participants: Vec<UserId>,
}

/// API representation with the aggregate attached.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationalDocumentView {
    #[serde(flatten)]
    pub document: OrganizationalDocument,
    pub summary: SignatureSummary,
}

impl From<OrganizationalDocument> for OrganizationalDocumentView {
    fn from(document: OrganizationalDocument) -> Self {
        let summary = document.summary();
        Self { document, summary }
    }
}
