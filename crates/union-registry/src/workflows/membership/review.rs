use serde::{Deserialize, Serialize};

use super::domain::ApplicationStatus;

/// Reviewer decision payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("applications can only be moved to APPROVED or REJECTED")]
    InvalidTarget,
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("application is already {} and cannot become {}", .current.label(), .requested.label())]
    AlreadyDecided {
        current: ApplicationStatus,
        requested: ApplicationStatus,
    },
}

impl ReviewError {
    /// Conflicts are state clashes; the other variants are malformed requests.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReviewError::AlreadyDecided { .. })
    }
}

/// A validated transition ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewTransition {
    Apply {
        status: ApplicationStatus,
        reason: Option<String>,
    },
    Unchanged,
}

/// PENDING moves to APPROVED or REJECTED once; repeating the same decision is a no-op.
pub fn plan_review(
    current: ApplicationStatus,
    request: ReviewRequest,
) -> Result<ReviewTransition, ReviewError> {
    let reason = request
        .reason
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    match request.status {
        ApplicationStatus::Pending => return Err(ReviewError::InvalidTarget),
        ApplicationStatus::Rejected if reason.is_none() => return Err(ReviewError::MissingReason),
        _ => {}
    }

    match current {
        ApplicationStatus::Pending => Ok(ReviewTransition::Apply {
            status: request.status,
            reason: match request.status {
                ApplicationStatus::Rejected => reason,
                _ => None,
            },
        }),
        decided if decided == request.status => Ok(ReviewTransition::Unchanged),
        decided => Err(ReviewError::AlreadyDecided {
            current: decided,
            requested: request.status,
        }),
    }
}
