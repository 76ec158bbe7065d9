//! Signature state shared by application documents and organizational-document participants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    NotSigned,
    Signed,
    Rejected,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::NotSigned => "NOT_SIGNED",
            DocumentStatus::Signed => "SIGNED",
            DocumentStatus::Rejected => "REJECTED",
        }
    }

    pub const fn is_decided(self) -> bool {
        !matches!(self, DocumentStatus::NotSigned)
    }
}

/// What a signer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureDecision {
    Sign,
    Reject,
}

impl SignatureDecision {
    pub const fn target(self) -> DocumentStatus {
        match self {
            SignatureDecision::Sign => DocumentStatus::Signed,
            SignatureDecision::Reject => DocumentStatus::Rejected,
        }
    }
}

/// Whether a transition changed the stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("document is already {} and cannot become {}", .current.label(), .requested.label())]
    AlreadyDecided {
        current: DocumentStatus,
        requested: DocumentStatus,
    },
    #[error("only signed documents can be sent to the union (current status {})", .0.label())]
    NotSigned(DocumentStatus),
}

/// NOT_SIGNED moves to the requested terminal state; repeating that state is a no-op.
pub fn apply_decision(
    current: DocumentStatus,
    decision: SignatureDecision,
) -> Result<TransitionOutcome, SigningError> {
    let requested = decision.target();
    match current {
        DocumentStatus::NotSigned => Ok(TransitionOutcome::Applied),
        status if status == requested => Ok(TransitionOutcome::Unchanged),
        status => Err(SigningError::AlreadyDecided {
            current: status,
            requested,
        }),
    }
}
