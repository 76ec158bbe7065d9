use crate::workflows::membership::review::{plan_review, ReviewTransition};
use crate::workflows::membership::{ApplicationStatus, ReviewError, ReviewRequest};

fn request(status: ApplicationStatus, reason: Option<&str>) -> ReviewRequest {
    ReviewRequest {
        status,
        reason: reason.map(str::to_string),
    }
}

#[test]
fn pending_application_can_be_approved() {
    let plan = plan_review(
        ApplicationStatus::Pending,
        request(ApplicationStatus::Approved, Some("welcome aboard")),
    );

    assert_eq!(
        plan,
        Ok(ReviewTransition::Apply {
            status: ApplicationStatus::Approved,
            reason: None,
        })
    );
}

#[test]
fn rejection_keeps_trimmed_reason() {
    let plan = plan_review(
        ApplicationStatus::Pending,
        request(ApplicationStatus::Rejected, Some("  duplicate application ")),
    );

    assert_eq!(
        plan,
        Ok(ReviewTransition::Apply {
            status: ApplicationStatus::Rejected,
            reason: Some("duplicate application".to_string()),
        })
    );
}

#[test]
fn rejection_requires_reason() {
    for reason in [None, Some(""), Some("   ")] {
        assert_eq!(
            plan_review(
                ApplicationStatus::Pending,
                request(ApplicationStatus::Rejected, reason)
            ),
            Err(ReviewError::MissingReason)
        );
    }
}

#[test]
fn pending_is_not_a_review_target() {
    let err = plan_review(
        ApplicationStatus::Pending,
        request(ApplicationStatus::Pending, None),
    )
    .expect_err("pending target refused");
    assert_eq!(err, ReviewError::InvalidTarget);
    assert!(!err.is_conflict());
}

#[test]
fn repeating_a_decision_is_unchanged() {
    assert_eq!(
        plan_review(
            ApplicationStatus::Approved,
            request(ApplicationStatus::Approved, None)
        ),
        Ok(ReviewTransition::Unchanged)
    );
    assert_eq!(
        plan_review(
            ApplicationStatus::Rejected,
            request(ApplicationStatus::Rejected, Some("still missing papers"))
        ),
        Ok(ReviewTransition::Unchanged)
    );
}

#[test]
fn switching_terminal_states_conflicts() {
    let err = plan_review(
        ApplicationStatus::Approved,
        request(ApplicationStatus::Rejected, Some("changed our mind")),
    )
    .expect_err("terminal state is final");

    assert_eq!(
        err,
        ReviewError::AlreadyDecided {
            current: ApplicationStatus::Approved,
            requested: ApplicationStatus::Rejected,
        }
    );
    assert!(err.is_conflict());
}
