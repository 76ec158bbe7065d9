use chrono::{DateTime, Months, NaiveDate, Utc};

use super::domain::{ApplicationSubmission, MembershipApplicant};
use crate::workflows::access::UserId;
use crate::workflows::organizations::OrganizationId;

/// Youngest age at which a worker may join.
pub const MINIMUM_MEMBER_AGE: u32 = 14;

/// Validation errors raised while accepting a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("field '{0}' is required")]
    MissingField(&'static str),
    #[error("field '{field}' has an unrecognized date '{value}' (expected DD.MM.YYYY, YYYY-MM-DD or an RFC 3339 timestamp)")]
    MalformedDate { field: &'static str, value: String },
    #[error("birth date {0} lies in the future")]
    BirthDateInFuture(NaiveDate),
    #[error("applicant born {0} is younger than {}", MINIMUM_MEMBER_AGE)]
    BelowMinimumAge(NaiveDate),
    #[error("hire date {0} lies in the future")]
    HireDateInFuture(NaiveDate),
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
    #[error("organization {0} does not exist")]
    UnknownOrganization(String),
}

/// A submission that passed validation, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSubmission {
    pub organization_id: OrganizationId,
    pub user_id: Option<UserId>,
    pub applicant: MembershipApplicant,
}

/// Parse the date shapes the registration forms send: `DD.MM.YYYY`, `YYYY-MM-DD`,
/// or a full RFC 3339 timestamp whose calendar date is kept.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(value, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|timestamp| timestamp.date_naive())
        })
}

fn required(value: &str, field: &'static str) -> Result<String, IntakeViolation> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(IntakeViolation::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|inner| inner.trim().to_string())
        .filter(|inner| !inner.is_empty())
}

fn date_field(value: &str, field: &'static str) -> Result<NaiveDate, IntakeViolation> {
    parse_flexible_date(value).ok_or_else(|| IntakeViolation::MalformedDate {
        field,
        value: value.to_string(),
    })
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Guard responsible for turning raw submissions into `AcceptedSubmission`s.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard {
    today: Option<NaiveDate>,
}

impl IntakeGuard {
    /// Pin the reference date used for the age and future-date checks.
    pub fn as_of(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn accept(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<AcceptedSubmission, IntakeViolation> {
        let organization_id = required(&submission.organization_id, "organization_id")?;
        let last_name = required(&submission.last_name, "last_name")?;
        let first_name = required(&submission.first_name, "first_name")?;
        let raw_birth_date = required(&submission.birth_date, "birth_date")?;
        let phone = required(&submission.phone, "phone")?;
        let email = required(&submission.email, "email")?;

        if !looks_like_email(&email) {
            return Err(IntakeViolation::InvalidEmail(email));
        }

        let today = self.today();
        let birth_date = date_field(&raw_birth_date, "birth_date")?;
        if birth_date > today {
            return Err(IntakeViolation::BirthDateInFuture(birth_date));
        }
        let youngest = today.checked_sub_months(Months::new(MINIMUM_MEMBER_AGE * 12));
        if youngest.is_some_and(|youngest| birth_date > youngest) {
            return Err(IntakeViolation::BelowMinimumAge(birth_date));
        }

        let hire_date = optional(submission.hire_date)
            .map(|raw| date_field(&raw, "hire_date"))
            .transpose()?;
        if let Some(hired) = hire_date.filter(|hired| *hired > today) {
            return Err(IntakeViolation::HireDateInFuture(hired));
        }

        Ok(AcceptedSubmission {
            organization_id: OrganizationId(organization_id),
            user_id: optional(submission.user_id).map(UserId),
            applicant: MembershipApplicant {
                last_name,
                first_name,
                middle_name: optional(submission.middle_name),
                birth_date,
                phone,
                email: email.to_ascii_lowercase(),
                address: optional(submission.address),
                workplace: optional(submission.workplace),
                position: optional(submission.position),
                hire_date,
            },
        })
    }
}
