use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::domain::ApplicationRecord;
use super::repository::{MemberNotification, NotificationTemplate};

impl MemberNotification {
    pub fn application_received(record: &ApplicationRecord) -> Self {
        Self::for_record(NotificationTemplate::ApplicationReceived, record)
    }

    /// Approval or rejection notice reflecting the record's current status.
    pub fn application_reviewed(record: &ApplicationRecord) -> Self {
        let template = match &record.rejection_reason {
            Some(_) => NotificationTemplate::ApplicationRejected,
            None => NotificationTemplate::ApplicationApproved,
        };
        Self::for_record(template, record)
    }

    fn for_record(template: NotificationTemplate, record: &ApplicationRecord) -> Self {
        let mut details = BTreeMap::new();
        details.insert("full_name".to_string(), record.applicant.full_name());
        details.insert("status".to_string(), record.status.label().to_string());
        details.insert(
            "organization_id".to_string(),
            record.organization_id.0.clone(),
        );
        if let Some(reason) = &record.rejection_reason {
            details.insert("reason".to_string(), reason.clone());
        }

        Self {
            template,
            application_id: record.id.clone(),
            recipient: record.applicant.email.clone(),
            details,
        }
    }

    pub fn subject(&self) -> String {
        match self.template {
            NotificationTemplate::ApplicationReceived => {
                format!("Membership application {} received", self.application_id.0)
            }
            NotificationTemplate::ApplicationApproved => {
                format!("Membership application {} approved", self.application_id.0)
            }
            NotificationTemplate::ApplicationRejected => {
                format!("Membership application {} rejected", self.application_id.0)
            }
        }
    }

    pub fn body(&self) -> String {
        let name = self
            .details
            .get("full_name")
            .map(String::as_str)
            .unwrap_or("member");
        let mut body = format!("Dear {name},\n\n");

        let _ = match self.template {
            NotificationTemplate::ApplicationReceived => writeln!(
                body,
                "your membership application {} has been registered and awaits review.",
                self.application_id.0
            ),
            NotificationTemplate::ApplicationApproved => writeln!(
                body,
                "your membership application {} has been approved. Welcome to the union.",
                self.application_id.0
            ),
            NotificationTemplate::ApplicationRejected => writeln!(
                body,
                "your membership application {} has been rejected.",
                self.application_id.0
            ),
        };
        if let Some(reason) = self.details.get("reason") {
            let _ = writeln!(body, "Reason: {reason}");
        }
        body.push_str("\nThe union membership office\n");
        body
    }
}
