use crate::infra::{InMemoryApplicationRepository, InMemoryOrganizationRepository, LoggingNotifier};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use union_registry::error::AppError;
use union_registry::workflows::access::{Actor, Role, UserId};
use union_registry::workflows::membership::documents::{
    DocumentPackager, FileSystemStore, HtmlRenderer,
};
use union_registry::workflows::membership::{
    ApplicationStatus, ApplicationSubmission, MembershipService, ReviewRequest,
};
use union_registry::workflows::organizations::{
    NewOrganization, NewOrganizationalDocument, Organization, OrganizationLevel,
    OrganizationService, OrganizationalDocumentKind, OrganizationalDocumentView,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory for the generated document package. Defaults to a folder in the system temp dir.
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
}

type DemoMembership =
    MembershipService<InMemoryApplicationRepository, InMemoryOrganizationRepository, LoggingNotifier>;

struct Hierarchy {
    federal: Organization,
    regional: Organization,
    local: Organization,
    primary: Organization,
}

fn chairman(user_id: &str, role: Role, organization: &Organization) -> Actor {
    Actor::new(user_id, role, Some(organization.id.0.as_str()))
}

fn register_hierarchy(
    service: &OrganizationService<InMemoryOrganizationRepository>,
    admin: &Actor,
) -> Result<Hierarchy, AppError> {
    let federal = service.create_organization(
        admin,
        NewOrganization {
            name: "Federation of Transport Workers".to_string(),
            level: OrganizationLevel::Federal,
            parent_id: None,
        },
    )?;
    let regional = service.create_organization(
        admin,
        NewOrganization {
            name: "Northern Regional Committee".to_string(),
            level: OrganizationLevel::Regional,
            parent_id: Some(federal.id.clone()),
        },
    )?;
    let local = service.create_organization(
        &chairman("user-regional-chair", Role::RegionalChairman, &regional),
        NewOrganization {
            name: "North City Committee".to_string(),
            level: OrganizationLevel::Local,
            parent_id: Some(regional.id.clone()),
        },
    )?;
    let primary = service.create_organization(
        &chairman("user-local-chair", Role::LocalChairman, &local),
        NewOrganization {
            name: "Bus Depot No. 1".to_string(),
            level: OrganizationLevel::Primary,
            parent_id: Some(local.id.clone()),
        },
    )?;

    Ok(Hierarchy {
        federal,
        regional,
        local,
        primary,
    })
}

fn render_hierarchy(hierarchy: &Hierarchy) {
    println!("\nOrganization hierarchy");
    for (depth, organization) in [
        &hierarchy.federal,
        &hierarchy.regional,
        &hierarchy.local,
        &hierarchy.primary,
    ]
    .into_iter()
    .enumerate()
    {
        println!(
            "{}- [{}] {} ({})",
            "  ".repeat(depth),
            organization.level.label(),
            organization.name,
            organization.id.0
        );
    }
}

fn run_membership(
    service: &DemoMembership,
    hierarchy: &Hierarchy,
    applicant: &Actor,
) -> Result<(), AppError> {
    let record = service.submit(ApplicationSubmission {
        organization_id: hierarchy.primary.id.0.clone(),
        user_id: Some(applicant.user_id.0.clone()),
        last_name: "Petrov".to_string(),
        first_name: "Ivan".to_string(),
        middle_name: Some("Sergeevich".to_string()),
        birth_date: "15.06.1990".to_string(),
        phone: "+7 900 123 45 67".to_string(),
        email: "I.Petrov@Example.org".to_string(),
        address: Some("12 Depot Street, North City".to_string()),
        workplace: Some("Bus Depot No. 1".to_string()),
        position: Some("Driver".to_string()),
        hire_date: Some("2015-09-01".to_string()),
    })?;
    println!("\nMembership application");
    println!(
        "- {} submitted by {} (born {})",
        record.id.0,
        record.applicant.full_name(),
        record.applicant.birth_date
    );

    let reviewer = chairman("user-depot-chair", Role::PrimaryChairman, &hierarchy.primary);
    let reviewed = service.review(
        &reviewer,
        &record.id,
        ReviewRequest {
            status: ApplicationStatus::Approved,
            reason: None,
        },
    )?;
    println!("- reviewed by {}: {}", reviewer.user_id.0, reviewed.status.label());

    let documents = service.generate_documents(&reviewer, &record.id)?;
    println!("\nDocument package");
    for document in &documents {
        let signed = service.sign_document(applicant, &document.id)?;
        let sent = service.send_to_union(&reviewer, &signed.id)?;
        println!(
            "- {:?}: {} -> {} (sent to union: {})",
            sent.kind,
            sent.file_url,
            sent.status.label(),
            sent.sent_to_union
        );
    }
    Ok(())
}

fn run_protocol(
    service: &OrganizationService<InMemoryOrganizationRepository>,
    hierarchy: &Hierarchy,
) -> Result<OrganizationalDocumentView, AppError> {
    let participants = ["user-delegate-a", "user-delegate-b", "user-delegate-c"];
    let created = service.create_document(
        &chairman("user-local-chair", Role::LocalChairman, &hierarchy.local),
        NewOrganizationalDocument {
            organization_id: hierarchy.local.id.clone(),
            kind: OrganizationalDocumentKind::Protocol,
            title: "Protocol of the spring conference".to_string(),
            participants: participants
                .iter()
                .map(|id| UserId((*id).to_string()))
                .collect(),
        },
    )?;

    let id = created.document.id;
    service.sign_document(&Actor::new(participants[0], Role::Member, None), &id)?;
    service.sign_document(&Actor::new(participants[1], Role::Member, None), &id)?;
    let view = service.reject_document(
        &Actor::new(participants[2], Role::Member, None),
        &id,
        Some("quorum count is wrong".to_string()),
    )?;
    Ok(view)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| std::env::temp_dir().join("union-registry-demo"));
    std::fs::create_dir_all(&output_dir)?;

    let organizations = Arc::new(InMemoryOrganizationRepository::default());
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let notifier = Arc::new(LoggingNotifier::new("noreply@union.local"));
    let packager = DocumentPackager::new(
        Box::new(HtmlRenderer),
        Box::new(FileSystemStore::new(
            output_dir.clone(),
            format!("file://{}", output_dir.display()),
        )),
    );
    let organization_service = OrganizationService::new(organizations.clone());
    let membership_service =
        MembershipService::new(applications, organizations, notifier.clone(), packager);

    println!("Union registry demo");
    let admin = Actor::new("user-root", Role::SuperAdmin, None);
    let hierarchy = register_hierarchy(&organization_service, &admin)?;
    render_hierarchy(&hierarchy);

    let applicant = Actor::new("user-petrov", Role::Member, None);
    run_membership(&membership_service, &hierarchy, &applicant)?;

    let protocol = run_protocol(&organization_service, &hierarchy)?;
    println!("\nOrganizational document");
    println!(
        "- {}: signed {}, rejected {}, pending {} => {:?}",
        protocol.document.title,
        protocol.summary.signed,
        protocol.summary.rejected,
        protocol.summary.pending,
        protocol.summary.status
    );

    println!("\nNotifications");
    for message in notifier.delivered() {
        println!("- to {}: {}", message.recipient, message.subject());
    }
    println!("\nFiles written to {}", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use union_registry::workflows::organizations::AggregateStatus;

    #[test]
    fn demo_writes_the_document_package() {
        let dir = tempfile::tempdir().expect("tempdir");
        run_demo(DemoArgs {
            output_dir: Some(dir.path().to_path_buf()),
        })
        .expect("demo completes");

        let files = std::fs::read_dir(dir.path()).expect("output dir").count();
        assert_eq!(files, 3);
    }

    #[test]
    fn protocol_reports_the_rejection() {
        let organizations = Arc::new(InMemoryOrganizationRepository::default());
        let service = OrganizationService::new(organizations);
        let hierarchy = register_hierarchy(
            &service,
            &Actor::new("user-root", Role::SuperAdmin, None),
        )
        .expect("hierarchy");

        let view = run_protocol(&service, &hierarchy).expect("protocol");
        assert_eq!(view.summary.status, AggregateStatus::HasRejections);
        assert_eq!((view.summary.signed, view.summary.pending), (2, 0));
    }
}
