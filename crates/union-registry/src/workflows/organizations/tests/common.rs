use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex};

use crate::workflows::access::{Actor, Role, UserId};
use crate::workflows::organizations::{
    NewOrganization, NewOrganizationalDocument, Organization, OrganizationId, OrganizationLevel,
    OrganizationRepository, OrganizationService, OrganizationalDocument,
    OrganizationalDocumentId, OrganizationalDocumentKind, Participant,
};
use crate::workflows::storage::RepositoryError;

#[derive(Default)]
pub(super) struct MemoryOrganizations {
    organizations: Mutex<HashMap<OrganizationId, Organization>>,
    documents: Mutex<HashMap<OrganizationalDocumentId, OrganizationalDocument>>,
}

impl OrganizationRepository for MemoryOrganizations {
    fn insert(&self, organization: Organization) -> Result<Organization, RepositoryError> {
        let mut guard = self.organizations.lock().expect("organizations mutex poisoned");
        if guard.contains_key(&organization.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        let guard = self.organizations.lock().expect("organizations mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn children(&self, id: &OrganizationId) -> Result<Vec<Organization>, RepositoryError> {
        let guard = self.organizations.lock().expect("organizations mutex poisoned");
        let mut children: Vec<_> = guard
            .values()
            .filter(|organization| organization.parent_id.as_ref() == Some(id))
            .cloned()
            .collect();
        children.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(children)
    }

    fn insert_document(
        &self,
        document: OrganizationalDocument,
    ) -> Result<OrganizationalDocument, RepositoryError> {
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        guard.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn update_participant<E, F>(
        &self,
        id: &OrganizationalDocumentId,
        user_id: &UserId,
        edit: F,
    ) -> Result<OrganizationalDocument, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(Option<&mut Participant>) -> Result<(), E>,
    {
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        let document = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        edit(document.participant_mut(user_id))?;
        Ok(document.clone())
    }

    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<Option<OrganizationalDocument>, RepositoryError> {
        let guard = self.documents.lock().expect("documents mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Delegates to a shared store, holding participant updates until `arrivals` callers are
/// all in flight at once.
pub(super) struct LockstepOrganizations {
    pub(super) inner: Arc<MemoryOrganizations>,
    pub(super) arrivals: Barrier,
}

impl OrganizationRepository for LockstepOrganizations {
    fn insert(&self, organization: Organization) -> Result<Organization, RepositoryError> {
        self.inner.insert(organization)
    }

    fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn children(&self, id: &OrganizationId) -> Result<Vec<Organization>, RepositoryError> {
        self.inner.children(id)
    }

    fn insert_document(
        &self,
        document: OrganizationalDocument,
    ) -> Result<OrganizationalDocument, RepositoryError> {
        self.inner.insert_document(document)
    }

    fn fetch_document(
        &self,
        id: &OrganizationalDocumentId,
    ) -> Result<Option<OrganizationalDocument>, RepositoryError> {
        self.inner.fetch_document(id)
    }

    fn update_participant<E, F>(
        &self,
        id: &OrganizationalDocumentId,
        user_id: &UserId,
        edit: F,
    ) -> Result<OrganizationalDocument, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(Option<&mut Participant>) -> Result<(), E>,
    {
        self.arrivals.wait();
        self.inner.update_participant(id, user_id, edit)
    }
}

pub(super) fn super_admin() -> Actor {
    Actor::new("user-root", Role::SuperAdmin, None)
}

pub(super) fn member(user_id: &str) -> Actor {
    Actor::new(user_id, Role::Member, None)
}

/// A registered federal → regional → local → primary chain.
pub(super) struct Chain {
    pub(super) federal: Organization,
    pub(super) regional: Organization,
    pub(super) local: Organization,
    pub(super) primary: Organization,
}

pub(super) fn service() -> OrganizationService<MemoryOrganizations> {
    OrganizationService::new(Arc::new(MemoryOrganizations::default()))
}

fn register(
    service: &OrganizationService<MemoryOrganizations>,
    actor: &Actor,
    name: &str,
    level: OrganizationLevel,
    parent: Option<&Organization>,
) -> Organization {
    service
        .create_organization(
            actor,
            NewOrganization {
                name: name.to_string(),
                level,
                parent_id: parent.map(|organization| organization.id.clone()),
            },
        )
        .expect("organization registered")
}

pub(super) fn chain(service: &OrganizationService<MemoryOrganizations>) -> Chain {
    let admin = super_admin();
    let federal = register(
        service,
        &admin,
        "Federation of Transport Workers",
        OrganizationLevel::Federal,
        None,
    );
    let regional = register(
        service,
        &admin,
        "Northern Region",
        OrganizationLevel::Regional,
        Some(&federal),
    );
    let local = register(
        service,
        &admin,
        "North City",
        OrganizationLevel::Local,
        Some(&regional),
    );
    let primary = register(
        service,
        &admin,
        "Tram Depot No. 4",
        OrganizationLevel::Primary,
        Some(&local),
    );
    Chain {
        federal,
        regional,
        local,
        primary,
    }
}

pub(super) fn chairman(role: Role, organization: &Organization) -> Actor {
    Actor::new(
        format!("user-{}", organization.id.0),
        role,
        Some(organization.id.0.as_str()),
    )
}

pub(super) fn protocol(
    organization: &Organization,
    participants: &[&str],
) -> NewOrganizationalDocument {
    NewOrganizationalDocument {
        organization_id: organization.id.clone(),
        kind: OrganizationalDocumentKind::Protocol,
        title: "Protocol of the depot committee meeting".to_string(),
        participants: participants
            .iter()
            .map(|user_id| UserId(user_id.to_string()))
            .collect(),
    }
}
