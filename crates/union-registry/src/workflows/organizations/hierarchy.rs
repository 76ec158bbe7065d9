use std::collections::HashSet;

use super::domain::{Organization, OrganizationId};
use super::repository::OrganizationRepository;
use crate::workflows::access::Actor;
use crate::workflows::storage::RepositoryError;

/// Parent chain of `organization`, nearest first. Stops on a dangling parent or a cycle.
pub fn ancestors<O>(
    repository: &O,
    organization: &Organization,
) -> Result<Vec<Organization>, RepositoryError>
where
    O: OrganizationRepository + ?Sized,
{
    let mut chain = Vec::new();
    let mut seen = HashSet::from([organization.id.clone()]);
    let mut next = organization.parent_id.clone();

    while let Some(parent_id) = next {
        if !seen.insert(parent_id.clone()) {
            break;
        }
        match repository.fetch(&parent_id)? {
            Some(parent) => {
                next = parent.parent_id.clone();
                chain.push(parent);
            }
            None => break,
        }
    }

    Ok(chain)
}

/// True when `organization_id` equals `ancestor_id` or sits below it.
pub fn is_within<O>(
    repository: &O,
    ancestor_id: &OrganizationId,
    organization_id: &OrganizationId,
) -> Result<bool, RepositoryError>
where
    O: OrganizationRepository + ?Sized,
{
    if ancestor_id == organization_id {
        return Ok(true);
    }

    let Some(organization) = repository.fetch(organization_id)? else {
        return Ok(false);
    };

    Ok(ancestors(repository, &organization)?
        .iter()
        .any(|ancestor| &ancestor.id == ancestor_id))
}

/// Whether `actor` presides over `organization_id`. Super admins preside everywhere.
/// A chairman's role must match the level of their home organization.
pub fn has_authority<O>(
    repository: &O,
    actor: &Actor,
    organization_id: &OrganizationId,
) -> Result<bool, RepositoryError>
where
    O: OrganizationRepository + ?Sized,
{
    if actor.is_super_admin() {
        return Ok(true);
    }
    let (Some(level), Some(home_id)) = (actor.role.presides_over(), &actor.organization_id) else {
        return Ok(false);
    };
    match repository.fetch(home_id)? {
        Some(home) if home.level == level => is_within(repository, &home.id, organization_id),
        _ => Ok(false),
    }
}
