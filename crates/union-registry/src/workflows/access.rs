//! Roles, capabilities and the authenticated caller.
//!
//! Session tokens are verified upstream; the gateway forwards the caller identity in the
//! `x-user-id`, `x-user-role` and `x-organization-id` headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::organizations::{OrganizationId, OrganizationLevel};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Identifier of a registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    FederalChairman,
    RegionalChairman,
    LocalChairman,
    PrimaryChairman,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReviewApplications,
    GenerateDocuments,
    ManageOrganizations,
    CreateOrganizationalDocuments,
    SendToUnion,
}

const CHAIRMAN_CAPABILITIES: &[Capability] = &[
    Capability::ReviewApplications,
    Capability::GenerateDocuments,
    Capability::ManageOrganizations,
    Capability::CreateOrganizationalDocuments,
    Capability::SendToUnion,
];

const PRIMARY_CHAIRMAN_CAPABILITIES: &[Capability] = &[
    Capability::ReviewApplications,
    Capability::GenerateDocuments,
    Capability::CreateOrganizationalDocuments,
    Capability::SendToUnion,
];

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::FederalChairman => "FEDERAL_CHAIRMAN",
            Role::RegionalChairman => "REGIONAL_CHAIRMAN",
            Role::LocalChairman => "LOCAL_CHAIRMAN",
            Role::PrimaryChairman => "PRIMARY_CHAIRMAN",
            Role::Member => "MEMBER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "FEDERAL_CHAIRMAN" => Some(Role::FederalChairman),
            "REGIONAL_CHAIRMAN" => Some(Role::RegionalChairman),
            "LOCAL_CHAIRMAN" => Some(Role::LocalChairman),
            "PRIMARY_CHAIRMAN" => Some(Role::PrimaryChairman),
            "MEMBER" => Some(Role::Member),
            _ => None,
        }
    }

    /// Capability table. Super admins hold every capability.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::SuperAdmin
            | Role::FederalChairman
            | Role::RegionalChairman
            | Role::LocalChairman => CHAIRMAN_CAPABILITIES,
            Role::PrimaryChairman => PRIMARY_CHAIRMAN_CAPABILITIES,
            Role::Member => &[],
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// The hierarchy level a chairman role presides over.
    pub const fn presides_over(self) -> Option<OrganizationLevel> {
        match self {
            Role::FederalChairman => Some(OrganizationLevel::Federal),
            Role::RegionalChairman => Some(OrganizationLevel::Regional),
            Role::LocalChairman => Some(OrganizationLevel::Local),
            Role::PrimaryChairman => Some(OrganizationLevel::Primary),
            Role::SuperAdmin | Role::Member => None,
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role, organization: Option<&str>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
            organization_id: organization.map(|id| OrganizationId(id.to_string())),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}

/// Rejection produced when identity headers are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorRejection {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

impl IntoResponse for ActorRejection {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

fn header_value<'a>(parts: &'a Parts, name: &'static str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ActorRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)
            .ok_or(ActorRejection::MissingHeader(USER_ID_HEADER))?;
        let raw_role =
            header_value(parts, ROLE_HEADER).ok_or(ActorRejection::MissingHeader(ROLE_HEADER))?;
        let role =
            Role::parse(raw_role).ok_or_else(|| ActorRejection::UnknownRole(raw_role.to_string()))?;
        let organization_id = header_value(parts, ORGANIZATION_HEADER)
            .map(|value| OrganizationId(value.to_string()));

        Ok(Actor {
            user_id: UserId(user_id.to_string()),
            role,
            organization_id,
        })
    }
}
