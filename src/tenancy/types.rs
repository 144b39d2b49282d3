//! Core types for the tenancy hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A membership role, shared by all three hierarchy levels.
///
/// Roles form a total order `Owner > Admin > Member` for permission
/// purposes, but required-role checks match against an explicit set rather
/// than the order (a `Member` never satisfies a check that lists only
/// `Owner`/`Admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Parse the storage representation.
    ///
    /// Returns `None` if the string is not a known role.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(Self::Owner),
            "ADMIN" => Some(Self::Admin),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }

    /// True for the roles that inherit authorization downwards.
    ///
    /// An organization `Owner` or `Admin` is implicitly authorized on every
    /// workspace and project under the organization, with no membership row
    /// at the lower level.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// Whether a project is open to its workspace or membership-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectNature {
    /// Open membership; role-gated actions check the workspace role.
    Public,
    /// Requires an explicit project membership row.
    Private,
}

impl ProjectNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Self::Public),
            "PRIVATE" => Some(Self::Private),
            _ => None,
        }
    }
}

/// The top tenancy level.
///
/// The owner always also holds an `OrganizationMember` row with role
/// [`Role::Owner`]; stores create both together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier.
    pub id: i64,
    /// Human-readable name, unique per owner.
    pub name: String,
    /// URL-friendly identifier, globally unique.
    pub slug: String,
    /// User who owns the organization.
    pub owner_id: i64,
    /// Contact address for the organization.
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a user to an organization with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: i64,
    pub organization_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// The middle tenancy level, owned by an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    /// Owning organization.
    pub organization_id: i64,
    /// Unique within the owning organization.
    pub name: String,
    /// URL-friendly identifier, globally unique.
    pub slug: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a user to a workspace with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub id: i64,
    pub workspace_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// The bottom tenancy level, owned by a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    /// Owning workspace.
    pub workspace_id: i64,
    /// Unique within the owning workspace.
    pub name: String,
    pub nature: ProjectNature,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a user to a project with a role.
///
/// Only meaningful for private projects, or for role-gated actions on a
/// public project's members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::Member] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(Role::parse("SUPERUSER"), None);
    }

    #[test]
    fn test_role_elevation() {
        assert!(Role::Owner.is_elevated());
        assert!(Role::Admin.is_elevated());
        assert!(!Role::Member.is_elevated());
    }

    #[test]
    fn test_role_serde_uses_storage_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let parsed: Role = serde_json::from_str("\"MEMBER\"").unwrap();
        assert_eq!(parsed, Role::Member);
    }

    #[test]
    fn test_nature_roundtrip() {
        for nature in [ProjectNature::Public, ProjectNature::Private] {
            assert_eq!(ProjectNature::parse(nature.as_str()), Some(nature));
        }
        assert_eq!(ProjectNature::parse("SECRET"), None);
    }
}
