//! Storage abstractions for the tenancy hierarchy.
//!
//! One trait per aggregate, mirroring the tables they back. Implement these
//! for your database; the `mocks` feature provides the in-memory
//! [`MemoryStore`](crate::mocks::MemoryStore) which implements all of them
//! on a single cloneable handle.
//!
//! Writes that must be atomic together (invite acceptance, role changes
//! and their cascades) go through [`Transactional`]/[`UnitOfWork`] rather
//! than the per-aggregate traits; see the module docs on
//! [`cascade`](crate::cascade).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{
    Organization, OrganizationMember, Project, ProjectMember, ProjectNature, Role, Workspace,
    WorkspaceMember,
};
use crate::invites::InviteStatus;
use crate::AccessError;

#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub owner_id: i64,
    pub contact_email: String,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspace {
    pub organization_id: i64,
    pub name: String,
    pub slug: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub workspace_id: i64,
    pub name: String,
    pub nature: ProjectNature,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateOrganizationMember {
    pub organization_id: i64,
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspaceMember {
    pub workspace_id: i64,
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateProjectMember {
    pub project_id: i64,
    pub user_id: i64,
    pub role: Role,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Creates an organization together with its owner's membership row
    /// (role `Owner`), in one atomic write.
    ///
    /// Fails `Conflict` if the slug is taken, or if the owner already has
    /// an organization with the same name.
    async fn create_organization(
        &self,
        data: CreateOrganization,
    ) -> Result<Organization, AccessError>;

    async fn organization_by_id(&self, id: i64) -> Result<Option<Organization>, AccessError>;

    async fn organization_by_slug(&self, slug: &str)
        -> Result<Option<Organization>, AccessError>;

    /// Deletes the organization and everything beneath it (workspaces,
    /// projects, memberships).
    async fn delete_organization(&self, id: i64) -> Result<(), AccessError>;
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Creates a workspace together with its owner's membership row
    /// (role `Owner`), in one atomic write.
    ///
    /// Fails `Conflict` if the slug is taken globally, or the name is taken
    /// within the organization.
    async fn create_workspace(&self, data: CreateWorkspace) -> Result<Workspace, AccessError>;

    async fn workspace_by_id(&self, id: i64) -> Result<Option<Workspace>, AccessError>;

    async fn workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AccessError>;

    /// All workspaces directly under an organization.
    async fn workspaces_in_organization(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Workspace>, AccessError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Creates a project together with its owner's membership row
    /// (role `Owner`), in one atomic write.
    ///
    /// Fails `Conflict` if the name is taken within the workspace.
    async fn create_project(&self, data: CreateProject) -> Result<Project, AccessError>;

    async fn project_by_id(&self, id: i64) -> Result<Option<Project>, AccessError>;
}

#[async_trait]
pub trait OrganizationMemberRepository: Send + Sync {
    /// Fails `Conflict` if the (organization, user) pair already exists.
    async fn add_organization_member(
        &self,
        data: CreateOrganizationMember,
    ) -> Result<OrganizationMember, AccessError>;

    async fn organization_membership(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<Option<OrganizationMember>, AccessError>;

    /// Membership lookup by the member's account email. The store owns the
    /// user/email join; this crate never models user accounts directly.
    async fn organization_membership_by_email(
        &self,
        organization_id: i64,
        email: &str,
    ) -> Result<Option<OrganizationMember>, AccessError>;

    async fn organization_members(
        &self,
        organization_id: i64,
    ) -> Result<Vec<OrganizationMember>, AccessError>;
}

#[async_trait]
pub trait WorkspaceMemberRepository: Send + Sync {
    /// Fails `Conflict` if the (workspace, user) pair already exists.
    async fn add_workspace_member(
        &self,
        data: CreateWorkspaceMember,
    ) -> Result<WorkspaceMember, AccessError>;

    async fn workspace_membership(
        &self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<Option<WorkspaceMember>, AccessError>;

    /// Membership lookup by the member's account email.
    async fn workspace_membership_by_email(
        &self,
        workspace_id: i64,
        email: &str,
    ) -> Result<Option<WorkspaceMember>, AccessError>;

    async fn workspace_members(
        &self,
        workspace_id: i64,
    ) -> Result<Vec<WorkspaceMember>, AccessError>;

    /// Removes a membership row. Removing an absent row is a no-op.
    async fn remove_workspace_member(
        &self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError>;
}

#[async_trait]
pub trait ProjectMemberRepository: Send + Sync {
    /// Fails `Conflict` if the (project, user) pair already exists.
    async fn add_project_member(
        &self,
        data: CreateProjectMember,
    ) -> Result<ProjectMember, AccessError>;

    async fn project_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<ProjectMember>, AccessError>;

    async fn project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>, AccessError>;

    /// Removes a membership row. Removing an absent row is a no-op.
    async fn remove_project_member(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError>;
}

/// Convenience bound for components that read across the whole hierarchy,
/// such as the role resolver and the invite actions. Blanket-implemented
/// for any type providing all six aggregate repositories; a single store
/// handle (like the in-memory mock) satisfies it directly.
pub trait TenancyStore:
    OrganizationRepository
    + WorkspaceRepository
    + ProjectRepository
    + OrganizationMemberRepository
    + WorkspaceMemberRepository
    + ProjectMemberRepository
{
}

impl<T> TenancyStore for T where
    T: OrganizationRepository
        + WorkspaceRepository
        + ProjectRepository
        + OrganizationMemberRepository
        + WorkspaceMemberRepository
        + ProjectMemberRepository
{
}

/// Entry point for transactional write sequences.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Opens a unit of work. Writes issued on it become visible only after
    /// [`UnitOfWork::commit`]; dropping it without committing discards
    /// them.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AccessError>;
}

/// The write operations that participate in atomic sequences: invite
/// acceptance (membership insert + invite status + cascade) and
/// organization role changes (+ cascade).
///
/// Partial application must never be observable: either every buffered
/// write lands on commit, or none does.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn create_organization_member(
        &mut self,
        data: CreateOrganizationMember,
    ) -> Result<(), AccessError>;

    async fn create_workspace_member(
        &mut self,
        data: CreateWorkspaceMember,
    ) -> Result<(), AccessError>;

    /// Inserts a workspace membership if the (workspace, user) pair is
    /// absent; an existing row is left untouched, whatever its role.
    async fn upsert_workspace_member(
        &mut self,
        workspace_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<(), AccessError>;

    /// Deletes a workspace membership; deleting an absent row is a no-op.
    async fn delete_workspace_member(
        &mut self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError>;

    async fn update_organization_member_role(
        &mut self,
        organization_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<(), AccessError>;

    async fn delete_organization_member(
        &mut self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError>;

    async fn set_invite_status(
        &mut self,
        invite_id: i64,
        status: InviteStatus,
        accepted_at: Option<DateTime<Utc>>,
    ) -> Result<(), AccessError>;

    /// In-transaction read used by the cascade to walk the organization's
    /// workspaces.
    async fn workspaces_in_organization(
        &mut self,
        organization_id: i64,
    ) -> Result<Vec<Workspace>, AccessError>;

    /// Atomically applies every buffered write.
    async fn commit(self: Box<Self>) -> Result<(), AccessError>;

    /// Discards every buffered write.
    async fn rollback(self: Box<Self>) -> Result<(), AccessError>;
}
