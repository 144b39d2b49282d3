//! The three-level tenancy hierarchy: organizations, workspaces, projects,
//! and their membership tables.

pub mod actions;
pub mod repository;
mod types;

pub use repository::{
    CreateOrganization, CreateOrganizationMember, CreateProject, CreateProjectMember,
    CreateWorkspace, CreateWorkspaceMember, OrganizationMemberRepository, OrganizationRepository,
    ProjectMemberRepository, ProjectRepository, TenancyStore, Transactional, UnitOfWork,
    WorkspaceMemberRepository, WorkspaceRepository,
};
pub use types::{
    Organization, OrganizationMember, Project, ProjectMember, ProjectNature, Role, Workspace,
    WorkspaceMember,
};
