//! Direct membership mutations.
//!
//! These are the operations behind the member-management endpoints: role
//! changes and removals at the organization level (which trigger the
//! workspace cascade) and direct add/remove at the workspace and project
//! levels. Callers authorize through
//! [`RoleResolver`](crate::authz::RoleResolver) before invoking them; the
//! actions themselves enforce only the owner-protection invariants.

mod project_members;
mod remove_member;
mod update_member_role;
mod workspace_members;

pub use project_members::{AddProjectMemberAction, RemoveProjectMemberAction};
pub use remove_member::RemoveOrganizationMemberAction;
pub use update_member_role::UpdateOrganizationMemberRoleAction;
pub use workspace_members::{AddWorkspaceMemberAction, RemoveWorkspaceMemberAction};
