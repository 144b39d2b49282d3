//! Workspace-membership synchronization for organization role changes.
//!
//! Granting a user organization `Admin` (by promotion or invite acceptance)
//! fans out a workspace `Admin` membership to every workspace under the
//! organization; demoting them back to `Member` deletes every workspace
//! membership they hold under it. Both loops run on an open
//! [`UnitOfWork`](crate::tenancy::UnitOfWork) supplied by the caller, so
//! the triggering write and the fan-out commit or roll back together.
//!
//! Demotion is deliberately coarse: membership rows carry no provenance, so
//! the delete loop cannot tell a cascade-granted row from one an admin
//! added by hand before the promotion, and removes both.

use crate::tenancy::{Role, UnitOfWork};
use crate::AccessError;

/// Applies organization-role changes to dependent workspace memberships.
pub struct MembershipCascade;

impl MembershipCascade {
    /// Routes a role transition to the matching fan-out.
    ///
    /// Transitions to `Admin` grant, `Admin` to `Member` revokes, anything
    /// else is a no-op. Transitions touching `Owner` never reach this
    /// point; the membership-mutation actions reject them upfront.
    pub async fn sync_on_role_change(
        uow: &mut dyn UnitOfWork,
        organization_id: i64,
        user_id: i64,
        old_role: Role,
        new_role: Role,
    ) -> Result<(), AccessError> {
        match (old_role, new_role) {
            (Role::Admin, Role::Admin) => Ok(()),
            (_, Role::Admin) => {
                Self::grant_admin_workspaces(uow, organization_id, user_id).await?;
                Ok(())
            }
            (Role::Admin, Role::Member) => {
                Self::revoke_workspace_memberships(uow, organization_id, user_id).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Upserts a workspace `Admin` membership for the user in every
    /// workspace under the organization. Existing rows are left untouched,
    /// so running the grant twice leaves exactly one row per workspace.
    ///
    /// Returns the number of workspaces visited.
    pub async fn grant_admin_workspaces(
        uow: &mut dyn UnitOfWork,
        organization_id: i64,
        user_id: i64,
    ) -> Result<usize, AccessError> {
        let workspaces = uow.workspaces_in_organization(organization_id).await?;
        for workspace in &workspaces {
            uow.upsert_workspace_member(workspace.id, user_id, Role::Admin)
                .await?;
        }

        log::info!(
            target: "terrace",
            "msg=\"admin workspace memberships granted\", organization_id={organization_id}, user_id={user_id}, workspaces={}",
            workspaces.len()
        );

        Ok(workspaces.len())
    }

    /// Deletes the user's workspace memberships in every workspace under
    /// the organization, cascade-granted and hand-added alike.
    ///
    /// Returns the number of workspaces visited.
    pub async fn revoke_workspace_memberships(
        uow: &mut dyn UnitOfWork,
        organization_id: i64,
        user_id: i64,
    ) -> Result<usize, AccessError> {
        let workspaces = uow.workspaces_in_organization(organization_id).await?;
        for workspace in &workspaces {
            uow.delete_workspace_member(workspace.id, user_id).await?;
        }

        log::info!(
            target: "terrace",
            "msg=\"workspace memberships revoked\", organization_id={organization_id}, user_id={user_id}, workspaces={}",
            workspaces.len()
        );

        Ok(workspaces.len())
    }
}
