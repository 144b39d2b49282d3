use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::clock::Clock;
use crate::tenancy::{
    CreateWorkspaceMember, Role, TenancyStore, WorkspaceMember,
};
use crate::AccessError;

/// Action to add a member directly to a workspace.
///
/// The `Owner` role is reserved for the membership row created with the
/// workspace and cannot be granted here.
pub struct AddWorkspaceMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> AddWorkspaceMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `AddWorkspaceMemberAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Adds `user_id` to `workspace_id` with `role`.
    ///
    /// # Returns
    ///
    /// - `Ok(membership)` - The created membership row
    /// - `Err(AccessError::NotFound)` - Workspace does not exist
    /// - `Err(AccessError::Conflict)` - User is already a member, or the
    ///   role is `Owner`
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "add_workspace_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        workspace_id: i64,
        user_id: i64,
        role: Role,
        actor: &Principal,
    ) -> Result<WorkspaceMember, AccessError> {
        if role == Role::Owner {
            return Err(AccessError::Conflict(
                "The owner role cannot be granted directly".to_owned(),
            ));
        }
        self.store
            .workspace_by_id(workspace_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        let membership = self
            .store
            .add_workspace_member(CreateWorkspaceMember {
                workspace_id,
                user_id,
                role,
            })
            .await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "workspace.member_added",
                entity_type: "workspace_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "workspace_id": workspace_id,
                    "user_id": user_id,
                    "role": role.as_str(),
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"workspace member added\", workspace_id={workspace_id}, user_id={user_id}, role={}",
            role.as_str()
        );

        Ok(membership)
    }
}

/// Action to remove a member from a workspace. The owner's membership row
/// cannot be removed.
pub struct RemoveWorkspaceMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> RemoveWorkspaceMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `RemoveWorkspaceMemberAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Removes `user_id` from `workspace_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Membership removed
    /// - `Err(AccessError::NotFound)` - Workspace or membership absent
    /// - `Err(AccessError::Conflict)` - Target is the workspace owner
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_workspace_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        workspace_id: i64,
        user_id: i64,
        actor: &Principal,
    ) -> Result<(), AccessError> {
        self.store
            .workspace_by_id(workspace_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        let membership = self
            .store
            .workspace_membership(workspace_id, user_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if membership.role == Role::Owner {
            return Err(AccessError::Conflict(
                "The workspace owner cannot be removed".to_owned(),
            ));
        }

        self.store
            .remove_workspace_member(workspace_id, user_id)
            .await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "workspace.member_removed",
                entity_type: "workspace_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "workspace_id": workspace_id,
                    "user_id": user_id,
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"workspace member removed\", workspace_id={workspace_id}, user_id={user_id}"
        );

        Ok(())
    }
}
