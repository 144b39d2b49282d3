use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::clock::Clock;
use crate::tenancy::{CreateProjectMember, ProjectMember, Role, TenancyStore};
use crate::AccessError;

/// Action to add a member directly to a project.
///
/// Membership rows matter for private projects, and for role-gating
/// individual members of public ones. The `Owner` role is reserved for the
/// row created with the project.
pub struct AddProjectMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> AddProjectMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `AddProjectMemberAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Adds `user_id` to `project_id` with `role`.
    ///
    /// # Returns
    ///
    /// - `Ok(membership)` - The created membership row
    /// - `Err(AccessError::NotFound)` - Project does not exist
    /// - `Err(AccessError::Conflict)` - User is already a member, or the
    ///   role is `Owner`
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "add_project_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        project_id: i64,
        user_id: i64,
        role: Role,
        actor: &Principal,
    ) -> Result<ProjectMember, AccessError> {
        if role == Role::Owner {
            return Err(AccessError::Conflict(
                "The owner role cannot be granted directly".to_owned(),
            ));
        }
        self.store
            .project_by_id(project_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        let membership = self
            .store
            .add_project_member(CreateProjectMember {
                project_id,
                user_id,
                role,
            })
            .await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "project.member_added",
                entity_type: "project_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "project_id": project_id,
                    "user_id": user_id,
                    "role": role.as_str(),
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"project member added\", project_id={project_id}, user_id={user_id}, role={}",
            role.as_str()
        );

        Ok(membership)
    }
}

/// Action to remove a member from a project. The owner's membership row
/// cannot be removed.
pub struct RemoveProjectMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> RemoveProjectMemberAction<S, C, A>
where
    S: TenancyStore,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `RemoveProjectMemberAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Removes `user_id` from `project_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Membership removed
    /// - `Err(AccessError::NotFound)` - Project or membership absent
    /// - `Err(AccessError::Conflict)` - Target is the project owner
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_project_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        project_id: i64,
        user_id: i64,
        actor: &Principal,
    ) -> Result<(), AccessError> {
        self.store
            .project_by_id(project_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        let membership = self
            .store
            .project_membership(project_id, user_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if membership.role == Role::Owner {
            return Err(AccessError::Conflict(
                "The project owner cannot be removed".to_owned(),
            ));
        }

        self.store.remove_project_member(project_id, user_id).await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "project.member_removed",
                entity_type: "project_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "project_id": project_id,
                    "user_id": user_id,
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"project member removed\", project_id={project_id}, user_id={user_id}"
        );

        Ok(())
    }
}
