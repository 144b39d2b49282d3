use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::cascade::MembershipCascade;
use crate::clock::Clock;
use crate::tenancy::{Role, TenancyStore, Transactional};
use crate::AccessError;

/// Action to change an organization member's role.
///
/// The role update and the workspace cascade commit together: promoting to
/// `Admin` fans admin memberships out to every workspace under the
/// organization, demoting an `Admin` to `Member` deletes every workspace
/// membership the user holds under it.
///
/// The owner is untouchable here: the owner's role cannot be changed, and
/// `Owner` cannot be granted. Ownership transfer is a separate operation
/// outside this crate.
pub struct UpdateOrganizationMemberRoleAction<S, C, A>
where
    S: TenancyStore + Transactional,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> UpdateOrganizationMemberRoleAction<S, C, A>
where
    S: TenancyStore + Transactional,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `UpdateOrganizationMemberRoleAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Sets `user_id`'s role in `organization_id` to `new_role`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Role updated and cascade applied
    /// - `Err(AccessError::NotFound)` - Organization or membership absent
    /// - `Err(AccessError::Conflict)` - Target is the owner, or `new_role`
    ///   is `Owner`
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_org_member_role", skip_all, err)
    )]
    pub async fn execute(
        &self,
        organization_id: i64,
        user_id: i64,
        new_role: Role,
        actor: &Principal,
    ) -> Result<(), AccessError> {
        self.store
            .organization_by_id(organization_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        let membership = self
            .store
            .organization_membership(organization_id, user_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if membership.role == Role::Owner {
            return Err(AccessError::Conflict(
                "The organization owner's role cannot be changed".to_owned(),
            ));
        }
        if new_role == Role::Owner {
            return Err(AccessError::Conflict(
                "Ownership cannot be granted through a role change".to_owned(),
            ));
        }
        if membership.role == new_role {
            return Ok(());
        }

        let mut uow = self.store.begin().await?;
        uow.update_organization_member_role(organization_id, user_id, new_role)
            .await?;
        MembershipCascade::sync_on_role_change(
            uow.as_mut(),
            organization_id,
            user_id,
            membership.role,
            new_role,
        )
        .await?;
        uow.commit().await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "organization.member_role_updated",
                entity_type: "organization_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "organization_id": organization_id,
                    "user_id": user_id,
                    "old_role": membership.role.as_str(),
                    "new_role": new_role.as_str(),
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"organization member role updated\", organization_id={organization_id}, user_id={user_id}, old_role={}, new_role={}",
            membership.role.as_str(),
            new_role.as_str()
        );

        Ok(())
    }
}
