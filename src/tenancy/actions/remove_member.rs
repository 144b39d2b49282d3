use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::cascade::MembershipCascade;
use crate::clock::Clock;
use crate::tenancy::{Role, TenancyStore, Transactional};
use crate::AccessError;

/// Action to remove a member from an organization.
///
/// Removing an `Admin` also deletes their workspace memberships under the
/// organization, in the same transaction; leaving those rows behind would
/// keep privileges the organization just took away. The owner cannot be
/// removed.
pub struct RemoveOrganizationMemberAction<S, C, A>
where
    S: TenancyStore + Transactional,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> RemoveOrganizationMemberAction<S, C, A>
where
    S: TenancyStore + Transactional,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `RemoveOrganizationMemberAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Removes `user_id` from `organization_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Membership removed, with any admin cascade applied
    /// - `Err(AccessError::NotFound)` - Organization or membership absent
    /// - `Err(AccessError::Conflict)` - Target is the organization owner
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_org_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        organization_id: i64,
        user_id: i64,
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
                "The organization owner cannot be removed".to_owned(),
            ));
        }

        let mut uow = self.store.begin().await?;
        uow.delete_organization_member(organization_id, user_id)
            .await?;
        if membership.role == Role::Admin {
            MembershipCascade::revoke_workspace_memberships(uow.as_mut(), organization_id, user_id)
                .await?;
        }
        uow.commit().await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "organization.member_removed",
                entity_type: "organization_member",
                entity_id: membership.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "organization_id": organization_id,
                    "user_id": user_id,
                    "role": membership.role.as_str(),
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"organization member removed\", organization_id={organization_id}, user_id={user_id}, role={}",
            membership.role.as_str()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingAuditSink;
    use crate::clock::FixedClock;
    use crate::mocks::MemoryStore;
    use crate::tenancy::actions::UpdateOrganizationMemberRoleAction;
    use crate::tenancy::{
        CreateOrganization, CreateOrganizationMember, CreateWorkspace,
        OrganizationMemberRepository, OrganizationRepository, WorkspaceMemberRepository,
        WorkspaceRepository,
    };
    use chrono::Utc;

    async fn setup() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        store.register_user(1, "owner@example.com");
        store.register_user(2, "user@example.com");
        let org = store
            .create_organization(CreateOrganization {
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
                owner_id: 1,
                contact_email: "owner@example.com".to_owned(),
            })
            .await
            .unwrap();
        let ws = store
            .create_workspace(CreateWorkspace {
                organization_id: org.id,
                name: "Platform".to_owned(),
                slug: "platform".to_owned(),
                owner_id: 1,
            })
            .await
            .unwrap();
        store
            .add_organization_member(CreateOrganizationMember {
                organization_id: org.id,
                user_id: 2,
                role: Role::Member,
            })
            .await
            .unwrap();
        (store, org.id, ws.id)
    }

    #[tokio::test]
    async fn test_removing_admin_revokes_workspace_memberships() {
        let (store, org_id, ws_id) = setup().await;
        let actor = Principal::new(1, "owner@example.com");
        let clock = FixedClock::at(Utc::now());

        UpdateOrganizationMemberRoleAction::new(
            store.clone(),
            clock.clone(),
            RecordingAuditSink::new(),
        )
        .execute(org_id, 2, Role::Admin, &actor)
        .await
        .unwrap();
        assert!(store.workspace_membership(ws_id, 2).await.unwrap().is_some());

        RemoveOrganizationMemberAction::new(store.clone(), clock, RecordingAuditSink::new())
            .execute(org_id, 2, &actor)
            .await
            .unwrap();

        assert!(store
            .organization_membership(org_id, 2)
            .await
            .unwrap()
            .is_none());
        assert!(store.workspace_membership(ws_id, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_owner_cannot_be_removed() {
        let (store, org_id, _) = setup().await;
        let actor = Principal::new(2, "user@example.com");

        let result = RemoveOrganizationMemberAction::new(
            store,
            FixedClock::at(Utc::now()),
            RecordingAuditSink::new(),
        )
        .execute(org_id, 1, &actor)
        .await;
        assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));
    }
}
