use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::cascade::MembershipCascade;
use crate::clock::Clock;
use crate::invites::{Invite, InviteRepository, InviteScope, InviteStatus};
use crate::secret::SecretString;
use crate::tenancy::{
    CreateOrganizationMember, CreateWorkspaceMember, Role, TenancyStore, Transactional,
};
use crate::AccessError;

/// Action to redeem an invitation token.
///
/// This action:
/// 1. Matches the raw token against the principal's pending invites
/// 2. Rejects principals who are already members
/// 3. In one transaction: creates the membership, marks the invite
///    accepted, and, for an organization invite granting `Admin`, fans
///    admin memberships out to every workspace under the organization
///
/// Readers never observe the invite accepted without the membership, or
/// the membership without the cascade.
pub struct AcceptInviteAction<S, C, A>
where
    S: TenancyStore + InviteRepository + Transactional,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> AcceptInviteAction<S, C, A>
where
    S: TenancyStore + InviteRepository + Transactional,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `AcceptInviteAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Accepts an invitation to `(scope, target_id)` using the raw token.
    ///
    /// # Returns
    ///
    /// - `Ok(invite)` - Membership created; the returned invite is in its
    ///   accepted state
    /// - `Err(AccessError::InvalidToken)` - Token matches no pending invite
    ///   for the principal's email at this target
    /// - `Err(AccessError::Expired)` - Token only matches an invite past
    ///   its expiry
    /// - `Err(AccessError::Conflict)` - Principal is already a member
    ///   (including a second accept of the same token)
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accept_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope: InviteScope,
        target_id: i64,
        token: &SecretString,
        principal: &Principal,
    ) -> Result<Invite, AccessError> {
        let now = self.clock.now();
        let mut invite = super::match_pending_invite(
            &self.store,
            scope,
            target_id,
            &principal.email,
            token,
            now,
        )
        .await?;

        // idempotent double-accept guard
        let already_member = match scope {
            InviteScope::Organization => self
                .store
                .organization_membership(target_id, principal.id)
                .await?
                .is_some(),
            InviteScope::Workspace => self
                .store
                .workspace_membership(target_id, principal.id)
                .await?
                .is_some(),
        };
        if already_member {
            return Err(AccessError::Conflict(
                "User is already a member".to_owned(),
            ));
        }

        let mut uow = self.store.begin().await?;
        match scope {
            InviteScope::Organization => {
                uow.create_organization_member(CreateOrganizationMember {
                    organization_id: target_id,
                    user_id: principal.id,
                    role: invite.role,
                })
                .await?;
            }
            InviteScope::Workspace => {
                uow.create_workspace_member(CreateWorkspaceMember {
                    workspace_id: target_id,
                    user_id: principal.id,
                    role: invite.role,
                })
                .await?;
            }
        }
        uow.set_invite_status(invite.id, InviteStatus::Accepted, Some(now))
            .await?;
        if scope == InviteScope::Organization && invite.role == Role::Admin {
            MembershipCascade::grant_admin_workspaces(uow.as_mut(), target_id, principal.id)
                .await?;
        }
        uow.commit().await?;

        invite.status = InviteStatus::Accepted;
        invite.accepted_at = Some(now);

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "invite.accepted",
                entity_type: super::send::entity_type(scope),
                entity_id: invite.id,
                actor_id: principal.id,
                details: serde_json::json!({
                    "target_id": invite.target_id,
                    "role": invite.role.as_str(),
                }),
                at: now,
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"invite accepted\", scope={}, target_id={}, invite_id={}, user_id={}",
            invite.scope.as_str(),
            invite.target_id,
            invite.id,
            principal.id
        );

        Ok(invite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingAuditSink;
    use crate::clock::FixedClock;
    use crate::email::RecordingEmailDispatcher;
    use crate::invites::actions::{SendInviteAction, SendInviteInput};
    use crate::mocks::MemoryStore;
    use crate::tenancy::{
        CreateOrganization, OrganizationMemberRepository, OrganizationRepository,
    };
    use chrono::{Duration, Utc};

    async fn send_invite(
        store: &MemoryStore,
        clock: &FixedClock,
        org_id: i64,
        role: Role,
    ) -> (crate::invites::Invite, SecretString) {
        let send = SendInviteAction::new(
            store.clone(),
            clock.clone(),
            RecordingEmailDispatcher::new(),
            RecordingAuditSink::new(),
        );
        let output = send
            .execute(SendInviteInput {
                scope: InviteScope::Organization,
                target_id: org_id,
                email: "invitee@example.com".to_owned(),
                role,
                invited_by: 1,
            })
            .await
            .unwrap();
        (output.invite, output.token)
    }

    async fn setup() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        store.register_user(1, "owner@example.com");
        store.register_user(2, "invitee@example.com");
        let org = store
            .create_organization(CreateOrganization {
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
                owner_id: 1,
                contact_email: "owner@example.com".to_owned(),
            })
            .await
            .unwrap();
        (store, org.id)
    }

    #[tokio::test]
    async fn test_accept_creates_membership_with_invited_role() {
        let (store, org_id) = setup().await;
        let clock = FixedClock::at(Utc::now());
        let (invite, token) = send_invite(&store, &clock, org_id, Role::Member).await;

        let action =
            AcceptInviteAction::new(store.clone(), clock.clone(), RecordingAuditSink::new());
        let principal = Principal::new(2, "invitee@example.com");
        let accepted = action
            .execute(InviteScope::Organization, org_id, &token, &principal)
            .await
            .unwrap();

        assert_eq!(accepted.id, invite.id);
        assert_eq!(accepted.status, InviteStatus::Accepted);
        assert_eq!(accepted.accepted_at, Some(clock.now()));

        let membership = store
            .organization_membership(org_id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, Role::Member);
    }

    #[tokio::test]
    async fn test_second_accept_conflicts() {
        let (store, org_id) = setup().await;
        let clock = FixedClock::at(Utc::now());
        let (_, token) = send_invite(&store, &clock, org_id, Role::Member).await;

        let action = AcceptInviteAction::new(store, clock, RecordingAuditSink::new());
        let principal = Principal::new(2, "invitee@example.com");
        action
            .execute(InviteScope::Organization, org_id, &token, &principal)
            .await
            .unwrap();

        let result = action
            .execute(InviteScope::Organization, org_id, &token, &principal)
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_as_expired() {
        let (store, org_id) = setup().await;
        let clock = FixedClock::at(Utc::now());
        let (_, token) = send_invite(&store, &clock, org_id, Role::Member).await;

        clock.advance(Duration::days(8));
        let action = AcceptInviteAction::new(store, clock, RecordingAuditSink::new());
        let principal = Principal::new(2, "invitee@example.com");
        let result = action
            .execute(InviteScope::Organization, org_id, &token, &principal)
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Expired));
    }

    #[tokio::test]
    async fn test_wrong_token_is_invalid() {
        let (store, org_id) = setup().await;
        let clock = FixedClock::at(Utc::now());
        send_invite(&store, &clock, org_id, Role::Member).await;

        let action = AcceptInviteAction::new(store, clock, RecordingAuditSink::new());
        let principal = Principal::new(2, "invitee@example.com");
        let result = action
            .execute(
                InviteScope::Organization,
                org_id,
                &SecretString::new("wrong-token"),
                &principal,
            )
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));
    }
}
