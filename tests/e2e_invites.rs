//! End-to-end tests for the invite lifecycle.
//!
//! These tests drive the full send/resend/revoke/accept/reject/preview
//! state machine against the in-memory store.
//! Run with: `cargo test --features mocks --test e2e_invites`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};

use terrace::invites::{
    AcceptInviteAction, InviteRepository, InviteScope, InviteStatus, PreviewInviteAction,
    RejectInviteAction, ResendInviteAction, RevokeInviteAction, SendInviteAction, SendInviteInput,
};
use terrace::mocks::{FixedClock, MemoryStore, RecordingAuditSink, RecordingEmailDispatcher};
use terrace::tenancy::{
    CreateOrganization, CreateWorkspace, OrganizationMemberRepository, OrganizationRepository,
    WorkspaceMemberRepository, WorkspaceRepository,
};
use terrace::{AccessError, Clock, Principal, Role, SecretString};

struct Fixture {
    store: MemoryStore,
    clock: FixedClock,
    emails: RecordingEmailDispatcher,
    audit: RecordingAuditSink,
    org_id: i64,
    workspace_id: i64,
}

const INVITEE: &str = "invitee@example.com";

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    store.register_user(1, "owner@acme.example");
    store.register_user(2, INVITEE);
    let org = store
        .create_organization(CreateOrganization {
            name: "Acme".to_owned(),
            slug: "acme".to_owned(),
            owner_id: 1,
            contact_email: "owner@acme.example".to_owned(),
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
    Fixture {
        store,
        clock: FixedClock::at(Utc::now()),
        emails: RecordingEmailDispatcher::new(),
        audit: RecordingAuditSink::new(),
        org_id: org.id,
        workspace_id: ws.id,
    }
}

impl Fixture {
    fn send(
        &self,
    ) -> SendInviteAction<MemoryStore, FixedClock, RecordingEmailDispatcher, RecordingAuditSink>
    {
        SendInviteAction::new(
            self.store.clone(),
            self.clock.clone(),
            self.emails.clone(),
            self.audit.clone(),
        )
    }

    fn resend(
        &self,
    ) -> ResendInviteAction<MemoryStore, FixedClock, RecordingEmailDispatcher, RecordingAuditSink>
    {
        ResendInviteAction::new(
            self.store.clone(),
            self.clock.clone(),
            self.emails.clone(),
            self.audit.clone(),
        )
    }

    fn revoke(&self) -> RevokeInviteAction<MemoryStore, FixedClock, RecordingAuditSink> {
        RevokeInviteAction::new(self.store.clone(), self.clock.clone(), self.audit.clone())
    }

    fn accept(&self) -> AcceptInviteAction<MemoryStore, FixedClock, RecordingAuditSink> {
        AcceptInviteAction::new(self.store.clone(), self.clock.clone(), self.audit.clone())
    }

    fn reject(&self) -> RejectInviteAction<MemoryStore, FixedClock, RecordingAuditSink> {
        RejectInviteAction::new(self.store.clone(), self.clock.clone(), self.audit.clone())
    }

    fn preview(&self) -> PreviewInviteAction<MemoryStore, FixedClock> {
        PreviewInviteAction::new(self.store.clone(), self.clock.clone())
    }

    fn org_input(&self, role: Role) -> SendInviteInput {
        SendInviteInput {
            scope: InviteScope::Organization,
            target_id: self.org_id,
            email: INVITEE.to_owned(),
            role,
            invited_by: 1,
        }
    }
}

#[tokio::test]
async fn test_invite_round_trip() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    assert_eq!(f.emails.sent().len(), 1);

    let invitee = Principal::new(2, INVITEE);
    let accepted = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();
    assert_eq!(accepted.status, InviteStatus::Accepted);
    assert_eq!(accepted.accepted_at, Some(f.clock.now()));

    // exactly one membership, with the invited role
    let members = f.store.organization_members(f.org_id).await.unwrap();
    let rows: Vec<_> = members.iter().filter(|m| m.user_id == 2).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, Role::Member);

    // a second accept with the same token fails with Conflict
    let result = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));
}

#[tokio::test]
async fn test_workspace_invite_round_trip() {
    let f = fixture().await;
    let output = f
        .send()
        .execute(SendInviteInput {
            scope: InviteScope::Workspace,
            target_id: f.workspace_id,
            email: INVITEE.to_owned(),
            role: Role::Admin,
            invited_by: 1,
        })
        .await
        .unwrap();

    let invitee = Principal::new(2, INVITEE);
    f.accept()
        .execute(
            InviteScope::Workspace,
            f.workspace_id,
            &output.token,
            &invitee,
        )
        .await
        .unwrap();

    let m = f
        .store
        .workspace_membership(f.workspace_id, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(m.role, Role::Admin);
    // a workspace invite never touches the organization membership table
    assert!(f
        .store
        .organization_membership(f.org_id, 2)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_expired_invite_is_unusable_but_stays_pending() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();

    f.clock.advance(Duration::days(8));
    let invitee = Principal::new(2, INVITEE);
    let result = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::Expired));

    // no sweeper: the row still says Pending
    let stored = f
        .store
        .invite_by_id(output.invite.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InviteStatus::Pending);
    assert!(f
        .store
        .organization_membership(f.org_id, 2)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_send_conflicts_until_expiry() {
    let f = fixture().await;
    f.send().execute(f.org_input(Role::Member)).await.unwrap();

    let result = f.send().execute(f.org_input(Role::Member)).await;
    assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));

    // once the active invite has expired, sending is allowed again
    f.clock.advance(Duration::days(8));
    f.send().execute(f.org_input(Role::Member)).await.unwrap();
}

#[tokio::test]
async fn test_send_to_member_conflicts() {
    let f = fixture().await;
    let mut input = f.org_input(Role::Member);
    input.email = "owner@acme.example".to_owned();

    let result = f.send().execute(input).await;
    assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));
}

#[tokio::test]
async fn test_resend_rotates_the_token() {
    let f = fixture().await;
    let first = f.send().execute(f.org_input(Role::Member)).await.unwrap();

    let actor = Principal::new(1, "owner@acme.example");
    let second = f
        .resend()
        .execute(
            InviteScope::Organization,
            f.org_id,
            first.invite.id,
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(f.emails.sent().len(), 2);

    // the old token is dead, the new one redeems
    let invitee = Principal::new(2, INVITEE);
    let result = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &first.token, &invitee)
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));
    f.accept()
        .execute(InviteScope::Organization, f.org_id, &second.token, &invitee)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_revoked_is_terminal() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    let actor = Principal::new(1, "owner@acme.example");

    f.revoke()
        .execute(
            InviteScope::Organization,
            f.org_id,
            output.invite.id,
            &actor,
        )
        .await
        .unwrap();

    // resending a revoked invite fails; it takes a fresh send
    let result = f
        .resend()
        .execute(
            InviteScope::Organization,
            f.org_id,
            output.invite.id,
            &actor,
        )
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));

    // the revoked token no longer redeems
    let invitee = Principal::new(2, INVITEE);
    let result = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));

    // a fresh send works because the old invite is no longer pending
    f.send().execute(f.org_input(Role::Member)).await.unwrap();

    // nothing is deleted along the way: both rows stay on the trail
    let all = f
        .store
        .invites_for_target(InviteScope::Organization, f.org_id, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let revoked = f
        .store
        .invites_for_target(
            InviteScope::Organization,
            f.org_id,
            Some(InviteStatus::Revoked),
        )
        .await
        .unwrap();
    assert_eq!(revoked.len(), 1);
}

#[tokio::test]
async fn test_revoking_an_accepted_invite_conflicts() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    let invitee = Principal::new(2, INVITEE);
    f.accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();

    let actor = Principal::new(1, "owner@acme.example");
    let result = f
        .revoke()
        .execute(
            InviteScope::Organization,
            f.org_id,
            output.invite.id,
            &actor,
        )
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::Conflict(_)));
}

#[tokio::test]
async fn test_rejected_invite_can_be_resent() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    let invitee = Principal::new(2, INVITEE);

    f.reject()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();
    let stored = f
        .store
        .invite_by_id(output.invite.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InviteStatus::Rejected);
    assert!(f
        .store
        .organization_membership(f.org_id, 2)
        .await
        .unwrap()
        .is_none());

    // the inviter may try again with the same invite row
    let actor = Principal::new(1, "owner@acme.example");
    let second = f
        .resend()
        .execute(
            InviteScope::Organization,
            f.org_id,
            output.invite.id,
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(second.invite.status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_preview_shows_target_without_mutation() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Admin)).await.unwrap();
    let invitee = Principal::new(2, INVITEE);

    let preview = f
        .preview()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();
    assert_eq!(preview.target_name, "Acme");
    assert_eq!(preview.target_slug, "acme");
    assert_eq!(preview.invite.role, Role::Admin);

    // previewing leaves the invite pending and the token redeemable
    f.accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_from_another_target_does_not_redeem() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    let invitee = Principal::new(2, INVITEE);

    let result = f
        .accept()
        .execute(
            InviteScope::Workspace,
            f.workspace_id,
            &output.token,
            &invitee,
        )
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));
}

#[tokio::test]
async fn test_wrong_principal_email_does_not_redeem() {
    let f = fixture().await;
    f.store.register_user(3, "somebody-else@example.com");
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();

    let impostor = Principal::new(3, "somebody-else@example.com");
    let result = f
        .accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &impostor)
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));
}

#[tokio::test]
async fn test_lifecycle_is_audited() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();
    let invitee = Principal::new(2, INVITEE);
    f.accept()
        .execute(InviteScope::Organization, f.org_id, &output.token, &invitee)
        .await
        .unwrap();

    let actions: Vec<&str> = f.audit.entries().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["invite.sent", "invite.accepted"]);
}

#[tokio::test]
async fn test_send_never_returns_a_stored_token() {
    let f = fixture().await;
    let output = f.send().execute(f.org_input(Role::Member)).await.unwrap();

    let stored = f
        .store
        .invite_by_id(output.invite.id)
        .await
        .unwrap()
        .unwrap();
    // the stored hash must not be the raw token
    assert_ne!(stored.token_hash, output.token.expose_secret());
    // and a bogus token must not redeem
    let invitee = Principal::new(2, INVITEE);
    let result = f
        .accept()
        .execute(
            InviteScope::Organization,
            f.org_id,
            &SecretString::new("bogus"),
            &invitee,
        )
        .await;
    assert!(matches!(result.unwrap_err(), AccessError::InvalidToken));
}
