use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::clock::Clock;
use crate::invites::{InviteRepository, InviteScope, InviteStatus};
use crate::secret::SecretString;
use crate::AccessError;

/// Action to decline an invitation.
///
/// Uses the same token matching as acceptance but transitions the invite
/// to `Rejected` with no membership side effects. A rejected invite can
/// still be resent by the inviter.
pub struct RejectInviteAction<S, C, A>
where
    S: InviteRepository,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> RejectInviteAction<S, C, A>
where
    S: InviteRepository,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `RejectInviteAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Declines an invitation to `(scope, target_id)` using the raw token.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Invite is now `Rejected`
    /// - `Err(AccessError::InvalidToken)` - Token matches no pending invite
    ///   for the principal's email at this target
    /// - `Err(AccessError::Expired)` - Token only matches an invite past
    ///   its expiry
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "reject_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope: InviteScope,
        target_id: i64,
        token: &SecretString,
        principal: &Principal,
    ) -> Result<(), AccessError> {
        let now = self.clock.now();
        let invite = super::match_pending_invite(
            &self.store,
            scope,
            target_id,
            &principal.email,
            token,
            now,
        )
        .await?;

        self.store
            .set_invite_status(invite.id, InviteStatus::Rejected, None)
            .await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "invite.rejected",
                entity_type: super::send::entity_type(scope),
                entity_id: invite.id,
                actor_id: principal.id,
                details: serde_json::json!({ "target_id": invite.target_id }),
                at: now,
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"invite rejected\", scope={}, target_id={}, invite_id={}, user_id={}",
            invite.scope.as_str(),
            invite.target_id,
            invite.id,
            principal.id
        );

        Ok(())
    }
}
