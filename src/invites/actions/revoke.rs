use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::clock::Clock;
use crate::invites::{InviteRepository, InviteScope, InviteStatus};
use crate::AccessError;

/// Action to withdraw a pending or rejected invitation.
///
/// Revocation is terminal: the invite row is kept for the audit trail but
/// can never be resent or redeemed. Re-inviting the same email takes a
/// fresh send.
pub struct RevokeInviteAction<S, C, A>
where
    S: InviteRepository,
    C: Clock,
    A: AuditSink,
{
    store: S,
    clock: C,
    audit: A,
}

impl<S, C, A> RevokeInviteAction<S, C, A>
where
    S: InviteRepository,
    C: Clock,
    A: AuditSink,
{
    /// Creates a new `RevokeInviteAction`.
    pub fn new(store: S, clock: C, audit: A) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Revokes the invite addressed by `(scope, target_id, invite_id)`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Invite is now `Revoked`
    /// - `Err(AccessError::NotFound)` - Invite does not exist
    /// - `Err(AccessError::InvalidToken)` - Invite does not belong to the
    ///   addressed resource
    /// - `Err(AccessError::Conflict)` - Invite was already accepted or
    ///   already revoked
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "revoke_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope: InviteScope,
        target_id: i64,
        invite_id: i64,
        actor: &Principal,
    ) -> Result<(), AccessError> {
        let invite = self
            .store
            .invite_by_id(invite_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        if invite.scope != scope || invite.target_id != target_id {
            return Err(AccessError::InvalidToken);
        }

        match invite.status {
            InviteStatus::Accepted => {
                return Err(AccessError::Conflict(
                    "Invitation has already been accepted".to_owned(),
                ));
            }
            InviteStatus::Revoked => {
                return Err(AccessError::Conflict(
                    "Invitation is already revoked".to_owned(),
                ));
            }
            InviteStatus::Pending | InviteStatus::Rejected => {}
        }

        self.store
            .set_invite_status(invite.id, InviteStatus::Revoked, None)
            .await?;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "invite.revoked",
                entity_type: super::send::entity_type(invite.scope),
                entity_id: invite.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "target_id": invite.target_id,
                    "email": invite.email,
                }),
                at: self.clock.now(),
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"invite revoked\", scope={}, target_id={}, invite_id={}",
            invite.scope.as_str(),
            invite.target_id,
            invite.id
        );

        Ok(())
    }
}
