use chrono::Duration;

use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::authz::Principal;
use crate::clock::Clock;
use crate::config::InviteConfig;
use crate::crypto::{generate_token, hash_invite_token};
use crate::email::{enqueue_best_effort, EmailDispatcher, InviteEmail};
use crate::invites::{Invite, InviteRepository, InviteScope, InviteStatus};
use crate::secret::SecretString;
use crate::tenancy::TenancyStore;
use crate::AccessError;

/// Output from resending an invitation.
#[derive(Debug)]
pub struct ResendInviteOutput {
    /// The refreshed invite record, back in `Pending` state.
    pub invite: Invite,
    /// The new plain token for the invitee; the previous token is dead.
    pub token: SecretString,
}

/// Action to re-issue a pending, expired or rejected invitation.
///
/// Regenerates the token and expiry and re-sends the email. Accepted and
/// revoked invites are dead ends; a revoked invite needs a fresh send.
pub struct ResendInviteAction<S, C, E, A>
where
    S: TenancyStore + InviteRepository,
    C: Clock,
    E: EmailDispatcher,
    A: AuditSink,
{
    store: S,
    clock: C,
    email: E,
    audit: A,
    config: InviteConfig,
}

impl<S, C, E, A> ResendInviteAction<S, C, E, A>
where
    S: TenancyStore + InviteRepository,
    C: Clock,
    E: EmailDispatcher,
    A: AuditSink,
{
    /// Creates a new `ResendInviteAction` with default configuration.
    pub fn new(store: S, clock: C, email: E, audit: A) -> Self {
        Self::with_config(store, clock, email, audit, InviteConfig::default())
    }

    /// Creates a new `ResendInviteAction` with custom configuration.
    pub fn with_config(store: S, clock: C, email: E, audit: A, config: InviteConfig) -> Self {
        Self {
            store,
            clock,
            email,
            audit,
            config,
        }
    }

    /// Re-issues the invite addressed by `(scope, target_id, invite_id)`.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Invite refreshed, with the new plain token
    /// - `Err(AccessError::NotFound)` - Invite does not exist
    /// - `Err(AccessError::InvalidToken)` - Invite does not belong to the
    ///   addressed resource
    /// - `Err(AccessError::Conflict)` - Invite was already accepted or
    ///   revoked
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "resend_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope: InviteScope,
        target_id: i64,
        invite_id: i64,
        actor: &Principal,
    ) -> Result<ResendInviteOutput, AccessError> {
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
                    "Invitation has been revoked; send a new one".to_owned(),
                ));
            }
            InviteStatus::Pending | InviteStatus::Rejected => {}
        }

        let (target_name, target_slug) =
            super::resolve_target(&self.store, scope, target_id).await?;

        let now = self.clock.now();
        let token = generate_token(self.config.token_length);
        let token_hash = hash_invite_token(&token, self.config.hash_cost)?;
        let expires_at = now + Duration::days(self.config.expiry_days);

        let invite = self
            .store
            .refresh_invite_token(invite.id, token_hash, expires_at)
            .await?;

        let token = SecretString::new(token);

        enqueue_best_effort(
            &self.email,
            InviteEmail {
                scope: invite.scope,
                to: invite.email.clone(),
                target_name,
                target_slug,
                target_id: invite.target_id,
                inviter_id: invite.invited_by,
                token: token.clone(),
                expires_at: invite.expires_at,
            },
        )
        .await;

        record_best_effort(
            &self.audit,
            AuditEntry {
                action: "invite.resent",
                entity_type: super::send::entity_type(invite.scope),
                entity_id: invite.id,
                actor_id: actor.id,
                details: serde_json::json!({
                    "target_id": invite.target_id,
                    "email": invite.email,
                }),
                at: now,
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"invite resent\", scope={}, target_id={}, invite_id={}",
            invite.scope.as_str(),
            invite.target_id,
            invite.id
        );

        Ok(ResendInviteOutput { invite, token })
    }
}
