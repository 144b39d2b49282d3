use chrono::Duration;

use crate::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::clock::Clock;
use crate::config::InviteConfig;
use crate::crypto::{generate_token, hash_invite_token};
use crate::email::{enqueue_best_effort, EmailDispatcher, InviteEmail};
use crate::invites::{CreateInvite, Invite, InviteRepository, InviteScope};
use crate::secret::SecretString;
use crate::tenancy::{Role, TenancyStore};
use crate::AccessError;

/// Input data for sending an invitation.
#[derive(Debug, Clone)]
pub struct SendInviteInput {
    pub scope: InviteScope,
    pub target_id: i64,
    pub email: String,
    pub role: Role,
    pub invited_by: i64,
}

/// Output from sending an invitation.
#[derive(Debug)]
pub struct SendInviteOutput {
    /// The created invite record.
    pub invite: Invite,
    /// The plain token for the invitee. Not stored; this is the only time
    /// it leaves the library.
    pub token: SecretString,
}

/// Action to invite a user into an organization or workspace by email.
///
/// This action:
/// 1. Validates the target exists
/// 2. Rejects invitees who are already members
/// 3. Rejects while an active pending invite exists for the same email
/// 4. Generates a token, stores only its hash, and sets the expiry
/// 5. Enqueues the invite email and records an audit entry, best-effort
pub struct SendInviteAction<S, C, E, A>
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

impl<S, C, E, A> SendInviteAction<S, C, E, A>
where
    S: TenancyStore + InviteRepository,
    C: Clock,
    E: EmailDispatcher,
    A: AuditSink,
{
    /// Creates a new `SendInviteAction` with default configuration.
    pub fn new(store: S, clock: C, email: E, audit: A) -> Self {
        Self::with_config(store, clock, email, audit, InviteConfig::default())
    }

    /// Creates a new `SendInviteAction` with custom configuration.
    pub fn with_config(store: S, clock: C, email: E, audit: A, config: InviteConfig) -> Self {
        Self {
            store,
            clock,
            email,
            audit,
            config,
        }
    }

    /// Creates an invitation and hands the raw token to the mailer.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Invite created, with the plain token for delivery
    /// - `Err(AccessError::NotFound)` - Target does not exist
    /// - `Err(AccessError::Conflict)` - Invitee already a member, an active
    ///   invite already exists, or the role is `Owner`
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "send_invite", skip_all, err)
    )]
    pub async fn execute(&self, input: SendInviteInput) -> Result<SendInviteOutput, AccessError> {
        if input.role == Role::Owner {
            return Err(AccessError::Conflict(
                "An invitation cannot grant the owner role".to_owned(),
            ));
        }

        let (target_name, target_slug) =
            super::resolve_target(&self.store, input.scope, input.target_id).await?;

        // invitee must not already hold a membership at the target
        let existing = match input.scope {
            InviteScope::Organization => self
                .store
                .organization_membership_by_email(input.target_id, &input.email)
                .await?
                .is_some(),
            InviteScope::Workspace => self
                .store
                .workspace_membership_by_email(input.target_id, &input.email)
                .await?
                .is_some(),
        };
        if existing {
            return Err(AccessError::Conflict(
                "User is already a member".to_owned(),
            ));
        }

        let now = self.clock.now();

        // friendly pre-check; create_invite enforces the same rule
        // atomically and is the authority under concurrency
        let pending = self
            .store
            .pending_invites(input.scope, input.target_id, &input.email)
            .await?;
        if pending.iter().any(|i| !i.is_expired_at(now)) {
            return Err(AccessError::Conflict(
                "An active invitation already exists for this email".to_owned(),
            ));
        }

        let token = generate_token(self.config.token_length);
        let token_hash = hash_invite_token(&token, self.config.hash_cost)?;
        let expires_at = now + Duration::days(self.config.expiry_days);

        let invite = self
            .store
            .create_invite(
                CreateInvite {
                    scope: input.scope,
                    target_id: input.target_id,
                    email: input.email,
                    role: input.role,
                    token_hash,
                    invited_by: input.invited_by,
                    expires_at,
                },
                now,
            )
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
                action: "invite.sent",
                entity_type: entity_type(invite.scope),
                entity_id: invite.id,
                actor_id: invite.invited_by,
                details: serde_json::json!({
                    "target_id": invite.target_id,
                    "email": invite.email,
                    "role": invite.role.as_str(),
                }),
                at: now,
            },
        )
        .await;

        log::info!(
            target: "terrace",
            "msg=\"invite created\", scope={}, target_id={}, invite_id={}, email=\"{}\"",
            invite.scope.as_str(),
            invite.target_id,
            invite.id,
            invite.email
        );

        Ok(SendInviteOutput { invite, token })
    }
}

pub(crate) fn entity_type(scope: InviteScope) -> &'static str {
    match scope {
        InviteScope::Organization => "organization_invite",
        InviteScope::Workspace => "workspace_invite",
    }
}
