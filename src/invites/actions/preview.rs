use crate::authz::Principal;
use crate::clock::Clock;
use crate::invites::{Invite, InviteRepository, InviteScope};
use crate::secret::SecretString;
use crate::tenancy::TenancyStore;
use crate::AccessError;

/// What an invite landing page needs to render before the user decides.
#[derive(Debug, Clone)]
pub struct InvitePreview {
    pub invite: Invite,
    /// Display name of the inviting organization or workspace.
    pub target_name: String,
    /// Slug of the inviting organization or workspace.
    pub target_slug: String,
}

/// Read-only variant of the accept/reject token matching.
///
/// Resolves the invite a token redeems without mutating anything, so the
/// landing page can show what is being offered before acceptance.
pub struct PreviewInviteAction<S, C>
where
    S: TenancyStore + InviteRepository,
    C: Clock,
{
    store: S,
    clock: C,
}

impl<S, C> PreviewInviteAction<S, C>
where
    S: TenancyStore + InviteRepository,
    C: Clock,
{
    /// Creates a new `PreviewInviteAction`.
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Resolves the invite the token redeems, plus its target's details.
    ///
    /// # Returns
    ///
    /// - `Ok(preview)` - The matched invite and target name/slug
    /// - `Err(AccessError::InvalidToken)` - Token matches no pending invite
    ///   for the principal's email at this target
    /// - `Err(AccessError::Expired)` - Token only matches an invite past
    ///   its expiry
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "preview_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope: InviteScope,
        target_id: i64,
        token: &SecretString,
        principal: &Principal,
    ) -> Result<InvitePreview, AccessError> {
        let invite = super::match_pending_invite(
            &self.store,
            scope,
            target_id,
            &principal.email,
            token,
            self.clock.now(),
        )
        .await?;

        let (target_name, target_slug) =
            super::resolve_target(&self.store, scope, target_id).await?;

        Ok(InvitePreview {
            invite,
            target_name,
            target_slug,
        })
    }
}
