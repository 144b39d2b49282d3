//! One action per invite operation.
//!
//! Tokens are stored only as salted bcrypt hashes, so acceptance cannot
//! look an invite up by token. Every redeeming action instead loads the
//! pending invites for `(scope, target, email)` and verifies the presented
//! token against each candidate; the shared matching lives in
//! [`match_pending_invite`].

mod accept;
mod preview;
mod reject;
mod resend;
mod revoke;
mod send;

pub use accept::AcceptInviteAction;
pub use preview::{InvitePreview, PreviewInviteAction};
pub use reject::RejectInviteAction;
pub use resend::{ResendInviteAction, ResendInviteOutput};
pub use revoke::RevokeInviteAction;
pub use send::{SendInviteAction, SendInviteInput, SendInviteOutput};

use chrono::{DateTime, Utc};

use super::repository::InviteRepository;
use super::types::{Invite, InviteScope};
use crate::crypto::verify_invite_token;
use crate::secret::SecretString;
use crate::tenancy::{OrganizationRepository, WorkspaceRepository};
use crate::AccessError;

/// Finds the pending invite the presented token redeems.
///
/// Verifies the raw token against every pending candidate for the triple.
/// A token whose only match is past its expiry yields `Expired`; a token
/// matching nothing yields `InvalidToken`. The caller supplies `now` from
/// its injected clock.
pub(crate) async fn match_pending_invite<R>(
    repo: &R,
    scope: InviteScope,
    target_id: i64,
    email: &str,
    token: &SecretString,
    now: DateTime<Utc>,
) -> Result<Invite, AccessError>
where
    R: InviteRepository,
{
    let candidates = repo.pending_invites(scope, target_id, email).await?;
    let raw = token.expose_secret();

    let mut matched_expired = false;
    for invite in candidates {
        if !verify_invite_token(raw, &invite.token_hash) {
            continue;
        }
        if invite.is_expired_at(now) {
            matched_expired = true;
            continue;
        }
        return Ok(invite);
    }

    if matched_expired {
        Err(AccessError::Expired)
    } else {
        Err(AccessError::InvalidToken)
    }
}

/// Name and slug of an invite's target, for email payloads and previews.
pub(crate) async fn resolve_target<S>(
    store: &S,
    scope: InviteScope,
    target_id: i64,
) -> Result<(String, String), AccessError>
where
    S: OrganizationRepository + WorkspaceRepository,
{
    match scope {
        InviteScope::Organization => {
            let org = store
                .organization_by_id(target_id)
                .await?
                .ok_or(AccessError::NotFound)?;
            Ok((org.name, org.slug))
        }
        InviteScope::Workspace => {
            let ws = store
                .workspace_by_id(target_id)
                .await?
                .ok_or(AccessError::NotFound)?;
            Ok((ws.name, ws.slug))
        }
    }
}
