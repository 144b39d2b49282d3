//! Storage abstraction for invites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{Invite, InviteScope, InviteStatus};
use crate::tenancy::Role;
use crate::AccessError;

#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub scope: InviteScope,
    pub target_id: i64,
    pub email: String,
    pub role: Role,
    pub token_hash: String,
    pub invited_by: i64,
    pub expires_at: DateTime<Utc>,
}

/// Invite rows are append-only: they are created once and change status,
/// token hash and expiry in place, but are never deleted.
#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Creates a `Pending` invite.
    ///
    /// MUST fail `Conflict` if a `Pending` invite that is unexpired at
    /// `now` already exists for the same `(scope, target_id, email)`, and
    /// the check-and-insert must be atomic: two concurrent sends for the
    /// same triple may not both succeed. SQL backends get this from a
    /// partial unique index on `(scope, target_id, email)` filtered to
    /// `status = 'PENDING'`.
    async fn create_invite(
        &self,
        data: CreateInvite,
        now: DateTime<Utc>,
    ) -> Result<Invite, AccessError>;

    async fn invite_by_id(&self, id: i64) -> Result<Option<Invite>, AccessError>;

    /// All `Pending` invites for `(scope, target_id, email)`, regardless of
    /// expiry; the caller applies its clock. Expired invites keep status
    /// `Pending` forever, so this may return rows that are no longer
    /// usable.
    async fn pending_invites(
        &self,
        scope: InviteScope,
        target_id: i64,
        email: &str,
    ) -> Result<Vec<Invite>, AccessError>;

    /// All invites for a target, optionally filtered by status.
    async fn invites_for_target(
        &self,
        scope: InviteScope,
        target_id: i64,
        status: Option<InviteStatus>,
    ) -> Result<Vec<Invite>, AccessError>;

    /// Replaces the token hash and expiry and resets status to `Pending`.
    /// Used by resend; fails `NotFound` if the invite does not exist.
    async fn refresh_invite_token(
        &self,
        id: i64,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Invite, AccessError>;

    /// Sets the lifecycle status, and `accepted_at` when accepting. Fails
    /// `NotFound` if the invite does not exist.
    async fn set_invite_status(
        &self,
        id: i64,
        status: InviteStatus,
        accepted_at: Option<DateTime<Utc>>,
    ) -> Result<(), AccessError>;
}
