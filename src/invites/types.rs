//! Core types for the invitation lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenancy::Role;

/// Which level of the hierarchy an invite grants membership in.
///
/// Organization and workspace invites are structurally identical; the scope
/// plus `target_id` names the resource the invitee joins on acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteScope {
    Organization,
    Workspace,
}

impl InviteScope {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "ORGANIZATION",
            Self::Workspace => "WORKSPACE",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORGANIZATION" => Some(Self::Organization),
            "WORKSPACE" => Some(Self::Workspace),
            _ => None,
        }
    }
}

/// Lifecycle state of an invite.
///
/// `Pending` is the only state a token can be redeemed from, and the only
/// one that does not outlive further transitions: `Accepted` and `Revoked`
/// are terminal, while `Rejected` may still be resent or revoked. Expiry is
/// not a status; an expired invite stays `Pending` forever and usability is
/// judged against [`Invite::expires_at`] at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Revoked,
    Rejected,
}

impl InviteStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Revoked => "REVOKED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "REVOKED" => Some(Self::Revoked),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// An invitation for a user to join an organization or workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    /// Unique identifier.
    pub id: i64,
    /// Level of the hierarchy this invite grants membership in.
    pub scope: InviteScope,
    /// Id of the organization or workspace being invited to.
    pub target_id: i64,
    /// Email of the invitee.
    pub email: String,
    /// Role to assign when accepted.
    pub role: Role,
    /// bcrypt hash of the invitation token. The raw token is never stored.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Lifecycle state.
    pub status: InviteStatus,
    /// User who sent the invitation.
    pub invited_by: i64,
    /// When the invitation stops being acceptable.
    pub expires_at: DateTime<Utc>,
    /// When the invitation was accepted, if it was.
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the invitation was created.
    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// Check whether the invitation is expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Check whether the invitation can still be redeemed at the given
    /// instant: status `Pending` and not expired.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InviteStatus::Pending && !self.is_expired_at(now)
    }

    /// Check whether the invitation has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.status == InviteStatus::Accepted
    }
}
