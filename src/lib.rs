//! Hierarchical multi-tenant authorization and membership.
//!
//! `terrace` models a fixed three-level tenancy hierarchy (Organization →
//! Workspace → Project), each level with its own membership table and role
//! set, and provides the three pieces every guarded endpoint builds on:
//!
//! - [`authz::RoleResolver`] decides whether a principal may act on a
//!   resource, including cross-level privilege inheritance (an organization
//!   owner or admin is implicitly authorized on everything beneath it).
//! - [`invites`] holds the invitation lifecycle: send, resend, revoke,
//!   accept, reject and preview, backed by hashed, expiring, single-use
//!   tokens.
//! - [`cascade::MembershipCascade`] keeps workspace memberships in sync
//!   when an organization role is granted, changed or removed.
//!
//! Storage is abstracted behind repository traits ([`tenancy::repository`],
//! [`invites::repository`]); implement them for your database, or enable the
//! `mocks` feature for the in-memory [`mocks::MemoryStore`] used by the test
//! suite. HTTP routing, email delivery and audit persistence live outside
//! this crate; see [`email::EmailDispatcher`] and [`audit::AuditSink`] for
//! the boundary traits they plug into.

pub mod audit;
pub mod authz;
pub mod cascade;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod email;
pub mod invites;
pub mod secret;
pub mod tenancy;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use authz::{Principal, Resource, ResourceRef, RoleResolver};
pub use clock::{Clock, SystemClock};
pub use config::InviteConfig;
pub use secret::SecretString;
pub use tenancy::{ProjectNature, Role};

use std::fmt;

/// Errors returned by authorization, membership and invitation operations.
///
/// `Forbidden` and `Unauthenticated` deliberately carry no detail about
/// which level of the hierarchy caused the denial; exposing that would let
/// callers enumerate memberships they cannot see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No authenticated principal was supplied by the caller.
    Unauthenticated,
    /// The addressed resource or invite does not exist.
    NotFound,
    /// The principal lacks the required membership or role.
    Forbidden,
    /// The operation conflicts with existing state (duplicate invite,
    /// duplicate membership, owner-protection rules).
    Conflict(String),
    /// The supplied invite token matches no usable invite, or the invite
    /// does not belong to the addressed resource.
    InvalidToken,
    /// The invite matching the supplied token is past its expiry.
    Expired,
    /// A storage or infrastructure failure.
    Internal(String),
}

impl std::error::Error for AccessError {}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::Unauthenticated => write!(f, "Unauthenticated"),
            AccessError::NotFound => write!(f, "Resource not found"),
            AccessError::Forbidden => {
                write!(f, "You do not have permission to perform this action")
            }
            AccessError::Conflict(msg) => write!(f, "{}", msg),
            AccessError::InvalidToken => write!(f, "Invalid or expired invitation token"),
            AccessError::Expired => write!(f, "Invitation has expired"),
            AccessError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}
