//! The invitation lifecycle.
//!
//! An invite is a time-boxed, single-target token that grants a specific
//! role when accepted. Tokens are stored only as bcrypt hashes; the raw
//! token leaves the library exactly once, at send or resend time. Invites
//! are never physically deleted: every state transition is kept as an
//! append-only trail, which means an expired invite stays `Pending`
//! forever and usability must always be judged against `expires_at` too.

pub mod actions;
pub mod repository;
mod types;

pub use actions::{
    AcceptInviteAction, InvitePreview, PreviewInviteAction, RejectInviteAction,
    ResendInviteAction, ResendInviteOutput, RevokeInviteAction, SendInviteAction, SendInviteInput,
    SendInviteOutput,
};
pub use repository::{CreateInvite, InviteRepository};
pub use types::{Invite, InviteScope, InviteStatus};
