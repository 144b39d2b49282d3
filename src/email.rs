//! Outbound invite email boundary.
//!
//! Invite emails are enqueued fire-and-forget onto an external queue; the
//! queue owns delivery, retry and template rendering. A failing dispatcher
//! is logged and never fails the invite operation that triggered it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::invites::InviteScope;
use crate::secret::SecretString;
use crate::AccessError;

/// Payload for an invitation email.
///
/// Carries the raw token so the mailer can build the accept link; the
/// token is wrapped in [`SecretString`] and never appears in `Debug`
/// output or logs.
#[derive(Debug, Clone)]
pub struct InviteEmail {
    /// Whether this invites into an organization or a workspace.
    pub scope: InviteScope,
    /// Recipient address.
    pub to: String,
    /// Display name of the inviting organization or workspace.
    pub target_name: String,
    /// Slug of the inviting organization or workspace, for link building.
    pub target_slug: String,
    /// Id of the target resource.
    pub target_id: i64,
    /// User who sent the invite.
    pub inviter_id: i64,
    /// The raw invite token, exposed only here and never stored.
    pub token: SecretString,
    /// When the invite stops being acceptable.
    pub expires_at: DateTime<Utc>,
}

/// Hand-off point to the email queue.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Enqueue one invite email for delivery.
    async fn enqueue(&self, email: InviteEmail) -> Result<(), AccessError>;
}

/// Enqueues an email, logging and swallowing any dispatcher failure.
pub async fn enqueue_best_effort<E: EmailDispatcher>(dispatcher: &E, email: InviteEmail) {
    let to = email.to.clone();
    if let Err(e) = dispatcher.enqueue(email).await {
        log::warn!(
            target: "terrace",
            "msg=\"invite email enqueue failed\", to=\"{to}\", error=\"{e}\""
        );
    }
}

/// Discards every email. Useful when no mailer is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmailDispatcher;

#[async_trait]
impl EmailDispatcher for NullEmailDispatcher {
    async fn enqueue(&self, email: InviteEmail) -> Result<(), AccessError> {
        log::debug!(
            target: "terrace",
            "msg=\"invite email discarded\", to=\"{}\", target_id={}",
            email.to,
            email.target_id
        );
        Ok(())
    }
}

/// Collects emails in memory for assertions. Clones share the buffer.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone)]
pub struct RecordingEmailDispatcher {
    sent: std::sync::Arc<std::sync::Mutex<Vec<InviteEmail>>>,
}

#[cfg(any(test, feature = "mocks"))]
impl RecordingEmailDispatcher {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Returns a snapshot of every email enqueued so far.
    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Default for RecordingEmailDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mocks"))]
#[async_trait]
impl EmailDispatcher for RecordingEmailDispatcher {
    async fn enqueue(&self, email: InviteEmail) -> Result<(), AccessError> {
        self.sent
            .lock()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?
            .push(email);
        Ok(())
    }
}
