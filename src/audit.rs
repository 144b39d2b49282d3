//! Best-effort audit trail boundary.
//!
//! Actions record an [`AuditEntry`] after their primary write succeeds. The
//! sink is fire-and-forget: a failing sink is logged and never rolls back
//! or fails the operation that produced the entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AccessError;

/// A single audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Dot-separated action name, e.g. `invite.accepted`.
    pub action: &'static str,
    /// Kind of entity the action touched, e.g. `organization_invite`.
    pub entity_type: &'static str,
    /// Id of the touched entity.
    pub entity_id: i64,
    /// User who performed the action.
    pub actor_id: i64,
    /// Free-form structured context.
    pub details: serde_json::Value,
    /// When the action happened.
    pub at: DateTime<Utc>,
}

/// Receiver for audit records.
///
/// Implementations typically append to an audit-log table or ship entries
/// to an external collector. Callers must treat `record` as best-effort;
/// see [`record_best_effort`].
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one audit entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), AccessError>;
}

/// Records an entry, logging and swallowing any sink failure.
pub async fn record_best_effort<A: AuditSink>(sink: &A, entry: AuditEntry) {
    let action = entry.action;
    if let Err(e) = sink.record(entry).await {
        log::warn!(
            target: "terrace",
            "msg=\"audit record failed\", action=\"{action}\", error=\"{e}\""
        );
    }
}

/// Logs every audit entry via the `log` crate.
pub struct LogAuditSink {
    level: log::Level,
}

impl LogAuditSink {
    /// Creates a sink logging at INFO level.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    /// Creates a sink logging at the specified level.
    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), AccessError> {
        log::log!(
            target: "terrace::audit",
            self.level,
            "action={} entity={}:{} actor={} details={}",
            entry.action,
            entry.entity_type,
            entry.entity_id,
            entry.actor_id,
            entry.details
        );
        Ok(())
    }
}

/// Collects entries in memory for assertions. Clones share the buffer.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone)]
pub struct RecordingAuditSink {
    entries: std::sync::Arc<std::sync::Mutex<Vec<AuditEntry>>>,
}

#[cfg(any(test, feature = "mocks"))]
impl RecordingAuditSink {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Returns a snapshot of every entry recorded so far.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Default for RecordingAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mocks"))]
#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), AccessError> {
        self.entries
            .lock()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?
            .push(entry);
        Ok(())
    }
}
