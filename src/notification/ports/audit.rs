//! Audit sink port.
//!
//! The compliance subsystem is an external collaborator. The delivery core
//! only reports significant transitions to it; it never waits on or reacts to
//! the sink.

use crate::notification::domain::{AttemptStatus, Channel, EventType, MessageId, MessageStatus};
use crate::provider::domain::ProviderKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A significant transition reported to the audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    /// A new message was accepted.
    MessageAccepted {
        /// Number of channel jobs requested.
        channels: usize,
    },
    /// The aggregate status changed.
    StatusChanged {
        /// Previous status.
        from: MessageStatus,
        /// New status.
        to: MessageStatus,
    },
    /// A channel attempt reached a terminal status.
    AttemptFinished {
        /// Channel of the attempt.
        channel: Channel,
        /// Provider used.
        provider: ProviderKind,
        /// Terminal status.
        status: AttemptStatus,
    },
    /// A provider callback was recorded.
    CallbackRecorded {
        /// Recorded event kind.
        event_type: EventType,
    },
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// Message the transition concerns.
    pub message_id: MessageId,
    /// What happened.
    #[serde(flatten)]
    pub action: AuditAction,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an audit entry.
    #[must_use]
    pub const fn new(message_id: MessageId, action: AuditAction, at: DateTime<Utc>) -> Self {
        Self {
            message_id,
            action,
            at,
        }
    }
}

/// Receiver for audit entries. Implementations must not fail the caller.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an audit entry.
    async fn record(&self, entry: AuditEntry);
}
