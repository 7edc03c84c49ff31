//! Audit sink adapters.

use crate::notification::ports::{AuditAction, AuditEntry, AuditSink};
use async_trait::async_trait;
use tracing::info;

/// Emits audit entries as structured `tracing` events on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        let message_id = entry.message_id.to_string();
        match &entry.action {
            AuditAction::MessageAccepted { channels } => info!(
                target: "audit",
                message_id,
                channels,
                at = %entry.at,
                "message accepted"
            ),
            AuditAction::StatusChanged { from, to } => info!(
                target: "audit",
                message_id,
                from = from.as_str(),
                to = to.as_str(),
                at = %entry.at,
                "status changed"
            ),
            AuditAction::AttemptFinished {
                channel,
                provider,
                status,
            } => info!(
                target: "audit",
                message_id,
                channel = channel.as_str(),
                provider = provider.as_str(),
                status = status.as_str(),
                at = %entry.at,
                "attempt finished"
            ),
            AuditAction::CallbackRecorded { event_type } => info!(
                target: "audit",
                message_id,
                event_type = event_type.as_str(),
                at = %entry.at,
                "callback recorded"
            ),
        }
    }
}

/// Discards every audit entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: AuditEntry) {}
}
