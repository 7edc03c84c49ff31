//! Message aggregate root and its delivery status.

use super::{Envelope, IdempotencyKey, MessageId, ParseDomainValueError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Accepted but not yet handed to the queue.
    Pending,
    /// Channel jobs are queued and none has started.
    Queued,
    /// At least one channel has not reached a terminal attempt.
    Processing,
    /// Every channel succeeded.
    Delivered,
    /// Every channel failed.
    Failed,
    /// Channels finished with mixed outcomes.
    PartiallyDelivered,
}

impl MessageStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::PartiallyDelivered => "partially_delivered",
        }
    }

    /// Returns `true` for statuses that never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Failed | Self::PartiallyDelivered
        )
    }

    /// Position in the forward-only lifecycle.
    ///
    /// Status writes only ever increase the rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Queued => 1,
            Self::Processing => 2,
            Self::Delivered | Self::Failed | Self::PartiallyDelivered => 3,
        }
    }

    /// Returns `true` when moving from `self` to `next` respects the
    /// forward-only lifecycle.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "partially_delivered" => Ok(Self::PartiallyDelivered),
            _ => Err(ParseDomainValueError::new("message status", value)),
        }
    }
}

/// Durable record of one accepted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    idempotency_key: IdempotencyKey,
    envelope: Envelope,
    status: MessageStatus,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMessageData {
    /// Persisted identifier.
    pub id: MessageId,
    /// Persisted envelope.
    pub envelope: Envelope,
    /// Persisted status.
    pub status: MessageStatus,
    /// Optimistic concurrency token.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Creates a pending message for a validated envelope.
    #[must_use]
    pub fn accept(envelope: Envelope, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: MessageId::new(),
            idempotency_key: envelope.idempotency_key().clone(),
            envelope,
            status: MessageStatus::Pending,
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a message from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedMessageData) -> Self {
        Self {
            id: data.id,
            idempotency_key: data.envelope.idempotency_key().clone(),
            envelope: data.envelope,
            status: data.status,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the idempotency key.
    #[must_use]
    pub const fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    /// Returns the stored envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns the aggregate status.
    #[must_use]
    pub const fn status(&self) -> MessageStatus {
        self.status
    }

    /// Returns the optimistic concurrency token.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last status change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a status write that a repository accepted.
    ///
    /// Used by repository adapters after a successful compare-and-set.
    pub fn apply_status(&mut self, status: MessageStatus, at: DateTime<Utc>) {
        self.status = status;
        self.version += 1;
        self.updated_at = at;
    }
}
