//! Channel jobs and their identifiers.

use crate::notification::domain::{Channel, Envelope, MessageId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name under which channel delivery jobs are queued.
pub const CHANNEL_JOB_NAME: &str = "deliver-channel";

/// Queue-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of one per-channel delivery job.
///
/// The envelope travels with the job so that processing never has to
/// re-read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelJob {
    /// Message being delivered.
    pub message_id: MessageId,
    /// Channel this job delivers to.
    pub channel: Channel,
    /// Validated envelope.
    pub envelope: Envelope,
}

impl ChannelJob {
    /// Creates a channel job.
    #[must_use]
    pub const fn new(message_id: MessageId, channel: Channel, envelope: Envelope) -> Self {
        Self {
            message_id,
            channel,
            envelope,
        }
    }
}

/// A job handed to the processor together with its retry position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    /// Job payload.
    pub job: ChannelJob,
    /// One-based number of this run.
    pub attempt_number: u32,
    /// Runs allowed before the queue gives up.
    pub max_attempts: u32,
}

impl JobContext {
    /// Returns `true` when no retry will follow a failure of this run.
    #[must_use]
    pub const fn is_final_attempt(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}
