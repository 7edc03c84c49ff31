//! Delivery attempts: one record per (message, channel).

use super::{AttemptId, AttemptTransitionError, Channel, MessageId, ParseDomainValueError};
use crate::provider::domain::ProviderKind;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Created but the provider has not been invoked.
    Pending,
    /// The provider is being invoked.
    Started,
    /// The provider accepted the message.
    Succeeded,
    /// The channel failed permanently.
    Failed,
}

impl AttemptStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` once the attempt can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AttemptStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseDomainValueError::new("attempt status", value)),
        }
    }
}

/// Machine-readable code plus description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Stable failure code (provider code or one of the processor codes).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl FailureDetail {
    /// Creates a failure detail.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Record of the provider invocation for one channel of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    id: AttemptId,
    message_id: MessageId,
    channel: Channel,
    provider: ProviderKind,
    status: AttemptStatus,
    error: Option<FailureDetail>,
    external_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAttemptData {
    /// Persisted identifier.
    pub id: AttemptId,
    /// Owning message.
    pub message_id: MessageId,
    /// Channel served by this attempt.
    pub channel: Channel,
    /// Provider used for the channel.
    pub provider: ProviderKind,
    /// Persisted status.
    pub status: AttemptStatus,
    /// Failure detail, when failed.
    pub error: Option<FailureDetail>,
    /// Provider-assigned identifier, when succeeded.
    pub external_id: Option<String>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    /// Creates a pending attempt.
    #[must_use]
    pub fn new(
        message_id: MessageId,
        channel: Channel,
        provider: ProviderKind,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            message_id,
            channel,
            provider,
            status: AttemptStatus::Pending,
            error: None,
            external_id: None,
            started_at: None,
            finished_at: None,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs an attempt from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAttemptData) -> Self {
        Self {
            id: data.id,
            message_id: data.message_id,
            channel: data.channel,
            provider: data.provider,
            status: data.status,
            error: data.error,
            external_id: data.external_id,
            started_at: data.started_at,
            finished_at: data.finished_at,
            created_at: data.created_at,
        }
    }

    /// Returns the attempt identifier.
    #[must_use]
    pub const fn id(&self) -> AttemptId {
        self.id
    }

    /// Returns the owning message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the channel.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns the provider kind.
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> AttemptStatus {
        self.status
    }

    /// Returns the failure detail, if failed.
    #[must_use]
    pub const fn error(&self) -> Option<&FailureDetail> {
        self.error.as_ref()
    }

    /// Returns the provider-assigned identifier, if succeeded.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Returns the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns the terminal timestamp.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns `true` once the attempt reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Marks the attempt as started. Restarting a started attempt on retry
    /// refreshes `started_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptTransitionError::AlreadyTerminal`] if the attempt has
    /// finished.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), AttemptTransitionError> {
        self.ensure_open()?;
        self.status = AttemptStatus::Started;
        self.started_at = Some(clock.utc());
        Ok(())
    }

    /// Marks the attempt as succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptTransitionError::AlreadyTerminal`] if the attempt has
    /// finished.
    pub fn succeed(
        &mut self,
        external_id: Option<String>,
        clock: &impl Clock,
    ) -> Result<(), AttemptTransitionError> {
        self.ensure_open()?;
        self.status = AttemptStatus::Succeeded;
        self.external_id = external_id;
        self.finish(clock);
        Ok(())
    }

    /// Marks the attempt as failed.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptTransitionError::AlreadyTerminal`] if the attempt has
    /// finished.
    pub fn fail(
        &mut self,
        error: FailureDetail,
        clock: &impl Clock,
    ) -> Result<(), AttemptTransitionError> {
        self.ensure_open()?;
        self.status = AttemptStatus::Failed;
        self.error = Some(error);
        self.finish(clock);
        Ok(())
    }

    const fn ensure_open(&self) -> Result<(), AttemptTransitionError> {
        if self.status.is_terminal() {
            return Err(AttemptTransitionError::AlreadyTerminal(self.id));
        }
        Ok(())
    }

    fn finish(&mut self, clock: &impl Clock) {
        let now = clock.utc();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.finished_at = Some(now);
    }
}
