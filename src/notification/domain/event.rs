//! Append-only delivery events.

use super::{Channel, EventId, MessageId, ParseDomainValueError};
use crate::provider::domain::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of recorded delivery event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    /// A channel attempt succeeded.
    AttemptSucceeded,
    /// A channel attempt failed.
    AttemptFailed,
    /// The provider confirmed final delivery.
    WebhookDelivered,
    /// The provider reported a delivery failure after acceptance.
    WebhookFailed,
    /// The provider reported a bounce.
    WebhookBounced,
    /// The provider reported that the recipient opened the message.
    WebhookOpened,
}

impl EventType {
    /// Returns the canonical dotted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AttemptSucceeded => "attempt.succeeded",
            Self::AttemptFailed => "attempt.failed",
            Self::WebhookDelivered => "webhook.delivered",
            Self::WebhookFailed => "webhook.failed",
            Self::WebhookBounced => "webhook.bounced",
            Self::WebhookOpened => "webhook.opened",
        }
    }

    /// Returns `true` for events emitted by the attempt processor.
    #[must_use]
    pub const fn is_attempt_outcome(self) -> bool {
        matches!(self, Self::AttemptSucceeded | Self::AttemptFailed)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EventType {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "attempt.succeeded" => Ok(Self::AttemptSucceeded),
            "attempt.failed" => Ok(Self::AttemptFailed),
            "webhook.delivered" => Ok(Self::WebhookDelivered),
            "webhook.failed" => Ok(Self::WebhookFailed),
            "webhook.bounced" => Ok(Self::WebhookBounced),
            "webhook.opened" => Ok(Self::WebhookOpened),
            _ => Err(ParseDomainValueError::new("event type", value)),
        }
    }
}

impl TryFrom<String> for EventType {
    type Error = ParseDomainValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_owned()
    }
}

/// Immutable record of a state transition or provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    id: EventId,
    message_id: MessageId,
    event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEventData {
    /// Persisted identifier.
    pub id: EventId,
    /// Owning message.
    pub message_id: MessageId,
    /// Event kind.
    pub event_type: EventType,
    /// Channel, when the event concerns one.
    pub channel: Option<Channel>,
    /// Provider, when the event concerns one.
    pub provider: Option<ProviderKind>,
    /// Opaque payload.
    pub payload: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl DeliveryEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(message_id: MessageId, event_type: EventType, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            message_id,
            event_type,
            channel: None,
            provider: None,
            payload: None,
            created_at,
        }
    }

    /// Sets the channel and provider the event concerns.
    #[must_use]
    pub const fn for_provider(mut self, provider: ProviderKind) -> Self {
        self.channel = Some(provider.channel());
        self.provider = Some(provider);
        self
    }

    /// Sets the channel the event concerns.
    #[must_use]
    pub const fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Attaches an opaque payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Reconstructs an event from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedEventData) -> Self {
        Self {
            id: data.id,
            message_id: data.message_id,
            event_type: data.event_type,
            channel: data.channel,
            provider: data.provider,
            payload: data.payload,
            created_at: data.created_at,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the owning message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Returns the channel, if any.
    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        self.channel
    }

    /// Returns the provider, if any.
    #[must_use]
    pub const fn provider(&self) -> Option<ProviderKind> {
        self.provider
    }

    /// Returns the opaque payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
