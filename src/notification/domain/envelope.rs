//! Envelope value objects: the canonical shape of one notification request.
//!
//! [`RawEnvelope`] mirrors the wire format and accepts anything that parses.
//! [`Envelope`] is only produced by the validator and is immutable afterwards.

use super::{Channel, IdempotencyKey, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-channel identity of a sender or recipient.
///
/// Every field is optional; a provider only reads the fields relevant to its
/// channel and rejects the envelope if none of them are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number in E.164 format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// WhatsApp number in E.164 format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    /// Push platform endpoint identifier (for example an SNS endpoint ARN).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_endpoint: Option<String>,
    /// Slack channel or user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<String>,
    /// Telegram chat identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    /// Webhook URL for web delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Returns the trimmed field value, treating blank strings as absent.
fn present(field: Option<&String>) -> Option<&str> {
    field.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl Identity {
    /// Creates an empty identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the WhatsApp number.
    #[must_use]
    pub fn with_whatsapp(mut self, number: impl Into<String>) -> Self {
        self.whatsapp = Some(number.into());
        self
    }

    /// Sets the push endpoint.
    #[must_use]
    pub fn with_push_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.push_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the Slack channel.
    #[must_use]
    pub fn with_slack_channel(mut self, channel: impl Into<String>) -> Self {
        self.slack_channel = Some(channel.into());
        self
    }

    /// Sets the Telegram chat identifier.
    #[must_use]
    pub fn with_telegram_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.telegram_chat_id = Some(chat_id.into());
        self
    }

    /// Sets the webhook URL.
    #[must_use]
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Returns the display name, if non-blank.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        present(self.name.as_ref())
    }

    /// Returns the email address, if non-blank.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        present(self.email.as_ref())
    }

    /// Returns the phone number, if non-blank.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        present(self.phone.as_ref())
    }

    /// Returns the WhatsApp number, falling back to the phone number.
    #[must_use]
    pub fn whatsapp(&self) -> Option<&str> {
        present(self.whatsapp.as_ref()).or_else(|| self.phone())
    }

    /// Returns the push endpoint, if non-blank.
    #[must_use]
    pub fn push_endpoint(&self) -> Option<&str> {
        present(self.push_endpoint.as_ref())
    }

    /// Returns the Slack channel, if non-blank.
    #[must_use]
    pub fn slack_channel(&self) -> Option<&str> {
        present(self.slack_channel.as_ref())
    }

    /// Returns the Telegram chat identifier, if non-blank.
    #[must_use]
    pub fn telegram_chat_id(&self) -> Option<&str> {
        present(self.telegram_chat_id.as_ref())
    }

    /// Returns the webhook URL, if non-blank.
    #[must_use]
    pub fn webhook_url(&self) -> Option<&str> {
        present(self.webhook_url.as_ref())
    }
}

/// Wire form of the recipient field: a single identity or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    /// A single recipient.
    One(Identity),
    /// An ordered list of recipients.
    Many(Vec<Identity>),
}

impl Recipients {
    /// Flattens the recipients into an ordered list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Identity> {
        match self {
            Self::One(identity) => vec![identity],
            Self::Many(identities) => identities,
        }
    }
}

/// Channel-agnostic notification content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Optional title, used as the email subject or message heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Plain-text body. Required.
    #[serde(default)]
    pub text: String,
    /// Optional HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Payload {
    /// Creates a payload with the given text body.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
            html: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

/// Per-channel payload tweaks applied on top of the base payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadOverride {
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Replacement HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Unvalidated envelope as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    /// Caller-supplied idempotency key.
    #[serde(default)]
    pub idempotency_key: String,
    /// Sender identity.
    #[serde(default)]
    pub sender: Identity,
    /// One or more recipients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipients>,
    /// Requested channel tags, in fan-out order.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Notification content.
    #[serde(default)]
    pub payload: Payload,
    /// Per-channel payload overrides keyed by channel tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub channel_overrides: BTreeMap<String, PayloadOverride>,
    /// Optional delivery instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_at: Option<DateTime<Utc>>,
    /// Optional priority tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl RawEnvelope {
    /// Creates a raw envelope with the required key and text body.
    #[must_use]
    pub fn new(idempotency_key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            payload: Payload::text(text),
            ..Self::default()
        }
    }

    /// Sets the channel tags.
    #[must_use]
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sender identity.
    #[must_use]
    pub fn with_sender(mut self, sender: Identity) -> Self {
        self.sender = sender;
        self
    }

    /// Sets a single recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: Identity) -> Self {
        self.recipient = Some(Recipients::One(recipient));
        self
    }

    /// Sets an ordered recipient list.
    #[must_use]
    pub fn with_recipients(mut self, recipients: impl IntoIterator<Item = Identity>) -> Self {
        self.recipient = Some(Recipients::Many(recipients.into_iter().collect()));
        self
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Adds an override for a channel tag.
    #[must_use]
    pub fn with_override(mut self, channel: impl Into<String>, value: PayloadOverride) -> Self {
        self.channel_overrides.insert(channel.into(), value);
        self
    }

    /// Sets the scheduled delivery instant.
    #[must_use]
    pub const fn with_schedule_at(mut self, at: DateTime<Utc>) -> Self {
        self.schedule_at = Some(at);
        self
    }

    /// Sets the priority tag.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

/// Validated, immutable envelope.
///
/// Instances are produced by the envelope validator and stored verbatim on
/// the message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    idempotency_key: IdempotencyKey,
    sender: Identity,
    #[serde(rename = "recipient")]
    recipients: Vec<Identity>,
    channels: Vec<Channel>,
    payload: Payload,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    channel_overrides: BTreeMap<Channel, PayloadOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule_at: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: Priority,
}

/// Parameter object for assembling a validated envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnvelopeParts {
    pub idempotency_key: IdempotencyKey,
    pub sender: Identity,
    pub recipients: Vec<Identity>,
    pub channels: Vec<Channel>,
    pub payload: Payload,
    pub channel_overrides: BTreeMap<Channel, PayloadOverride>,
    pub schedule_at: Option<DateTime<Utc>>,
    pub priority: Priority,
}

impl Envelope {
    pub(crate) fn from_parts(parts: EnvelopeParts) -> Self {
        Self {
            idempotency_key: parts.idempotency_key,
            sender: parts.sender,
            recipients: parts.recipients,
            channels: parts.channels,
            payload: parts.payload,
            channel_overrides: parts.channel_overrides,
            schedule_at: parts.schedule_at,
            priority: parts.priority,
        }
    }

    /// Returns the idempotency key.
    #[must_use]
    pub const fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    /// Returns the sender identity.
    #[must_use]
    pub const fn sender(&self) -> &Identity {
        &self.sender
    }

    /// Returns the recipients in submission order.
    #[must_use]
    pub fn recipients(&self) -> &[Identity] {
        &self.recipients
    }

    /// Returns the requested channels in fan-out order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Returns the base payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the per-channel overrides.
    #[must_use]
    pub const fn channel_overrides(&self) -> &BTreeMap<Channel, PayloadOverride> {
        &self.channel_overrides
    }

    /// Returns the scheduled delivery instant, if any.
    #[must_use]
    pub const fn schedule_at(&self) -> Option<DateTime<Utc>> {
        self.schedule_at
    }

    /// Returns the dispatch priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the payload for a channel with its override applied.
    #[must_use]
    pub fn payload_for(&self, channel: Channel) -> Payload {
        let mut payload = self.payload.clone();
        if let Some(tweak) = self.channel_overrides.get(&channel) {
            if let Some(title) = &tweak.title {
                payload.title = Some(title.clone());
            }
            if let Some(text) = &tweak.text {
                payload.text.clone_from(text);
            }
            if let Some(html) = &tweak.html {
                payload.html = Some(html.clone());
            }
        }
        payload
    }
}
