//! Closed set of provider integrations.

use crate::notification::domain::{Channel, ParseDomainValueError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete provider integration. Each kind serves exactly one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// AWS SES v2 email.
    Ses,
    /// AWS SNS mobile push to an endpoint ARN.
    SnsPush,
    /// Twilio programmable SMS.
    TwilioSms,
    /// Twilio WhatsApp messaging.
    TwilioWhatsapp,
    /// Telegram Bot API.
    Telegram,
    /// Slack Web API.
    Slack,
    /// Generic signed webhook.
    Webhook,
}

impl ProviderKind {
    /// Every provider kind.
    pub const ALL: [Self; 7] = [
        Self::Ses,
        Self::SnsPush,
        Self::TwilioSms,
        Self::TwilioWhatsapp,
        Self::Telegram,
        Self::Slack,
        Self::Webhook,
    ];

    /// Returns the canonical tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ses => "ses",
            Self::SnsPush => "sns_push",
            Self::TwilioSms => "twilio_sms",
            Self::TwilioWhatsapp => "twilio_whatsapp",
            Self::Telegram => "telegram",
            Self::Slack => "slack",
            Self::Webhook => "webhook",
        }
    }

    /// Returns the channel this provider serves.
    #[must_use]
    pub const fn channel(self) -> Channel {
        match self {
            Self::Ses => Channel::Email,
            Self::SnsPush => Channel::Push,
            Self::TwilioSms => Channel::Sms,
            Self::TwilioWhatsapp => Channel::Whatsapp,
            Self::Telegram => Channel::Telegram,
            Self::Slack => Channel::Slack,
            Self::Webhook => Channel::Web,
        }
    }

    /// Returns the provider used for a channel when configuration does not
    /// name one.
    #[must_use]
    pub const fn default_for(channel: Channel) -> Self {
        match channel {
            Channel::Email => Self::Ses,
            Channel::Push => Self::SnsPush,
            Channel::Sms => Self::TwilioSms,
            Channel::Whatsapp => Self::TwilioWhatsapp,
            Channel::Telegram => Self::Telegram,
            Channel::Slack => Self::Slack,
            Channel::Web => Self::Webhook,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("provider kind", value))
    }
}
