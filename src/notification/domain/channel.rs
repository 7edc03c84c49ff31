//! Delivery channel and priority enumerations.

use super::ParseDomainValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A delivery medium. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email delivery.
    Email,
    /// SMS text message.
    Sms,
    /// Mobile push notification.
    Push,
    /// Web delivery through a webhook endpoint.
    Web,
    /// Slack workspace message.
    Slack,
    /// WhatsApp message.
    Whatsapp,
    /// Telegram bot message.
    Telegram,
}

impl Channel {
    /// Every supported channel, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Email,
        Self::Sms,
        Self::Push,
        Self::Web,
        Self::Slack,
        Self::Whatsapp,
        Self::Telegram,
    ];

    /// Returns the canonical tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::Web => "web",
            Self::Slack => "slack",
            Self::Whatsapp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Channel {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("channel", value))
    }
}

/// Dispatch priority of an envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Dispatched after normal and high priority work.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Dispatched first.
    High,
}

impl Priority {
    /// Returns the canonical tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            _ => Err(ParseDomainValueError::new("priority", value)),
        }
    }
}
