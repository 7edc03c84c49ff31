//! Explicit provider credentials and endpoints.
//!
//! Every value arrives through configuration; nothing is read from the
//! process environment.

use serde::{Deserialize, Serialize};

/// Credentials and region for AWS request signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsCredentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Optional session token for temporary credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// AWS region, e.g. `eu-west-1`.
    pub region: String,
}

/// AWS SES v2 settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SesSettings {
    /// Signing credentials.
    #[serde(flatten)]
    pub credentials: AwsCredentials,
    /// Sender address used when the envelope sender has no email.
    pub from_address: Option<String>,
    /// SES configuration set name.
    pub configuration_set: Option<String>,
    /// Endpoint override; defaults to the regional SES endpoint.
    pub endpoint: Option<String>,
}

/// AWS SNS settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnsSettings {
    /// Signing credentials.
    #[serde(flatten)]
    pub credentials: AwsCredentials,
    /// Endpoint override; defaults to the regional SNS endpoint.
    pub endpoint: Option<String>,
}

/// Twilio settings shared by SMS and WhatsApp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioSettings {
    /// Account SID, also the basic-auth user.
    pub account_sid: String,
    /// Auth token, also the basic-auth password.
    pub auth_token: String,
    /// SMS sender number used when the envelope sender has no phone.
    pub from_number: Option<String>,
    /// WhatsApp sender number used when the envelope sender has none.
    pub whatsapp_from: Option<String>,
    /// Messaging service SID, used instead of a sender number when set.
    pub messaging_service_sid: Option<String>,
    /// API base override.
    pub api_base: Option<String>,
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token.
    pub bot_token: String,
    /// Optional `parse_mode` (`HTML`, `MarkdownV2`).
    pub parse_mode: Option<String>,
    /// API base override.
    pub api_base: Option<String>,
}

/// Slack Web API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    /// Bot token sent as a bearer credential.
    pub bot_token: String,
    /// API base override.
    pub api_base: Option<String>,
}

/// Outbound webhook settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Shared secret for the HMAC-SHA256 body signature.
    pub signing_secret: Option<String>,
    /// Header carrying the signature.
    pub signature_header: String,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            signing_secret: None,
            signature_header: "X-Signature".to_owned(),
        }
    }
}

/// Settings for every provider. Absent sections leave the provider
/// unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// SES email.
    pub ses: Option<SesSettings>,
    /// SNS push.
    pub sns: Option<SnsSettings>,
    /// Twilio SMS and WhatsApp.
    pub twilio: Option<TwilioSettings>,
    /// Telegram.
    pub telegram: Option<TelegramSettings>,
    /// Slack.
    pub slack: Option<SlackSettings>,
    /// Webhook. Needs no credentials, so it is always present.
    pub webhook: WebhookSettings,
}

/// Outbound HTTP timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Timeout for provider send calls, in milliseconds.
    pub timeout_ms: u64,
    /// Timeout for on-demand status queries, in milliseconds.
    pub status_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            status_timeout_ms: 5_000,
        }
    }
}

impl HttpSettings {
    /// Returns the send timeout.
    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Returns the status query timeout.
    #[must_use]
    pub const fn status_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.status_timeout_ms)
    }
}
