//! Generic JSON webhook provider for the web channel.

use super::common::{RequestOutcome, deliver_all, http_rejection, json_string};
use super::signing::hmac_sha256_hex;
use crate::notification::domain::{Channel, Envelope};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderError, ProviderKind,
        ProviderResponse, WebhookSettings, WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

/// POSTs the notification as JSON to each recipient's webhook URL.
///
/// When a signing secret is configured the body is signed with
/// HMAC-SHA256 and sent as `sha256=<hex>` in the signature header.
pub struct WebhookProvider {
    settings: WebhookSettings,
    transport: Arc<dyn HttpTransport>,
}

impl WebhookProvider {
    /// Creates the provider. Webhooks need no credentials.
    #[must_use]
    pub fn new(settings: WebhookSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    fn check_url(raw: &str) -> Result<(), ProviderError> {
        let parsed = Url::parse(raw).map_err(|err| ProviderError::InvalidRecipient {
            value: raw.to_owned(),
            reason: err.to_string(),
        })?;
        if matches!(parsed.scheme(), "http" | "https") {
            Ok(())
        } else {
            Err(ProviderError::InvalidRecipient {
                value: raw.to_owned(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            })
        }
    }

    fn interpret(response: &HttpResponse) -> RequestOutcome {
        let body = response.json().unwrap_or(Value::Null);
        if response.is_success() {
            return RequestOutcome::Accepted {
                external_id: json_string(&body, "id"),
            };
        }
        let message = json_string(&body, "error").or_else(|| json_string(&body, "message"));
        RequestOutcome::Rejected(http_rejection(response, message.as_deref()))
    }
}

#[async_trait]
impl ChannelProvider for WebhookProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Webhook
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        let mut urls = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.webhook_url())
            .peekable();
        if urls.peek().is_none() {
            return Err(ProviderError::NoEligibleRecipient {
                channel: Channel::Web,
                field: "webhookUrl",
            });
        }
        urls.try_for_each(Self::check_url)
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let payload = envelope.payload_for(Channel::Web);
        let document = json!({
            "idempotencyKey": envelope.idempotency_key().as_str(),
            "channel": Channel::Web,
            "sender": envelope.sender(),
            "payload": payload,
            "priority": envelope.priority(),
            "scheduleAt": envelope.schedule_at(),
        });

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.webhook_url())
            .map(|url| PreparedRequest::new(url, WireBody::Json(document.clone())))
            .collect();
        Ok(PreparedMessage::new(ProviderKind::Webhook, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let build = |request: &PreparedRequest| {
            let base = HttpRequest::post(request.recipient.as_str());
            let encoded = match &request.body {
                WireBody::Json(document) => base.with_json(document),
                WireBody::Form(pairs) => base.with_form(pairs),
            };
            let signature = match (&self.settings.signing_secret, &encoded.body) {
                (Some(secret), Some(body)) => {
                    Some(hmac_sha256_hex(secret.as_bytes(), body.as_bytes()))
                }
                _ => None,
            };
            match signature {
                Some(hex) => encoded.with_header(
                    self.settings.signature_header.as_str(),
                    format!("sha256={hex}"),
                ),
                None => encoded,
            }
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }
}
