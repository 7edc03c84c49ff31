//! Slack Web API provider.

use super::common::{RequestOutcome, deliver_all, http_rejection, join_url, json_string};
use crate::notification::domain::{Channel, Envelope, FailureDetail};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderConfigurationError,
        ProviderError, ProviderKind, ProviderResponse, SlackSettings, WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Posts messages with `chat.postMessage`.
///
/// Slack answers HTTP 200 for most failures and reports them as
/// `{"ok": false, "error": "..."}`.
pub struct SlackProvider {
    settings: SlackSettings,
    api_base: Url,
    transport: Arc<dyn HttpTransport>,
}

impl SlackProvider {
    /// Creates the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when the bot token is blank or
    /// the API base is not a valid URL.
    pub fn new(
        settings: SlackSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderConfigurationError> {
        super::require(ProviderKind::Slack, "bot_token", &settings.bot_token)?;
        let api_base = super::parse_endpoint(
            ProviderKind::Slack,
            settings.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
        )?;
        Ok(Self {
            settings,
            api_base,
            transport,
        })
    }

    fn interpret(response: &HttpResponse) -> RequestOutcome {
        let body = response.json().unwrap_or(Value::Null);
        if !response.is_success() {
            let error = json_string(&body, "error");
            return RequestOutcome::Rejected(http_rejection(response, error.as_deref()));
        }
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            return RequestOutcome::Accepted {
                external_id: json_string(&body, "ts"),
            };
        }
        let code = json_string(&body, "error").unwrap_or_else(|| "unknown_error".to_owned());
        RequestOutcome::Rejected(FailureDetail::new(
            format!("slack_{code}"),
            format!("chat.postMessage failed: {code}"),
        ))
    }
}

#[async_trait]
impl ChannelProvider for SlackProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Slack
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        if envelope
            .recipients()
            .iter()
            .all(|recipient| recipient.slack_channel().is_none())
        {
            return Err(ProviderError::NoEligibleRecipient {
                channel: Channel::Slack,
                field: "slackChannel",
            });
        }
        Ok(())
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let payload = envelope.payload_for(Channel::Slack);

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.slack_channel())
            .map(|channel| {
                let document = match &payload.title {
                    Some(title) => json!({
                        "channel": channel,
                        "text": format!("{title}\n{}", payload.text),
                        "blocks": [
                            { "type": "header", "text": { "type": "plain_text", "text": title } },
                            { "type": "section", "text": { "type": "mrkdwn", "text": payload.text } },
                        ],
                    }),
                    None => json!({ "channel": channel, "text": payload.text }),
                };
                PreparedRequest::new(channel, WireBody::Json(document))
            })
            .collect();
        Ok(PreparedMessage::new(ProviderKind::Slack, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let url = join_url(&self.api_base, "chat.postMessage");
        let bearer = format!("Bearer {}", self.settings.bot_token);
        let build = |request: &PreparedRequest| {
            let base = HttpRequest::post(url.as_str()).with_header("Authorization", bearer.as_str());
            match &request.body {
                WireBody::Json(document) => base.with_body(
                    "application/json; charset=utf-8",
                    document.to_string(),
                ),
                WireBody::Form(pairs) => base.with_form(pairs),
            }
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }
}
