//! Telegram Bot API provider.

use super::common::{RequestOutcome, deliver_all, http_rejection, join_url, json_string};
use crate::notification::domain::{Channel, Envelope};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderConfigurationError,
        ProviderError, ProviderKind, ProviderResponse, TelegramSettings, WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// `sendMessage` text limit in UTF-16 code units.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Keeps whole characters of `text` while they fit in `limit` UTF-16 units.
fn truncate_utf16(text: &str, limit: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= limit
        })
        .collect()
}

/// Sends chat messages through a Telegram bot.
pub struct TelegramProvider {
    settings: TelegramSettings,
    api_base: Url,
    transport: Arc<dyn HttpTransport>,
}

impl TelegramProvider {
    /// Creates the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when the bot token is blank or
    /// the API base is not a valid URL.
    pub fn new(
        settings: TelegramSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderConfigurationError> {
        super::require(ProviderKind::Telegram, "bot_token", &settings.bot_token)?;
        let api_base = super::parse_endpoint(
            ProviderKind::Telegram,
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
        let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
        if response.is_success() && ok {
            let external_id = body
                .get("result")
                .and_then(|result| json_string(result, "message_id"));
            return RequestOutcome::Accepted { external_id };
        }
        let description = json_string(&body, "description");
        RequestOutcome::Rejected(http_rejection(response, description.as_deref()))
    }
}

#[async_trait]
impl ChannelProvider for TelegramProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Telegram
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        if envelope
            .recipients()
            .iter()
            .all(|recipient| recipient.telegram_chat_id().is_none())
        {
            return Err(ProviderError::NoEligibleRecipient {
                channel: Channel::Telegram,
                field: "telegramChatId",
            });
        }
        Ok(())
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let payload = envelope.payload_for(Channel::Telegram);
        let composed = match &payload.title {
            Some(title) => format!("{title}\n\n{}", payload.text),
            None => payload.text.clone(),
        };
        let text = truncate_utf16(&composed, TELEGRAM_MESSAGE_LIMIT);

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.telegram_chat_id())
            .map(|chat_id| {
                let mut document = json!({ "chat_id": chat_id, "text": text });
                if let (Some(mode), Some(fields)) =
                    (&self.settings.parse_mode, document.as_object_mut())
                {
                    fields.insert("parse_mode".to_owned(), json!(mode));
                }
                PreparedRequest::new(chat_id, WireBody::Json(document))
            })
            .collect();
        Ok(PreparedMessage::new(ProviderKind::Telegram, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let url = join_url(
            &self.api_base,
            &format!("bot{}/sendMessage", self.settings.bot_token),
        );
        let build = |request: &PreparedRequest| {
            let base = HttpRequest::post(url.as_str());
            match &request.body {
                WireBody::Json(document) => base.with_json(document),
                WireBody::Form(pairs) => base.with_form(pairs),
            }
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }
}
