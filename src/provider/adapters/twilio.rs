//! Twilio Messages API provider for SMS and WhatsApp.

use super::common::{
    RequestOutcome, deliver_all, http_rejection, join_url, json_string, require_e164,
};
use crate::notification::domain::{Envelope, Identity};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderConfigurationError,
        ProviderError, ProviderKind, ProviderResponse, ProviderStatusReport, TwilioSettings,
        WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

const DEFAULT_API_BASE: &str = "https://api.twilio.com";
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Sends SMS or WhatsApp messages through Twilio.
///
/// One type serves both kinds; WhatsApp differs only in addressing.
pub struct TwilioProvider {
    kind: ProviderKind,
    settings: TwilioSettings,
    api_base: Url,
    transport: Arc<dyn HttpTransport>,
}

impl TwilioProvider {
    /// Creates the SMS provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when the account SID or auth
    /// token is blank, or the API base is not a valid URL.
    pub fn sms(
        settings: TwilioSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderConfigurationError> {
        Self::new(ProviderKind::TwilioSms, settings, transport)
    }

    /// Creates the WhatsApp provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when the account SID or auth
    /// token is blank, or the API base is not a valid URL.
    pub fn whatsapp(
        settings: TwilioSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderConfigurationError> {
        Self::new(ProviderKind::TwilioWhatsapp, settings, transport)
    }

    fn new(
        kind: ProviderKind,
        settings: TwilioSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderConfigurationError> {
        super::require(kind, "account_sid", &settings.account_sid)?;
        super::require(kind, "auth_token", &settings.auth_token)?;
        let api_base = super::parse_endpoint(
            kind,
            settings.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
        )?;
        Ok(Self {
            kind,
            settings,
            api_base,
            transport,
        })
    }

    const fn is_whatsapp(&self) -> bool {
        matches!(self.kind, ProviderKind::TwilioWhatsapp)
    }

    fn recipient_number<'a>(&self, identity: &'a Identity) -> Option<&'a str> {
        if self.is_whatsapp() {
            identity.whatsapp()
        } else {
            identity.phone()
        }
    }

    fn address(&self, number: &str) -> String {
        if self.is_whatsapp() && !number.starts_with(WHATSAPP_PREFIX) {
            format!("{WHATSAPP_PREFIX}{number}")
        } else {
            number.to_owned()
        }
    }

    fn bare(number: &str) -> &str {
        number.strip_prefix(WHATSAPP_PREFIX).unwrap_or(number)
    }

    /// Resolves the sender field: a messaging service wins over a number.
    fn sender_field(&self, envelope: &Envelope) -> Result<(String, String), ProviderError> {
        if let Some(service) = &self.settings.messaging_service_sid {
            return Ok(("MessagingServiceSid".to_owned(), service.clone()));
        }
        let sender = envelope.sender();
        let number = if self.is_whatsapp() {
            sender
                .whatsapp()
                .map(ToOwned::to_owned)
                .or_else(|| self.settings.whatsapp_from.clone())
        } else {
            sender
                .phone()
                .map(ToOwned::to_owned)
                .or_else(|| self.settings.from_number.clone())
        };
        let from = number.ok_or(ProviderError::MissingSender {
            provider: self.kind,
            field: if self.is_whatsapp() { "whatsapp" } else { "phone" },
        })?;
        Ok(("From".to_owned(), self.address(&from)))
    }

    fn account_url(&self, path: &str) -> String {
        join_url(
            &self.api_base,
            &format!("2010-04-01/Accounts/{}/{path}", self.settings.account_sid),
        )
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request.with_basic_auth(&self.settings.account_sid, &self.settings.auth_token)
    }

    fn interpret(response: &HttpResponse) -> RequestOutcome {
        let body = response.json().unwrap_or(Value::Null);
        if response.is_success() {
            return RequestOutcome::Accepted {
                external_id: json_string(&body, "sid"),
            };
        }
        let message = match (json_string(&body, "code"), json_string(&body, "message")) {
            (Some(code), Some(text)) => Some(format!("{code} {text}")),
            (None, text) => text,
            (Some(code), None) => Some(code),
        };
        RequestOutcome::Rejected(http_rejection(response, message.as_deref()))
    }
}

#[async_trait]
impl ChannelProvider for TwilioProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        self.sender_field(envelope)?;
        let mut numbers = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| self.recipient_number(recipient))
            .peekable();
        if numbers.peek().is_none() {
            return Err(ProviderError::NoEligibleRecipient {
                channel: self.kind.channel(),
                field: if self.is_whatsapp() { "whatsapp" } else { "phone" },
            });
        }
        numbers.try_for_each(|number| require_e164(Self::bare(number)))
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let sender = self.sender_field(envelope)?;
        let payload = envelope.payload_for(self.kind.channel());
        let text = match &payload.title {
            Some(title) => format!("{title}\n\n{}", payload.text),
            None => payload.text.clone(),
        };

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| self.recipient_number(recipient))
            .map(|number| {
                let to = self.address(number);
                let fields = vec![
                    ("To".to_owned(), to.clone()),
                    sender.clone(),
                    ("Body".to_owned(), text.clone()),
                ];
                PreparedRequest::new(to, WireBody::Form(fields))
            })
            .collect();
        Ok(PreparedMessage::new(self.kind, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let url = self.account_url("Messages.json");
        let build = |request: &PreparedRequest| {
            let base = self.authorized(HttpRequest::post(url.as_str()));
            match &request.body {
                WireBody::Form(pairs) => base.with_form(pairs),
                WireBody::Json(document) => base.with_json(document),
            }
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }

    async fn fetch_status(
        &self,
        external_id: &str,
    ) -> Result<Option<ProviderStatusReport>, NetworkError> {
        if external_id.is_empty() || !external_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }
        let request =
            self.authorized(HttpRequest::get(self.account_url(&format!("Messages/{external_id}.json"))));
        let response = self.transport.execute(request).await?.error_for_upstream()?;
        if !response.is_success() {
            return Ok(None);
        }
        let Some(body) = response.json() else {
            return Ok(None);
        };
        Ok(json_string(&body, "status").map(|status| ProviderStatusReport {
            provider: self.kind,
            external_id: external_id.to_owned(),
            status,
            raw: Some(body),
        }))
    }
}
