//! AWS SES v2 email provider.

use super::common::{RequestOutcome, deliver_all, http_rejection, json_string, mailbox};
use super::signing::sign_v4;
use crate::notification::domain::{Channel, Envelope};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderConfigurationError,
        ProviderError, ProviderKind, ProviderResponse, SesSettings, WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use mockable::Clock;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use url::Url;

const SEND_EMAIL_PATH: &str = "/v2/email/outbound-emails";

/// Sends email through the SES v2 `SendEmail` API.
pub struct SesProvider {
    settings: SesSettings,
    endpoint: Url,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SesProvider {
    /// Creates the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when credentials or the region
    /// are blank, or the endpoint override is not a valid URL.
    pub fn new(
        settings: SesSettings,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, ProviderConfigurationError> {
        let kind = ProviderKind::Ses;
        super::require(kind, "access_key_id", &settings.credentials.access_key_id)?;
        super::require(kind, "secret_access_key", &settings.credentials.secret_access_key)?;
        super::require(kind, "region", &settings.credentials.region)?;
        let base = settings.endpoint.clone().unwrap_or_else(|| {
            format!("https://email.{}.amazonaws.com", settings.credentials.region)
        });
        let endpoint = super::parse_endpoint(kind, &format!(
            "{}{SEND_EMAIL_PATH}",
            base.trim_end_matches('/')
        ))?;
        Ok(Self {
            settings,
            endpoint,
            transport,
            clock,
        })
    }

    fn from_address(&self, envelope: &Envelope) -> Result<String, ProviderError> {
        let sender = envelope.sender();
        let address = sender
            .email()
            .map(ToOwned::to_owned)
            .or_else(|| self.settings.from_address.clone())
            .ok_or(ProviderError::MissingSender {
                provider: ProviderKind::Ses,
                field: "email",
            })?;
        Ok(mailbox(sender.name(), &address))
    }

    fn interpret(response: &HttpResponse) -> RequestOutcome {
        let body = response.json().unwrap_or(Value::Null);
        if response.is_success() {
            return RequestOutcome::Accepted {
                external_id: json_string(&body, "MessageId"),
            };
        }
        let message = json_string(&body, "message").or_else(|| json_string(&body, "Message"));
        RequestOutcome::Rejected(http_rejection(response, message.as_deref()))
    }
}

#[async_trait]
impl ChannelProvider for SesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ses
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        self.from_address(envelope)?;
        if envelope.recipients().iter().all(|r| r.email().is_none()) {
            return Err(ProviderError::NoEligibleRecipient {
                channel: Channel::Email,
                field: "email",
            });
        }
        Ok(())
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let from = self.from_address(envelope)?;
        let payload = envelope.payload_for(Channel::Email);

        let mut body = Map::new();
        body.insert("Text".to_owned(), json!({ "Data": payload.text, "Charset": "UTF-8" }));
        if let Some(html) = &payload.html {
            body.insert("Html".to_owned(), json!({ "Data": html, "Charset": "UTF-8" }));
        }

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| {
                let to = recipient.email()?;
                let mut document = json!({
                    "FromEmailAddress": from,
                    "Destination": { "ToAddresses": [mailbox(recipient.name(), to)] },
                    "Content": {
                        "Simple": {
                            "Subject": {
                                "Data": payload.title.clone().unwrap_or_default(),
                                "Charset": "UTF-8",
                            },
                            "Body": Value::Object(body.clone()),
                        }
                    },
                });
                if let (Some(set), Some(fields)) =
                    (&self.settings.configuration_set, document.as_object_mut())
                {
                    fields.insert("ConfigurationSetName".to_owned(), json!(set));
                }
                Some(PreparedRequest::new(to, WireBody::Json(document)))
            })
            .collect();
        Ok(PreparedMessage::new(ProviderKind::Ses, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let build = |request: &PreparedRequest| {
            let base = HttpRequest::post(self.endpoint.as_str());
            let unsigned = match &request.body {
                WireBody::Json(document) => base.with_json(document),
                WireBody::Form(pairs) => base.with_form(pairs),
            };
            sign_v4(
                unsigned,
                &self.endpoint,
                &self.settings.credentials,
                "ses",
                self.clock.utc(),
            )
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }
}
