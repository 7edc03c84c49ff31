//! AWS SNS mobile push provider.

use super::common::{RequestOutcome, deliver_all, http_rejection};
use super::signing::sign_v4;
use crate::notification::domain::{Channel, Envelope};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderConfigurationError,
        ProviderError, ProviderKind, ProviderResponse, SnsSettings, WireBody,
    },
    ports::{ChannelProvider, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use mockable::Clock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use url::Url;

const API_VERSION: &str = "2010-03-31";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResponse {
    publish_result: PublishResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResult {
    message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

/// Publishes push notifications to SNS platform endpoint ARNs.
pub struct SnsPushProvider {
    settings: SnsSettings,
    endpoint: Url,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SnsPushProvider {
    /// Creates the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when credentials or the region
    /// are blank, or the endpoint override is not a valid URL.
    pub fn new(
        settings: SnsSettings,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, ProviderConfigurationError> {
        let kind = ProviderKind::SnsPush;
        super::require(kind, "access_key_id", &settings.credentials.access_key_id)?;
        super::require(kind, "secret_access_key", &settings.credentials.secret_access_key)?;
        super::require(kind, "region", &settings.credentials.region)?;
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com/", settings.credentials.region));
        let endpoint = super::parse_endpoint(kind, &base)?;
        Ok(Self {
            settings,
            endpoint,
            transport,
            clock,
        })
    }

    fn interpret(response: &HttpResponse) -> RequestOutcome {
        if response.is_success() {
            let external_id = quick_xml::de::from_str::<PublishResponse>(&response.body)
                .ok()
                .map(|parsed| parsed.publish_result.message_id);
            return RequestOutcome::Accepted { external_id };
        }
        let message = quick_xml::de::from_str::<ErrorResponse>(&response.body)
            .ok()
            .map(|parsed| match parsed.error.message {
                Some(text) => format!("{}: {text}", parsed.error.code),
                None => parsed.error.code,
            });
        RequestOutcome::Rejected(http_rejection(response, message.as_deref()))
    }
}

#[async_trait]
impl ChannelProvider for SnsPushProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SnsPush
    }

    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError> {
        let mut endpoints = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.push_endpoint())
            .peekable();
        if endpoints.peek().is_none() {
            return Err(ProviderError::NoEligibleRecipient {
                channel: Channel::Push,
                field: "pushEndpoint",
            });
        }
        for arn in endpoints {
            if !arn.starts_with("arn:") {
                return Err(ProviderError::InvalidRecipient {
                    value: arn.to_owned(),
                    reason: "expected an SNS endpoint ARN".to_owned(),
                });
            }
        }
        Ok(())
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        let payload = envelope.payload_for(Channel::Push);
        let title = payload.title.clone().unwrap_or_default();
        let apns = json!({ "aps": { "alert": { "title": title, "body": payload.text } } });
        let gcm = json!({ "notification": { "title": title, "body": payload.text } });
        let message = json!({
            "default": payload.text,
            "APNS": apns.to_string(),
            "APNS_SANDBOX": apns.to_string(),
            "GCM": gcm.to_string(),
        })
        .to_string();

        let requests = envelope
            .recipients()
            .iter()
            .filter_map(|recipient| recipient.push_endpoint())
            .map(|arn| {
                let fields = vec![
                    ("Action".to_owned(), "Publish".to_owned()),
                    ("Version".to_owned(), API_VERSION.to_owned()),
                    ("TargetArn".to_owned(), arn.to_owned()),
                    ("MessageStructure".to_owned(), "json".to_owned()),
                    ("Message".to_owned(), message.clone()),
                ];
                PreparedRequest::new(arn, WireBody::Form(fields))
            })
            .collect();
        Ok(PreparedMessage::new(ProviderKind::SnsPush, requests))
    }

    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        let build = |request: &PreparedRequest| {
            let base = HttpRequest::post(self.endpoint.as_str());
            let unsigned = match &request.body {
                WireBody::Form(pairs) => base.with_form(pairs),
                WireBody::Json(document) => base.with_json(document),
            };
            sign_v4(
                unsigned,
                &self.endpoint,
                &self.settings.credentials,
                "sns",
                self.clock.utc(),
            )
        };
        deliver_all(self.transport.as_ref(), prepared, build, Self::interpret).await
    }
}
