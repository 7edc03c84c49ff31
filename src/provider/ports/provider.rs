//! Channel provider contract.

use crate::notification::domain::{Channel, DeliveryEvent, Envelope, EventType, MessageId};
use crate::provider::domain::{
    NetworkError, PreparedMessage, ProviderError, ProviderKind, ProviderResponse,
    ProviderStatusReport,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

/// Uniform lifecycle for one channel-provider pair.
///
/// The processor drives `validate`, `prepare`, `send`, and `map_events` in
/// that order. The first two are pure; only `send` and `fetch_status` touch
/// the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Returns the provider kind.
    fn kind(&self) -> ProviderKind;

    /// Returns the channel served.
    fn channel(&self) -> Channel {
        self.kind().channel()
    }

    /// Checks that the envelope can be serviced at all.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when no recipient has the required identity
    /// or a required sender field is missing.
    fn validate(&self, envelope: &Envelope) -> Result<(), ProviderError>;

    /// Projects the envelope, with channel overrides applied, into wire
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for the same conditions as `validate` and
    /// for malformed addresses.
    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError>;

    /// Performs the provider call for every prepared request.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] only for transport-class failures. Provider
    /// rejections are `Ok` with `success: false`.
    async fn send(&self, prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError>;

    /// Translates a send result into exactly one attempt outcome event.
    fn map_events(
        &self,
        response: &ProviderResponse,
        message_id: MessageId,
        at: DateTime<Utc>,
    ) -> Vec<DeliveryEvent> {
        let (event_type, payload) = if response.success {
            (
                EventType::AttemptSucceeded,
                json!({ "externalId": response.external_id, "data": response.data }),
            )
        } else {
            (
                EventType::AttemptFailed,
                json!({ "error": response.error, "data": response.data }),
            )
        };
        vec![
            DeliveryEvent::new(message_id, event_type, at)
                .for_provider(self.kind())
                .with_channel(self.channel())
                .with_payload(payload),
        ]
    }

    /// Queries the provider for the delivery status of a sent message.
    ///
    /// Returns `Ok(None)` when the provider has no status API or does not
    /// know the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] for transport-class failures.
    async fn fetch_status(
        &self,
        _external_id: &str,
    ) -> Result<Option<ProviderStatusReport>, NetworkError> {
        Ok(None)
    }
}
