//! Validation service implementation.
//!
//! Provides the default implementation of the [`EnvelopeValidator`] port,
//! running every rule and reporting all failures together.

use crate::notification::{
    domain::{
        Channel, Envelope, EnvelopeParts, Payload, PayloadOverride, RawEnvelope, ValidationError,
    },
    ports::validator::{EnvelopeValidator, ValidationConfig, ValidationResult},
    validation::rules,
};
use std::collections::BTreeMap;

/// Default implementation of the envelope validator.
///
/// # Examples
///
/// ```
/// use herald::notification::domain::RawEnvelope;
/// use herald::notification::ports::validator::EnvelopeValidator;
/// use herald::notification::validation::service::DefaultEnvelopeValidator;
///
/// let raw = RawEnvelope::new("order-42", "Your order shipped").with_channels(["email"]);
/// let envelope = DefaultEnvelopeValidator::new()
///     .validate(&raw)
///     .expect("valid envelope");
/// assert_eq!(envelope.idempotency_key().as_str(), "order-42");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultEnvelopeValidator {
    config: ValidationConfig,
}

impl DefaultEnvelopeValidator {
    /// Creates a validator with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator with custom limits.
    ///
    /// The key limit is capped at what the message store can hold.
    #[must_use]
    pub const fn with_config(config: ValidationConfig) -> Self {
        Self {
            config: config.capped(),
        }
    }

    /// Returns the current validation configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }
}

impl EnvelopeValidator for DefaultEnvelopeValidator {
    fn validate(&self, raw: &RawEnvelope) -> ValidationResult<Envelope> {
        let mut errors = Vec::new();

        let key = rules::validate_idempotency_key(raw, &self.config)
            .map_err(|e| errors.push(e))
            .ok();
        let channels = rules::validate_channels(raw)
            .map_err(|e| errors.push(e))
            .ok();
        let text_ok = rules::validate_text(raw, &self.config)
            .map_err(|e| errors.push(e))
            .is_ok();
        let priority = rules::validate_priority(raw)
            .map_err(|e| errors.push(e))
            .ok();
        let overrides_ok = rules::validate_override_channels(raw)
            .map_err(|e| errors.push(e))
            .is_ok();

        match (key, channels, priority) {
            (Some(idempotency_key), Some(channels), Some(priority))
                if text_ok && overrides_ok =>
            {
                Ok(Envelope::from_parts(EnvelopeParts {
                    idempotency_key,
                    sender: raw.sender.clone(),
                    recipients: raw
                        .recipient
                        .clone()
                        .map(|recipients| recipients.into_vec())
                        .unwrap_or_default(),
                    channels,
                    payload: normalize_payload(&raw.payload),
                    channel_overrides: collect_overrides(raw),
                    schedule_at: raw.schedule_at,
                    priority,
                }))
            }
            _ => Err(ValidationError::multiple(errors)),
        }
    }
}

fn normalize_payload(payload: &Payload) -> Payload {
    Payload {
        title: payload
            .title
            .as_ref()
            .filter(|title| !title.trim().is_empty())
            .cloned(),
        text: payload.text.clone(),
        html: payload
            .html
            .as_ref()
            .filter(|html| !html.trim().is_empty())
            .cloned(),
    }
}

fn collect_overrides(raw: &RawEnvelope) -> BTreeMap<Channel, PayloadOverride> {
    raw.channel_overrides
        .iter()
        .filter_map(|(tag, value)| {
            Channel::try_from(tag.as_str())
                .ok()
                .map(|channel| (channel, value.clone()))
        })
        .collect()
}
