//! Delivery configuration.
//!
//! The core is configured entirely through an injected [`DeliveryConfig`];
//! it never reads process environment variables.

use crate::dispatch::domain::QueuePolicy;
use crate::notification::{domain::Channel, ports::ValidationConfig};
use crate::provider::domain::{
    HttpSettings, ProviderConfigurationError, ProviderKind, ProviderSettings,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure to load a delivery configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the configuration shape.
    #[error("invalid delivery configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A channel is mapped to a provider for another channel.
    #[error(transparent)]
    Provider(#[from] ProviderConfigurationError),
}

/// Complete configuration for the delivery core. Every section has
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Per-provider credentials and endpoints.
    pub providers: ProviderSettings,
    /// Provider overrides per channel; unlisted channels use
    /// [`ProviderKind::default_for`].
    pub channel_providers: BTreeMap<Channel, ProviderKind>,
    /// Job retry policy.
    pub queue: QueuePolicy,
    /// Outbound HTTP timeouts.
    pub http: HttpSettings,
    /// Envelope validation limits.
    pub validation: ValidationConfig,
}

impl DeliveryConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::Provider`] when a channel is mapped to a provider that
    /// serves another channel.
    ///
    /// The idempotency key limit is capped at what the message store can
    /// hold.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(document)?;
        config.check()?;
        config.validation = config.validation.capped();
        Ok(config)
    }

    /// Returns the provider configured for a channel.
    #[must_use]
    pub fn provider_for(&self, channel: Channel) -> ProviderKind {
        self.channel_providers
            .get(&channel)
            .copied()
            .unwrap_or_else(|| ProviderKind::default_for(channel))
    }

    fn check(&self) -> Result<(), ProviderConfigurationError> {
        match self
            .channel_providers
            .iter()
            .find(|(channel, kind)| kind.channel() != **channel)
        {
            Some((channel, kind)) => Err(ProviderConfigurationError::ChannelMismatch {
                channel: *channel,
                provider: *kind,
            }),
            None => Ok(()),
        }
    }
}
