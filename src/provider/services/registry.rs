//! Channel to provider resolution.

use super::ProviderFactory;
use crate::notification::domain::Channel;
use crate::provider::{
    domain::{ProviderConfigurationError, ProviderKind, ProviderResolutionError},
    ports::ChannelProvider,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
enum ProviderSlot {
    Available(Arc<dyn ChannelProvider>),
    Unavailable { provider: ProviderKind, reason: String },
}

/// Resolves the provider serving each channel.
///
/// Built once at startup. A channel whose provider failed to build stays
/// registered as unavailable so that its jobs fail fast instead of waiting.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    slots: HashMap<Channel, ProviderSlot>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider for every channel.
    ///
    /// Channels missing from `channel_providers` use
    /// [`ProviderKind::default_for`]. Build failures are logged and recorded
    /// as unavailable.
    #[must_use]
    pub fn from_factory(
        factory: &ProviderFactory,
        channel_providers: &BTreeMap<Channel, ProviderKind>,
    ) -> Self {
        let mut registry = Self::new();
        for channel in Channel::ALL {
            let kind = channel_providers
                .get(&channel)
                .copied()
                .unwrap_or_else(|| ProviderKind::default_for(channel));
            let built = if kind.channel() == channel {
                factory.build(kind)
            } else {
                Err(ProviderConfigurationError::ChannelMismatch {
                    channel,
                    provider: kind,
                })
            };
            match built {
                Ok(provider) => {
                    debug!(channel = channel.as_str(), provider = kind.as_str(), "provider ready");
                    registry.slots.insert(channel, ProviderSlot::Available(provider));
                }
                Err(err) => {
                    warn!(
                        channel = channel.as_str(),
                        provider = kind.as_str(),
                        error = %err,
                        "provider unavailable"
                    );
                    registry.mark_unavailable(channel, kind, err.to_string());
                }
            }
        }
        registry
    }

    /// Registers a provider for the channel it serves, replacing any
    /// previous entry.
    pub fn register(&mut self, provider: Arc<dyn ChannelProvider>) {
        self.slots
            .insert(provider.channel(), ProviderSlot::Available(provider));
    }

    /// Records that a channel's provider cannot be used.
    pub fn mark_unavailable(
        &mut self,
        channel: Channel,
        provider: ProviderKind,
        reason: impl Into<String>,
    ) {
        self.slots.insert(
            channel,
            ProviderSlot::Unavailable {
                provider,
                reason: reason.into(),
            },
        );
    }

    /// Returns the provider serving `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderResolutionError`] when no provider is registered or
    /// the registered provider failed to build.
    pub fn resolve(
        &self,
        channel: Channel,
    ) -> Result<Arc<dyn ChannelProvider>, ProviderResolutionError> {
        match self.slots.get(&channel) {
            Some(ProviderSlot::Available(provider)) => Ok(Arc::clone(provider)),
            Some(ProviderSlot::Unavailable { provider, reason }) => {
                Err(ProviderResolutionError::Unavailable {
                    channel,
                    provider: *provider,
                    reason: reason.clone(),
                })
            }
            None => Err(ProviderResolutionError::NotRegistered(channel)),
        }
    }

    /// Returns the channels with a usable provider, in channel order.
    #[must_use]
    pub fn available_channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, ProviderSlot::Available(_)))
            .map(|(channel, _)| *channel)
            .collect();
        channels.sort();
        channels
    }
}
