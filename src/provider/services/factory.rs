//! Provider construction from explicit settings.

use crate::provider::{
    adapters::{
        SesProvider, SlackProvider, SnsPushProvider, TelegramProvider, TwilioProvider,
        WebhookProvider,
    },
    domain::{ProviderConfigurationError, ProviderKind, ProviderSettings},
    ports::{ChannelProvider, HttpTransport},
};
use mockable::Clock;
use std::sync::Arc;

/// Builds providers by explicit kind. Never infers a provider from the
/// shape of its settings.
#[derive(Clone)]
pub struct ProviderFactory {
    settings: ProviderSettings,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ProviderFactory {
    /// Creates a factory sharing one transport and clock across providers.
    #[must_use]
    pub fn new(
        settings: ProviderSettings,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            transport,
            clock,
        }
    }

    /// Builds the provider for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError`] when the provider's settings
    /// section is absent or incomplete.
    pub fn build(
        &self,
        kind: ProviderKind,
    ) -> Result<Arc<dyn ChannelProvider>, ProviderConfigurationError> {
        let transport = Arc::clone(&self.transport);
        let missing = || ProviderConfigurationError::MissingSettings(kind);
        let provider: Arc<dyn ChannelProvider> = match kind {
            ProviderKind::Ses => {
                let settings = self.settings.ses.clone().ok_or_else(missing)?;
                Arc::new(SesProvider::new(settings, transport, Arc::clone(&self.clock))?)
            }
            ProviderKind::SnsPush => {
                let settings = self.settings.sns.clone().ok_or_else(missing)?;
                Arc::new(SnsPushProvider::new(settings, transport, Arc::clone(&self.clock))?)
            }
            ProviderKind::TwilioSms => {
                let settings = self.settings.twilio.clone().ok_or_else(missing)?;
                Arc::new(TwilioProvider::sms(settings, transport)?)
            }
            ProviderKind::TwilioWhatsapp => {
                let settings = self.settings.twilio.clone().ok_or_else(missing)?;
                Arc::new(TwilioProvider::whatsapp(settings, transport)?)
            }
            ProviderKind::Telegram => {
                let settings = self.settings.telegram.clone().ok_or_else(missing)?;
                Arc::new(TelegramProvider::new(settings, transport)?)
            }
            ProviderKind::Slack => {
                let settings = self.settings.slack.clone().ok_or_else(missing)?;
                Arc::new(SlackProvider::new(settings, transport)?)
            }
            ProviderKind::Webhook => Arc::new(WebhookProvider::new(
                self.settings.webhook.clone(),
                transport,
            )),
        };
        Ok(provider)
    }
}
