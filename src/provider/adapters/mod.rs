//! Provider adapters: the HTTP transport and one module per integration.

mod common;
pub mod http;
pub mod ses;
pub mod signing;
pub mod slack;
pub mod sns;
pub mod telegram;
pub mod twilio;
pub mod webhook;

pub use http::ReqwestTransport;
pub use ses::SesProvider;
pub use slack::SlackProvider;
pub use sns::SnsPushProvider;
pub use telegram::TelegramProvider;
pub use twilio::TwilioProvider;
pub use webhook::WebhookProvider;

use crate::provider::domain::{ProviderConfigurationError, ProviderKind};
use url::Url;

fn require(
    provider: ProviderKind,
    field: &'static str,
    value: &str,
) -> Result<(), ProviderConfigurationError> {
    if value.trim().is_empty() {
        return Err(ProviderConfigurationError::MissingField { provider, field });
    }
    Ok(())
}

fn parse_endpoint(provider: ProviderKind, value: &str) -> Result<Url, ProviderConfigurationError> {
    Url::parse(value).map_err(|err| ProviderConfigurationError::InvalidEndpoint {
        provider,
        value: value.to_owned(),
        reason: err.to_string(),
    })
}
