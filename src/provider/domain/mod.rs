//! Provider domain: kinds, settings, prepared messages, and results.

mod error;
mod kind;
mod prepared;
mod response;
mod settings;

pub use error::{
    NetworkError, NetworkErrorKind, ProviderConfigurationError, ProviderError,
    ProviderResolutionError,
};
pub use kind::ProviderKind;
pub use prepared::{PreparedMessage, PreparedRequest, WireBody};
pub use response::{ProviderResponse, ProviderStatusReport, ReconciliationReport};
pub use settings::{
    AwsCredentials, HttpSettings, ProviderSettings, SesSettings, SlackSettings, SnsSettings,
    TelegramSettings, TwilioSettings, WebhookSettings,
};
