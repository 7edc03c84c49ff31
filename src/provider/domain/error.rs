//! Provider error types.

use super::ProviderKind;
use crate::notification::domain::{Channel, FailureDetail};
use std::fmt;
use thiserror::Error;

/// Rejection of one envelope by a provider's `validate` or `prepare`.
///
/// These failures are permanent for the envelope; retrying cannot fix them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No recipient carries the identity field the channel needs.
    #[error("no recipient has a {field} for channel {channel}")]
    NoEligibleRecipient {
        /// Channel being prepared.
        channel: Channel,
        /// Identity field that was required.
        field: &'static str,
    },
    /// Neither the sender identity nor provider settings supply a sender.
    #[error("sender {field} is required by provider {provider}")]
    MissingSender {
        /// Provider being prepared.
        provider: ProviderKind,
        /// Sender field that was required.
        field: &'static str,
    },
    /// A recipient address is malformed for the provider.
    #[error("invalid recipient '{value}': {reason}")]
    InvalidRecipient {
        /// Offending address.
        value: String,
        /// Why the address was rejected.
        reason: String,
    },
}

impl ProviderError {
    /// Returns a stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoEligibleRecipient { .. } => "no_eligible_recipient",
            Self::MissingSender { .. } => "missing_sender",
            Self::InvalidRecipient { .. } => "invalid_recipient",
        }
    }

    /// Converts the rejection into attempt failure detail.
    #[must_use]
    pub fn to_failure(&self) -> FailureDetail {
        FailureDetail::new(self.code(), self.to_string())
    }
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// The request exceeded its timeout.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The provider answered with a 5xx status.
    Upstream {
        /// HTTP status code.
        status: u16,
    },
    /// Any other I/O failure while sending or reading.
    Io,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connect => f.write_str("connect"),
            Self::Upstream { status } => write!(f, "upstream {status}"),
            Self::Io => f.write_str("io"),
        }
    }
}

/// Transient transport failure. The only failure class eligible for retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("network {kind} error: {message}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
    message: String,
}

impl NetworkError {
    /// Creates a network error.
    #[must_use]
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Timeout, message)
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Connect, message)
    }

    /// Creates an error for a 5xx provider response.
    #[must_use]
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Upstream { status }, message)
    }

    /// Creates a generic I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Io, message)
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts the error into attempt failure detail.
    #[must_use]
    pub fn to_failure(&self) -> FailureDetail {
        FailureDetail::new("network_error", self.to_string())
    }
}

/// Provider construction failure. Disables only the affected provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderConfigurationError {
    /// No settings section exists for the provider.
    #[error("provider {0} is not configured")]
    MissingSettings(ProviderKind),
    /// A required credential or field is blank.
    #[error("provider {provider} requires {field}")]
    MissingField {
        /// Provider being built.
        provider: ProviderKind,
        /// Missing setting.
        field: &'static str,
    },
    /// A configured endpoint is not a valid absolute URL.
    #[error("provider {provider} endpoint '{value}' is invalid: {reason}")]
    InvalidEndpoint {
        /// Provider being built.
        provider: ProviderKind,
        /// Offending endpoint.
        value: String,
        /// Parse failure.
        reason: String,
    },
    /// A channel was mapped to a provider serving a different channel.
    #[error("provider {provider} cannot serve channel {channel}")]
    ChannelMismatch {
        /// Configured channel.
        channel: Channel,
        /// Configured provider.
        provider: ProviderKind,
    },
    /// The HTTP transport could not be built.
    #[error("HTTP transport could not be built: {0}")]
    Transport(String),
}

/// Failure to find a usable provider for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderResolutionError {
    /// No provider was registered for the channel.
    #[error("no provider is registered for channel {0}")]
    NotRegistered(Channel),
    /// The provider failed to build at startup.
    #[error("provider {provider} for channel {channel} is unavailable: {reason}")]
    Unavailable {
        /// Requested channel.
        channel: Channel,
        /// Provider that failed to build.
        provider: ProviderKind,
        /// Construction failure.
        reason: String,
    },
}

impl ProviderResolutionError {
    /// Converts the error into attempt failure detail.
    #[must_use]
    pub fn to_failure(&self) -> FailureDetail {
        FailureDetail::new("provider_unavailable", self.to_string())
    }
}
