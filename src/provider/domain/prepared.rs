//! Provider wire projections produced by `prepare`.

use super::ProviderKind;
use serde::Serialize;
use serde_json::Value;

/// Encoded request body for one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "encoding", content = "fields", rename_all = "snake_case")]
pub enum WireBody {
    /// JSON document.
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs, in order.
    Form(Vec<(String, String)>),
}

impl WireBody {
    /// Returns the value of a form field, or a top-level JSON string field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Json(value) => value.get(name).and_then(Value::as_str),
            Self::Form(pairs) => pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
        }
    }
}

/// One provider call addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedRequest {
    /// Resolved provider address (email, phone, chat id, endpoint, URL).
    pub recipient: String,
    /// Provider wire fields.
    pub body: WireBody,
}

impl PreparedRequest {
    /// Creates a prepared request.
    #[must_use]
    pub fn new(recipient: impl Into<String>, body: WireBody) -> Self {
        Self {
            recipient: recipient.into(),
            body,
        }
    }
}

/// An envelope projected into one provider's wire fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedMessage {
    provider: ProviderKind,
    requests: Vec<PreparedRequest>,
}

impl PreparedMessage {
    /// Creates a prepared message.
    #[must_use]
    pub const fn new(provider: ProviderKind, requests: Vec<PreparedRequest>) -> Self {
        Self { provider, requests }
    }

    /// Returns the provider that prepared the message.
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the per-recipient requests in recipient order.
    #[must_use]
    pub fn requests(&self) -> &[PreparedRequest] {
        &self.requests
    }
}
