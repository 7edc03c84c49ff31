//! Normalized provider results.

use super::ProviderKind;
use crate::notification::domain::{Channel, FailureDetail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Outcome of one `send`, normalized across providers.
///
/// Ordinary provider rejections are `success: false` with an error; only
/// transport failures surface as `Err(NetworkError)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    /// Whether the provider accepted the message.
    pub success: bool,
    /// Provider-specific response data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Provider-assigned message identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Rejection detail when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
}

impl ProviderResponse {
    /// Creates an accepted response.
    #[must_use]
    pub const fn accepted(external_id: Option<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            external_id,
            error: None,
        }
    }

    /// Creates a rejected response.
    #[must_use]
    pub const fn rejected(error: FailureDetail, data: Option<Value>) -> Self {
        Self {
            success: false,
            data,
            external_id: None,
            error: Some(error),
        }
    }
}

/// Delivery status reported by a provider on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusReport {
    /// Reporting provider.
    pub provider: ProviderKind,
    /// Provider-assigned message identifier.
    pub external_id: String,
    /// Provider status tag, verbatim.
    pub status: String,
    /// Raw provider response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// A status report attached to a message view during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Channel of the reconciled attempt.
    pub channel: Channel,
    /// Provider report.
    #[serde(flatten)]
    pub report: ProviderStatusReport,
    /// When the provider was queried.
    pub checked_at: DateTime<Utc>,
}
