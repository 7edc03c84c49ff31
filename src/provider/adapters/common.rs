//! Helpers shared by the HTTP provider adapters.

use crate::notification::domain::FailureDetail;
use crate::provider::{
    domain::{NetworkError, PreparedMessage, PreparedRequest, ProviderError, ProviderResponse},
    ports::{HttpRequest, HttpResponse, HttpTransport},
};
use serde_json::{Value, json};
use url::Url;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Provider verdict for one recipient.
pub(crate) enum RequestOutcome {
    Accepted { external_id: Option<String> },
    Rejected(FailureDetail),
}

/// Sends every prepared request in order and folds the verdicts.
///
/// The response succeeds only when every recipient was accepted; its
/// external id is the first recipient's. Any 5xx or transport failure aborts
/// the whole send as a [`NetworkError`].
pub(crate) async fn deliver_all<B, I>(
    transport: &dyn HttpTransport,
    prepared: &PreparedMessage,
    build: B,
    interpret: I,
) -> Result<ProviderResponse, NetworkError>
where
    B: Fn(&PreparedRequest) -> HttpRequest + Send + Sync,
    I: Fn(&HttpResponse) -> RequestOutcome + Send + Sync,
{
    let mut results = Vec::with_capacity(prepared.requests().len());
    let mut first_external_id = None;
    let mut first_error = None;

    for request in prepared.requests() {
        let response = transport.execute(build(request)).await?.error_for_upstream()?;
        match interpret(&response) {
            RequestOutcome::Accepted { external_id } => {
                results.push(json!({
                    "recipient": request.recipient,
                    "status": response.status,
                    "externalId": external_id,
                }));
                if first_external_id.is_none() {
                    first_external_id = external_id;
                }
            }
            RequestOutcome::Rejected(error) => {
                results.push(json!({
                    "recipient": request.recipient,
                    "status": response.status,
                    "error": error,
                }));
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    let data = Some(json!({ "results": results }));
    Ok(match first_error {
        Some(error) => ProviderResponse::rejected(error, data),
        None => ProviderResponse::accepted(first_external_id, data),
    })
}

/// Maps a non-2xx status to a stable failure code.
pub(crate) const fn status_code_tag(status: u16) -> &'static str {
    match status {
        429 => "rate_limited",
        401 | 403 => "unauthorized",
        404 => "not_found",
        400 | 409 | 422 => "rejected",
        _ => "http_error",
    }
}

/// Builds failure detail from a non-2xx response, preferring a provider
/// supplied message over the raw body.
pub(crate) fn http_rejection(response: &HttpResponse, message: Option<&str>) -> FailureDetail {
    let description = message.map_or_else(
        || truncate(&response.body),
        |text| format!("HTTP {}: {text}", response.status),
    );
    FailureDetail::new(status_code_tag(response.status), description)
}

pub(crate) fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Reads a string field from a JSON document, accepting numbers too.
pub(crate) fn json_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Joins an API base and a path into an absolute URL string.
pub(crate) fn join_url(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Formats a display name and address as an RFC 5322 mailbox.
pub(crate) fn mailbox(name: Option<&str>, address: &str) -> String {
    match name {
        Some(display) => format!("\"{}\" <{address}>", display.replace('"', "'")),
        None => address.to_owned(),
    }
}

/// Checks that a phone number is in E.164 form.
pub(crate) fn require_e164(number: &str) -> Result<(), ProviderError> {
    let digits = number.strip_prefix('+').unwrap_or_default();
    if digits.len() >= 7 && digits.len() <= 15 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ProviderError::InvalidRecipient {
            value: number.to_owned(),
            reason: "expected an E.164 number such as +15551234567".to_owned(),
        })
    }
}
