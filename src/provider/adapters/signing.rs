//! Request signing: HMAC-SHA256 and AWS Signature Version 4.

use crate::provider::{domain::AwsCredentials, ports::HttpRequest};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

const SIGV4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Computes HMAC-SHA256 (RFC 2104) of `data` under `key`.
#[must_use]
#[expect(
    clippy::expect_used,
    reason = "HMAC accepts keys of any length, so key setup cannot fail"
)]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC takes keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Hex-encoded HMAC-SHA256, as used in webhook signature headers.
#[must_use]
pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Signs a request for an AWS service with Signature Version 4.
///
/// Adds `X-Amz-Date`, the optional `X-Amz-Security-Token`, and
/// `Authorization`. The signed headers are `host`, `x-amz-date`, and, when
/// present, `content-type` and `x-amz-security-token`. `endpoint` must be the
/// URL the request is sent to.
#[must_use]
pub fn sign_v4(
    request: HttpRequest,
    endpoint: &Url,
    credentials: &AwsCredentials,
    service: &str,
    at: DateTime<Utc>,
) -> HttpRequest {
    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let date = at.format("%Y%m%d").to_string();

    let mut signed = request.with_header("X-Amz-Date", amz_date.clone());
    if let Some(token) = &credentials.session_token {
        signed = signed.with_header("X-Amz-Security-Token", token.clone());
    }

    let host = match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        (None, _) => String::new(),
    };
    let mut canonical: Vec<(String, String)> = vec![("host".to_owned(), host)];
    for (name, value) in &signed.headers {
        let lower = name.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "content-type" | "x-amz-date" | "x-amz-security-token"
        ) {
            canonical.push((lower, value.trim().to_owned()));
        }
    }
    canonical.sort();

    let canonical_headers: String = canonical
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = canonical
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let payload_hash = sha256_hex(signed.body.as_deref().unwrap_or_default().as_bytes());
    let canonical_request = format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        method = signed.method.as_str(),
        path = endpoint.path(),
        query = endpoint.query().unwrap_or_default(),
    );

    let scope = format!("{date}/{region}/{service}/aws4_request", region = credentials.region);
    let string_to_sign = format!(
        "{SIGV4_ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let secret = format!("AWS4{}", credentials.secret_access_key);
    let date_key = hmac_sha256(secret.as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, credentials.region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    let signing_key = hmac_sha256(&service_key, b"aws4_request");
    let signature = hmac_sha256_hex(&signing_key, string_to_sign.as_bytes());

    signed.with_header(
        "Authorization",
        format!(
            "{SIGV4_ALGORITHM} Credential={access_key}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            access_key = credentials.access_key_id,
        ),
    )
}
