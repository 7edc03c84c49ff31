//! Outbound HTTP transport port.

use crate::provider::domain::NetworkError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// HTTP method used by providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

impl HttpMethod {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A fully encoded outbound request.
///
/// The body is kept as the exact string sent on the wire so that signatures
/// computed over it stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header pairs, sent in order.
    pub headers: Vec<(String, String)>,
    /// Encoded body.
    pub body: Option<String>,
    /// Basic-auth user and password.
    pub basic_auth: Option<(String, String)>,
    /// Per-request timeout overriding the transport default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            basic_auth: None,
            timeout: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a `POST` request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and its content type.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body("application/json", value.to_string())
    }

    /// Sets a form-encoded body and its content type.
    #[must_use]
    pub fn with_form(self, pairs: &[(String, String)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .finish();
        self.with_body("application/x-www-form-urlencoded", encoded)
    }

    /// Sets a raw body with the given content type.
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: String) -> Self {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        self.headers
            .push(("Content-Type".to_owned(), content_type.to_owned()));
        self.body = Some(body);
        self
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the first header value with the given name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A provider response with its body read to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parses the body as JSON, if it is JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Turns a 5xx response into a transient [`NetworkError`].
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] with an upstream kind when the status is 5xx.
    pub fn error_for_upstream(self) -> Result<Self, NetworkError> {
        if self.status >= 500 {
            return Err(NetworkError::upstream(self.status, self.body));
        }
        Ok(self)
    }
}

/// Executes outbound HTTP requests for providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and reads the full response body.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] for timeouts, connection failures, and I/O
    /// failures.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;
}
