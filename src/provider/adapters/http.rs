//! `reqwest`-backed HTTP transport.

use crate::provider::{
    domain::{HttpSettings, NetworkError, ProviderConfigurationError},
    ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Shared HTTP client with a fixed default timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after
    /// `settings.timeout_ms` unless overridden per request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderConfigurationError::Transport`] when the TLS backend
    /// cannot be initialized.
    pub fn new(settings: &HttpSettings) -> Result<Self, ProviderConfigurationError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|err| ProviderConfigurationError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn classify(err: &reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::timeout(err.to_string())
    } else if err.is_connect() {
        NetworkError::connect(err.to_string())
    } else {
        NetworkError::io(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            basic_auth,
            timeout,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some((user, password)) = basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }
        if let Some(payload) = body {
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(|err| classify(&err))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| classify(&err))?;
        debug!(method = method.as_str(), status, "provider HTTP call completed");
        Ok(HttpResponse::new(status, text))
    }
}
