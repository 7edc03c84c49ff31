//! Port contracts for provider integrations.

pub mod provider;
pub mod transport;

pub use provider::ChannelProvider;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

#[cfg(test)]
pub use provider::MockChannelProvider;
#[cfg(test)]
pub use transport::MockHttpTransport;
