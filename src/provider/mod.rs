//! Provider integrations.
//!
//! Each provider turns a validated envelope into calls against one external
//! delivery API and normalizes the result. Providers are selected by an
//! explicit [`domain::ProviderKind`], built from explicit settings, and
//! reach the network only through the [`ports::HttpTransport`] port.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
