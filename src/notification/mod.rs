//! Notification messages: envelopes, attempts, events, and status.
//!
//! This context validates incoming envelopes, persists the accepted message
//! together with its per-channel attempts and append-only events, and
//! derives the aggregate delivery status from the attempts.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
pub mod validation;

#[cfg(test)]
mod tests;
