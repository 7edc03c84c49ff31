//! Herald: multi-channel notification delivery core.
//!
//! This crate accepts normalized message envelopes, fans each one out to
//! per-channel delivery jobs, sends them through external channel providers
//! (email, SMS, push, chat, and web), and tracks per-channel outcomes behind
//! an aggregate delivery status with idempotent acceptance.
//!
//! # Architecture
//!
//! Herald follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, queue, HTTP)
//!
//! # Modules
//!
//! - [`notification`]: Envelopes, messages, attempts, events, and status
//! - [`provider`]: Channel provider contract and integrations
//! - [`dispatch`]: Channel job fan-out, processing, and workers
//! - [`config`]: Injected delivery configuration

pub mod config;
pub mod dispatch;
pub mod notification;
pub mod provider;

#[cfg(test)]
mod test_support;
