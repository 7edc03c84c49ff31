//! Job dispatch.
//!
//! One envelope becomes one queued job per channel. Workers reserve jobs,
//! run them through the matching provider, and complete or fail them so the
//! queue can apply backoff. Each channel job retries independently.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
