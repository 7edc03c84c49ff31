//! Unit tests for the provider module.
//!
//! Adapters are exercised against a mocked HTTP transport so that request
//! shapes and response classification can be checked without a network.

mod twilio_adapter_tests;
