//! Unit tests for the notification module.
//!
//! Tests are organised by concept: domain values, validation, status
//! aggregation, persistence adapters, and the message service.
