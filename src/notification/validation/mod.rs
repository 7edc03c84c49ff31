//! Envelope validation at the ingestion boundary.

pub mod rules;
pub mod service;
