//! Port contracts for notification delivery.
//!
//! Ports define infrastructure-agnostic interfaces used by the delivery
//! services.

pub mod audit;
pub mod repository;
pub mod validator;

pub use audit::{AuditAction, AuditEntry, AuditSink};
pub use repository::{
    AttemptRepository, DeliveryStore, EventRepository, InsertOutcome, MessageRepository,
    RepositoryError, RepositoryResult,
};
pub use validator::{
    EnvelopeValidator, MAX_STORED_IDEMPOTENCY_KEY_LENGTH, ValidationConfig, ValidationOutcome,
    ValidationResult,
};
