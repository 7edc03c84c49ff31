//! Infrastructure adapters for notification delivery ports.

pub mod audit;
pub mod memory;
pub mod postgres;

pub use audit::{NoopAuditSink, TracingAuditSink};
pub use memory::InMemoryDeliveryStore;
pub use postgres::{DeliveryPgPool, PostgresDeliveryStore};
