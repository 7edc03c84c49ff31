//! `PostgreSQL` persistence adapter for messages, attempts, and events.

mod conversion;
pub mod models;
mod repository;
pub mod schema;

#[cfg(test)]
pub(crate) use conversion::{
    attempt_to_row, event_to_row, message_to_row, row_to_attempt, row_to_event, row_to_message,
};
pub use repository::{DeliveryPgPool, PostgresDeliveryStore};
