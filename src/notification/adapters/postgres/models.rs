//! Diesel row models for delivery persistence.

use super::schema::{attempts, events, messages};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result and insert row for messages.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Message identifier.
    pub id: uuid::Uuid,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Envelope JSON.
    pub envelope: Value,
    /// Status tag.
    pub status: String,
    /// Optimistic concurrency token.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result and insert row for attempts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttemptRow {
    /// Attempt identifier.
    pub id: uuid::Uuid,
    /// Owning message.
    pub message_id: uuid::Uuid,
    /// Channel tag.
    pub channel: String,
    /// Provider kind tag.
    pub provider: String,
    /// Status tag.
    pub status: String,
    /// Failure code.
    pub error_code: Option<String>,
    /// Failure description.
    pub error_message: Option<String>,
    /// Provider-assigned identifier.
    pub external_id: Option<String>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for events.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Owning message.
    pub message_id: uuid::Uuid,
    /// Dotted event type.
    pub event_type: String,
    /// Channel tag.
    pub channel: Option<String>,
    /// Provider kind tag.
    pub provider: Option<String>,
    /// Opaque payload.
    pub payload: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for events; `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Owning message.
    pub message_id: uuid::Uuid,
    /// Dotted event type.
    pub event_type: String,
    /// Channel tag.
    pub channel: Option<String>,
    /// Provider kind tag.
    pub provider: Option<String>,
    /// Opaque payload.
    pub payload: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
