//! Repository ports for message, attempt, and event persistence.
//!
//! The contracts are deliberately narrow: insert, select with equality
//! filters and ordering, and one conditional update per mutable row type.
//! Uniqueness is enforced by the store, never by application locks.

use crate::notification::domain::{
    Attempt, AttemptId, Channel, DeliveryEvent, IdempotencyKey, Message, MessageId, MessageStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The row was inserted.
    Inserted(T),
    /// A row with the same unique key already existed and is returned
    /// unchanged.
    Existing(T),
}

impl<T> InsertOutcome<T> {
    /// Returns the contained row.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Inserted(value) | Self::Existing(value) => value,
        }
    }

    /// Returns `true` when the row was freshly inserted.
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Message persistence contract.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts the message, or returns the existing message with the same
    /// idempotency key, in one round trip.
    async fn insert_or_get(&self, message: &Message) -> RepositoryResult<InsertOutcome<Message>>;

    /// Finds a message by identifier.
    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// Finds a message by idempotency key.
    async fn find_message_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<Message>>;

    /// Writes a new status only if the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the message does not exist.
    async fn update_status(
        &self,
        id: MessageId,
        expected_version: i64,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool>;
}

/// Attempt persistence contract.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Inserts the attempt, or returns the existing attempt for the same
    /// (message, channel) pair.
    async fn insert_or_get_attempt(
        &self,
        attempt: &Attempt,
    ) -> RepositoryResult<InsertOutcome<Attempt>>;

    /// Persists an attempt transition.
    ///
    /// Returns `false` without writing when the stored attempt is already
    /// terminal, so a terminal status is written exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::AttemptNotFound`] when the attempt does not
    /// exist.
    async fn save_attempt(&self, attempt: &Attempt) -> RepositoryResult<bool>;

    /// Persists a terminal attempt together with its outcome events.
    ///
    /// Both writes commit or neither does. Returns `false` without writing
    /// anything when the stored attempt is already terminal.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::AttemptNotFound`] when the attempt does not
    /// exist, or [`RepositoryError::NotFound`] when an event names a message
    /// that does not exist.
    async fn finish_attempt(
        &self,
        attempt: &Attempt,
        events: &[DeliveryEvent],
    ) -> RepositoryResult<bool>;

    /// Finds the attempt for a (message, channel) pair.
    async fn find_attempt(
        &self,
        message_id: MessageId,
        channel: Channel,
    ) -> RepositoryResult<Option<Attempt>>;

    /// Lists attempts for a message ordered by creation time.
    async fn list_attempts(&self, message_id: MessageId) -> RepositoryResult<Vec<Attempt>>;
}

/// Event persistence contract. Events are append-only.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Appends events.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the owning message does not
    /// exist.
    async fn append_events(&self, events: &[DeliveryEvent]) -> RepositoryResult<()>;

    /// Lists events for a message ordered by creation time, then insertion
    /// order.
    async fn list_events(&self, message_id: MessageId) -> RepositoryResult<Vec<DeliveryEvent>>;
}

/// Combined store used by the delivery services.
pub trait DeliveryStore: MessageRepository + AttemptRepository + EventRepository {}

impl<T> DeliveryStore for T where T: MessageRepository + AttemptRepository + EventRepository {}

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The message was not found.
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// The attempt was not found.
    #[error("attempt not found: {0}")]
    AttemptNotFound(AttemptId),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
