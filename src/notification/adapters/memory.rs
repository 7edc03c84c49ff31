//! In-memory delivery store for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::notification::{
    domain::{
        Attempt, AttemptId, Channel, DeliveryEvent, IdempotencyKey, Message, MessageId,
        MessageStatus,
    },
    ports::{
        AttemptRepository, EventRepository, InsertOutcome, MessageRepository, RepositoryError,
        RepositoryResult,
    },
};

/// Thread-safe in-memory store implementing every delivery repository port.
///
/// All mutations take one write lock, which gives the same atomicity as the
/// unique constraints and conditional updates of the `PostgreSQL` adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<InMemoryDeliveryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDeliveryState {
    messages: HashMap<MessageId, Message>,
    key_index: HashMap<IdempotencyKey, MessageId>,
    attempts: HashMap<AttemptId, Attempt>,
    attempt_index: HashMap<(MessageId, Channel), AttemptId>,
    events: Vec<DeliveryEvent>,
}

impl InMemoryDeliveryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Persistence`] if the lock is poisoned.
    pub fn message_count(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.messages.len())
    }

    /// Returns the number of stored attempts across all messages.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Persistence`] if the lock is poisoned.
    pub fn attempt_count(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.attempts.len())
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, InMemoryDeliveryState>> {
        self.state
            .read()
            .map_err(|err| RepositoryError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, InMemoryDeliveryState>> {
        self.state
            .write()
            .map_err(|err| RepositoryError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl MessageRepository for InMemoryDeliveryStore {
    async fn insert_or_get(&self, message: &Message) -> RepositoryResult<InsertOutcome<Message>> {
        let mut state = self.write()?;
        if let Some(existing) = state
            .key_index
            .get(message.idempotency_key())
            .and_then(|id| state.messages.get(id))
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        state
            .key_index
            .insert(message.idempotency_key().clone(), message.id());
        state.messages.insert(message.id(), message.clone());
        Ok(InsertOutcome::Inserted(message.clone()))
    }

    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        Ok(self.read()?.messages.get(&id).cloned())
    }

    async fn find_message_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<Message>> {
        let state = self.read()?;
        Ok(state
            .key_index
            .get(key)
            .and_then(|id| state.messages.get(id))
            .cloned())
    }

    async fn update_status(
        &self,
        id: MessageId,
        expected_version: i64,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        let mut state = self.write()?;
        let message = state
            .messages
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        if message.version() != expected_version {
            return Ok(false);
        }
        message.apply_status(status, at);
        Ok(true)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryDeliveryStore {
    async fn insert_or_get_attempt(
        &self,
        attempt: &Attempt,
    ) -> RepositoryResult<InsertOutcome<Attempt>> {
        let mut state = self.write()?;
        if !state.messages.contains_key(&attempt.message_id()) {
            return Err(RepositoryError::NotFound(attempt.message_id()));
        }

        let key = (attempt.message_id(), attempt.channel());
        if let Some(existing) = state
            .attempt_index
            .get(&key)
            .and_then(|id| state.attempts.get(id))
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        state.attempt_index.insert(key, attempt.id());
        state.attempts.insert(attempt.id(), attempt.clone());
        Ok(InsertOutcome::Inserted(attempt.clone()))
    }

    async fn save_attempt(&self, attempt: &Attempt) -> RepositoryResult<bool> {
        let mut state = self.write()?;
        let stored = state
            .attempts
            .get_mut(&attempt.id())
            .ok_or(RepositoryError::AttemptNotFound(attempt.id()))?;
        if stored.is_terminal() {
            return Ok(false);
        }
        *stored = attempt.clone();
        Ok(true)
    }

    async fn finish_attempt(
        &self,
        attempt: &Attempt,
        events: &[DeliveryEvent],
    ) -> RepositoryResult<bool> {
        let mut state = self.write()?;
        if let Some(orphan) = events
            .iter()
            .find(|event| !state.messages.contains_key(&event.message_id()))
        {
            return Err(RepositoryError::NotFound(orphan.message_id()));
        }
        let stored = state
            .attempts
            .get_mut(&attempt.id())
            .ok_or(RepositoryError::AttemptNotFound(attempt.id()))?;
        if stored.is_terminal() {
            return Ok(false);
        }
        *stored = attempt.clone();
        state.events.extend(events.iter().cloned());
        Ok(true)
    }

    async fn find_attempt(
        &self,
        message_id: MessageId,
        channel: Channel,
    ) -> RepositoryResult<Option<Attempt>> {
        let state = self.read()?;
        Ok(state
            .attempt_index
            .get(&(message_id, channel))
            .and_then(|id| state.attempts.get(id))
            .cloned())
    }

    async fn list_attempts(&self, message_id: MessageId) -> RepositoryResult<Vec<Attempt>> {
        let state = self.read()?;
        let mut attempts: Vec<Attempt> = state
            .attempts
            .values()
            .filter(|attempt| attempt.message_id() == message_id)
            .cloned()
            .collect();
        attempts.sort_by_key(Attempt::created_at);
        Ok(attempts)
    }
}

#[async_trait]
impl EventRepository for InMemoryDeliveryStore {
    async fn append_events(&self, events: &[DeliveryEvent]) -> RepositoryResult<()> {
        let mut state = self.write()?;
        if let Some(orphan) = events
            .iter()
            .find(|event| !state.messages.contains_key(&event.message_id()))
        {
            return Err(RepositoryError::NotFound(orphan.message_id()));
        }
        state.events.extend(events.iter().cloned());
        Ok(())
    }

    async fn list_events(&self, message_id: MessageId) -> RepositoryResult<Vec<DeliveryEvent>> {
        let state = self.read()?;
        let mut events: Vec<DeliveryEvent> = state
            .events
            .iter()
            .filter(|event| event.message_id() == message_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        events.sort_by_key(DeliveryEvent::created_at);
        Ok(events)
    }
}
