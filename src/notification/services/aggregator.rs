//! Message status aggregation.

use crate::notification::{
    domain::{Attempt, AttemptStatus, Channel, MessageId, MessageStatus},
    ports::{AuditAction, AuditEntry, AuditSink, DeliveryStore, RepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Compare-and-set cycles attempted before giving up on a contended row.
const MAX_STATUS_WRITES: usize = 8;

/// Failure to recompute a message status.
#[derive(Debug, Clone, Error)]
pub enum AggregationError {
    /// The message does not exist.
    #[error("message {0} not found")]
    MessageNotFound(MessageId),
    /// Every compare-and-set cycle lost to a concurrent writer.
    #[error("status of message {message_id} stayed contended after {cycles} writes")]
    Contention {
        /// Contended message.
        message_id: MessageId,
        /// Cycles attempted.
        cycles: usize,
    },
    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reduces attempts to a message status.
///
/// Only attempts for `expected_channels` count. The result is `queued` when
/// no expected channel has an attempt, `processing` while any expected
/// channel lacks a terminal attempt, and otherwise `delivered`, `failed`, or
/// `partially_delivered` depending on the mix of outcomes.
#[must_use]
pub fn aggregate_status(expected_channels: &[Channel], attempts: &[Attempt]) -> MessageStatus {
    let outcomes: Vec<Option<AttemptStatus>> = expected_channels
        .iter()
        .map(|channel| {
            attempts
                .iter()
                .find(|attempt| attempt.channel() == *channel)
                .map(Attempt::status)
        })
        .collect();

    if outcomes.iter().all(Option::is_none) {
        return MessageStatus::Queued;
    }
    if outcomes
        .iter()
        .any(|outcome| !outcome.is_some_and(AttemptStatus::is_terminal))
    {
        return MessageStatus::Processing;
    }

    let succeeded = outcomes
        .iter()
        .filter(|outcome| **outcome == Some(AttemptStatus::Succeeded))
        .count();
    if succeeded == outcomes.len() {
        MessageStatus::Delivered
    } else if succeeded == 0 {
        MessageStatus::Failed
    } else {
        MessageStatus::PartiallyDelivered
    }
}

/// Recomputes and persists message status from attempts.
///
/// Writes are optimistic compare-and-set operations on the message version
/// and only ever move the status forward.
pub struct StatusAggregator<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<C>,
}

impl<S, C> Clone for StatusAggregator<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit: Arc::clone(&self.audit),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> StatusAggregator<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    /// Creates an aggregator.
    #[must_use]
    pub const fn new(store: Arc<S>, audit: Arc<dyn AuditSink>, clock: Arc<C>) -> Self {
        Self {
            store,
            audit,
            clock,
        }
    }

    /// Recomputes the status of a message and persists it if it advanced.
    ///
    /// Returns the stored status after the call.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError`] when the message is missing, persistence
    /// fails, or every write cycle lost to a concurrent writer.
    pub async fn recompute_status(
        &self,
        message_id: MessageId,
    ) -> Result<MessageStatus, AggregationError> {
        for _ in 0..MAX_STATUS_WRITES {
            let message = self
                .store
                .find_message(message_id)
                .await?
                .ok_or(AggregationError::MessageNotFound(message_id))?;
            let current = message.status();
            if current.is_terminal() {
                return Ok(current);
            }

            let attempts = self.store.list_attempts(message_id).await?;
            let computed = aggregate_status(message.envelope().channels(), &attempts);
            if !current.can_advance_to(computed) {
                return Ok(current);
            }

            let at = self.clock.utc();
            if self
                .store
                .update_status(message_id, message.version(), computed, at)
                .await?
            {
                if computed.is_terminal() {
                    info!(message_id = %message_id, status = computed.as_str(), "message settled");
                } else {
                    debug!(message_id = %message_id, status = computed.as_str(), "status advanced");
                }
                self.audit
                    .record(AuditEntry::new(
                        message_id,
                        AuditAction::StatusChanged {
                            from: current,
                            to: computed,
                        },
                        at,
                    ))
                    .await;
                return Ok(computed);
            }
            debug!(message_id = %message_id, "status write lost a version race; retrying");
        }

        Err(AggregationError::Contention {
            message_id,
            cycles: MAX_STATUS_WRITES,
        })
    }
}
