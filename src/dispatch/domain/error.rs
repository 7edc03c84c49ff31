//! Dispatch error types.

use super::JobId;
use crate::notification::domain::{AttemptTransitionError, Channel, MessageId};
use crate::notification::ports::RepositoryError;
use crate::notification::services::AggregationError;
use crate::provider::domain::NetworkError;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a job queue operation.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The referenced job does not exist or is not in the required state.
    #[error("job {0} not found")]
    JobNotFound(JobId),
    /// The queue rejected the job.
    #[error("queue rejected job: {0}")]
    Rejected(String),
    /// The queue backend failed.
    #[error("queue backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

/// Failure to enqueue every channel job of a message.
#[derive(Debug, Clone, Error)]
pub enum EnqueueError {
    /// Some channel jobs were accepted and some were not.
    #[error("{} of {} channel jobs for message {message_id} failed to enqueue", failures.len(), failures.len() + accepted.len())]
    Partial {
        /// Message being fanned out.
        message_id: MessageId,
        /// Jobs the queue accepted.
        accepted: Vec<(Channel, JobId)>,
        /// Jobs the queue rejected.
        failures: Vec<(Channel, QueueError)>,
    },
}

/// Failure while processing one channel job.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The provider call failed transiently; the queue should retry.
    #[error("transient delivery failure: {0}")]
    Transient(#[from] NetworkError),
    /// Attempt or event persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Status recomputation failed.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    /// An attempt transition was rejected.
    #[error(transparent)]
    Transition(#[from] AttemptTransitionError),
}

impl ProcessError {
    /// Returns `true` when the queue should back off and retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
