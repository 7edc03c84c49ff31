//! Job queue ports: the producer side and the consumer side.

use crate::dispatch::domain::{ChannelJob, JobId, JobOptions, QueueError};
use async_trait::async_trait;
use std::time::Duration;

/// Producer port of the durable job queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a job and returns its queue identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the queue does not accept the job.
    async fn add(
        &self,
        job_name: &str,
        payload: ChannelJob,
        options: JobOptions,
    ) -> Result<JobId, QueueError>;
}

/// A job leased to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedJob {
    /// Queue identifier.
    pub id: JobId,
    /// Job name.
    pub name: String,
    /// Job payload.
    pub payload: ChannelJob,
    /// One-based number of this run.
    pub attempt_number: u32,
    /// Runs allowed in total.
    pub max_attempts: u32,
}

/// What the queue did with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// The job will run again after the delay.
    Retrying {
        /// Backoff before the next run.
        delay: Duration,
    },
    /// The job ran out of attempts and was dead-lettered.
    Exhausted,
}

/// Consumer port of the durable job queue.
#[async_trait]
pub trait JobConsumer: Send + Sync {
    /// Leases the next eligible job, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the backend fails.
    async fn reserve(&self) -> Result<Option<ReservedJob>, QueueError>;

    /// Acknowledges a finished job.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::JobNotFound`] when the job is not leased.
    async fn complete(&self, job_id: JobId) -> Result<(), QueueError>;

    /// Reports a failed run; the queue retries with backoff or gives up.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::JobNotFound`] when the job is not leased.
    async fn fail(&self, job_id: JobId, reason: &str) -> Result<FailOutcome, QueueError>;
}
