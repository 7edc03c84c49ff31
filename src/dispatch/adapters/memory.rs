//! In-memory job queue with priority, delay, and backoff semantics.

use crate::dispatch::{
    domain::{ChannelJob, JobId, JobOptions, QueueError},
    ports::{FailOutcome, JobConsumer, JobQueue, ReservedJob},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Waiting,
    Active,
}

#[derive(Debug, Clone)]
struct QueuedJob {
    id: JobId,
    name: String,
    payload: ChannelJob,
    options: JobOptions,
    runs: u32,
    available_at: DateTime<Utc>,
    seq: u64,
    state: JobState,
}

/// A job that ran out of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Queue identifier.
    pub id: JobId,
    /// Job payload.
    pub payload: ChannelJob,
    /// Runs made.
    pub attempts: u32,
    /// Failure reported by the final run.
    pub reason: String,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: HashMap<JobId, QueuedJob>,
    dead_letters: Vec<DeadLetter>,
    next_seq: u64,
}

/// Process-local job queue.
///
/// Eligible jobs are dispatched by priority value, then in insertion order.
/// A job never becomes eligible before its delay or backoff has elapsed.
pub struct InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    state: Arc<Mutex<QueueState>>,
    clock: Arc<C>,
}

impl<C> Clone for InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

fn after(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl<C> InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty queue.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        self.state
            .lock()
            .map_err(|err| QueueError::backend(std::io::Error::other(err.to_string())))
    }

    /// Removes a job that has not been dispatched yet.
    ///
    /// Returns `false` when the job is unknown or currently leased.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn remove(&self, job_id: JobId) -> Result<bool, QueueError> {
        let mut state = self.lock()?;
        let waiting = state
            .jobs
            .get(&job_id)
            .is_some_and(|job| job.state == JobState::Waiting);
        if waiting {
            state.jobs.remove(&job_id);
        }
        Ok(waiting)
    }

    /// Returns the number of waiting and leased jobs.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, QueueError> {
        Ok(self.lock()?.jobs.len())
    }

    /// Returns `true` when no job is waiting or leased.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.lock()?.jobs.is_empty())
    }

    /// Returns the options a waiting or leased job was queued with.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn options(&self, job_id: JobId) -> Result<Option<JobOptions>, QueueError> {
        Ok(self.lock()?.jobs.get(&job_id).map(|job| job.options))
    }

    /// Returns the earliest instant at which a waiting job becomes eligible.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn next_eligible_at(&self) -> Result<Option<DateTime<Utc>>, QueueError> {
        Ok(self
            .lock()?
            .jobs
            .values()
            .filter(|job| job.state == JobState::Waiting)
            .map(|job| job.available_at)
            .min())
    }

    /// Returns the jobs that ran out of attempts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] if the lock is poisoned.
    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self.lock()?.dead_letters.clone())
    }
}

#[async_trait]
impl<C> JobQueue for InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    async fn add(
        &self,
        job_name: &str,
        payload: ChannelJob,
        options: JobOptions,
    ) -> Result<JobId, QueueError> {
        if options.attempts == 0 {
            return Err(QueueError::Rejected("attempts must be at least 1".to_owned()));
        }
        let available_at = after(self.clock.utc(), options.delay);
        let mut state = self.lock()?;
        let id = JobId::new();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.jobs.insert(
            id,
            QueuedJob {
                id,
                name: job_name.to_owned(),
                payload,
                options,
                runs: 0,
                available_at,
                seq,
                state: JobState::Waiting,
            },
        );
        debug!(job_id = %id, priority = options.priority, "job queued");
        Ok(id)
    }
}

#[async_trait]
impl<C> JobConsumer for InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    async fn reserve(&self) -> Result<Option<ReservedJob>, QueueError> {
        let now = self.clock.utc();
        let mut state = self.lock()?;
        let next = state
            .jobs
            .values()
            .filter(|job| job.state == JobState::Waiting && job.available_at <= now)
            .min_by_key(|job| (job.options.priority, job.seq))
            .map(|job| job.id);
        let Some(id) = next else {
            return Ok(None);
        };
        let job = state.jobs.get_mut(&id).ok_or(QueueError::JobNotFound(id))?;
        job.state = JobState::Active;
        job.runs += 1;
        Ok(Some(ReservedJob {
            id,
            name: job.name.clone(),
            payload: job.payload.clone(),
            attempt_number: job.runs,
            max_attempts: job.options.attempts,
        }))
    }

    async fn complete(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        match state.jobs.get(&job_id) {
            Some(job) if job.state == JobState::Active => {
                state.jobs.remove(&job_id);
                Ok(())
            }
            _ => Err(QueueError::JobNotFound(job_id)),
        }
    }

    async fn fail(&self, job_id: JobId, reason: &str) -> Result<FailOutcome, QueueError> {
        let now = self.clock.utc();
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(&job_id)
            .filter(|job| job.state == JobState::Active)
            .ok_or(QueueError::JobNotFound(job_id))?;

        if job.runs < job.options.attempts {
            let delay = job.options.backoff.delay_for(job.runs);
            job.available_at = after(now, delay);
            job.state = JobState::Waiting;
            return Ok(FailOutcome::Retrying { delay });
        }

        let attempts = job.runs;
        if let Some(exhausted) = state.jobs.remove(&job_id) {
            state.dead_letters.push(DeadLetter {
                id: job_id,
                payload: exhausted.payload,
                attempts,
                reason: reason.to_owned(),
            });
        }
        Ok(FailOutcome::Exhausted)
    }
}
