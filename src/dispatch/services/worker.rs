//! Queue consumer loop.

use super::{ChannelJobProcessor, ProcessOutcome};
use crate::dispatch::{
    domain::{JobContext, QueueError},
    ports::{FailOutcome, JobConsumer, ReservedJob},
};
use crate::notification::ports::DeliveryStore;
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default sleep between polls of an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Pulls channel jobs from a queue and drives the processor.
///
/// Any number of workers may share one queue; the queue is the only
/// synchronization point between them.
pub struct DeliveryWorker<Q, S, C>
where
    Q: JobConsumer,
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    consumer: Arc<Q>,
    processor: Arc<ChannelJobProcessor<S, C>>,
    poll_interval: Duration,
}

impl<Q, S, C> DeliveryWorker<Q, S, C>
where
    Q: JobConsumer,
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    /// Creates a worker polling every [`DEFAULT_POLL_INTERVAL`] when idle.
    #[must_use]
    pub const fn new(consumer: Arc<Q>, processor: Arc<ChannelJobProcessor<S, C>>) -> Self {
        Self {
            consumer,
            processor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the idle poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Processes jobs until `shutdown` resolves.
    ///
    /// Queue errors are logged and the loop continues after one poll
    /// interval.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        loop {
            let idle = match self.tick().await {
                Ok(processed) => !processed,
                Err(err) => {
                    error!(error = %err, "job queue unavailable");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = &mut shutdown => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            } else if futures::FutureExt::now_or_never(&mut shutdown).is_some() {
                break;
            }
        }
        debug!("delivery worker stopped");
    }

    /// Processes every currently eligible job and returns how many ran.
    ///
    /// Jobs rescheduled with a backoff become eligible later and are not
    /// waited for.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the queue fails.
    pub async fn run_until_idle(&self) -> Result<usize, QueueError> {
        let mut processed = 0;
        while self.tick().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Reserves and handles one job. Returns `false` when none was eligible.
    async fn tick(&self) -> Result<bool, QueueError> {
        let Some(reserved) = self.consumer.reserve().await? else {
            return Ok(false);
        };
        self.handle(reserved).await?;
        Ok(true)
    }

    async fn handle(&self, reserved: ReservedJob) -> Result<(), QueueError> {
        let ReservedJob {
            id,
            payload,
            attempt_number,
            max_attempts,
            ..
        } = reserved;
        let context = JobContext {
            job: payload.clone(),
            attempt_number,
            max_attempts,
        };

        let reason = match self.processor.process(context).await {
            Ok(outcome) => {
                if outcome == ProcessOutcome::Redelivered {
                    debug!(job_id = %id, "redelivered job acknowledged");
                }
                return self.consumer.complete(id).await;
            }
            Err(err) if err.is_transient() => err.to_string(),
            Err(err) => {
                error!(
                    job_id = %id,
                    message_id = %payload.message_id,
                    channel = payload.channel.as_str(),
                    error = %err,
                    "job processing failed"
                );
                err.to_string()
            }
        };

        match self.consumer.fail(id, &reason).await? {
            FailOutcome::Retrying { delay } => {
                debug!(
                    job_id = %id,
                    attempt = attempt_number,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "job rescheduled"
                );
            }
            FailOutcome::Exhausted => {
                if let Err(err) = self.processor.abandon(&payload, &reason).await {
                    warn!(
                        job_id = %id,
                        message_id = %payload.message_id,
                        error = %err,
                        "could not fail attempt for exhausted job"
                    );
                }
            }
        }
        Ok(())
    }
}
