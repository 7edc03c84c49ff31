//! Fan-out of one envelope into per-channel queue jobs.

use crate::dispatch::{
    domain::{CHANNEL_JOB_NAME, ChannelJob, EnqueueError, JobId, JobOptions, QueuePolicy},
    ports::JobQueue,
};
use crate::notification::domain::{Channel, Envelope, MessageId};
use futures::future::join_all;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns an accepted message into one durable job per channel.
pub struct ChannelJobEnqueuer<Q, C>
where
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    queue: Arc<Q>,
    clock: Arc<C>,
    policy: QueuePolicy,
}

impl<Q, C> Clone for ChannelJobEnqueuer<Q, C>
where
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
        }
    }
}

impl<Q, C> ChannelJobEnqueuer<Q, C>
where
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates an enqueuer.
    #[must_use]
    pub const fn new(queue: Arc<Q>, clock: Arc<C>, policy: QueuePolicy) -> Self {
        Self {
            queue,
            clock,
            policy,
        }
    }

    /// Returns the options every job of `envelope` is queued with.
    #[must_use]
    pub fn options_for(&self, envelope: &Envelope) -> JobOptions {
        self.policy
            .job_options(envelope.priority(), envelope.schedule_at(), self.clock.utc())
    }

    /// Submits one `deliver-channel` job per envelope channel, concurrently.
    ///
    /// Returns the job identifiers in channel order.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::Partial`] when any job was not accepted. Jobs
    /// that were accepted stay queued.
    pub async fn enqueue_message(
        &self,
        message_id: MessageId,
        envelope: &Envelope,
    ) -> Result<Vec<(Channel, JobId)>, EnqueueError> {
        let options = self.options_for(envelope);
        let submissions = envelope.channels().iter().map(|channel| {
            let job = ChannelJob::new(message_id, *channel, envelope.clone());
            async move { (*channel, self.queue.add(CHANNEL_JOB_NAME, job, options).await) }
        });

        let mut accepted = Vec::new();
        let mut failures = Vec::new();
        for (channel, result) in join_all(submissions).await {
            match result {
                Ok(job_id) => {
                    debug!(
                        message_id = %message_id,
                        channel = channel.as_str(),
                        job_id = %job_id,
                        delay_ms = u64::try_from(options.delay.as_millis()).unwrap_or(u64::MAX),
                        "channel job queued"
                    );
                    accepted.push((channel, job_id));
                }
                Err(err) => {
                    warn!(
                        message_id = %message_id,
                        channel = channel.as_str(),
                        error = %err,
                        "channel job rejected"
                    );
                    failures.push((channel, err));
                }
            }
        }

        if failures.is_empty() {
            Ok(accepted)
        } else {
            Err(EnqueueError::Partial {
                message_id,
                accepted,
                failures,
            })
        }
    }
}
