//! Processing of one channel job.

use crate::dispatch::domain::{ChannelJob, JobContext, ProcessError};
use crate::notification::{
    domain::{Attempt, DeliveryEvent, EventType, FailureDetail},
    ports::{AuditAction, AuditEntry, AuditSink, DeliveryStore},
    services::StatusAggregator,
};
use crate::provider::{
    domain::{ProviderKind, ProviderResolutionError, ProviderResponse},
    ports::ChannelProvider,
    services::ProviderRegistry,
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of processing a job that did not need a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The attempt succeeded.
    Succeeded,
    /// The attempt failed permanently.
    Failed,
    /// The attempt was already terminal; only the status was recomputed.
    Redelivered,
}

/// Drives one channel job through the provider lifecycle and records the
/// outcome.
pub struct ChannelJobProcessor<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    registry: Arc<ProviderRegistry>,
    aggregator: StatusAggregator<S, C>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<C>,
}

impl<S, C> ChannelJobProcessor<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync,
{
    /// Creates a processor.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        registry: Arc<ProviderRegistry>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<C>,
    ) -> Self {
        let aggregator =
            StatusAggregator::new(Arc::clone(&store), Arc::clone(&audit), Arc::clone(&clock));
        Self {
            store,
            registry,
            aggregator,
            audit,
            clock,
        }
    }

    /// Processes one run of a channel job.
    ///
    /// A redelivered job whose attempt is already terminal makes no provider
    /// call; it only recomputes the message status, which an earlier run may
    /// have failed to write. Provider rejections and validation failures fail
    /// the attempt permanently.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Transient`] when the provider call failed at
    /// the transport level and another run will follow; the attempt then
    /// stays `started`. Other variants report persistence failures.
    pub async fn process(&self, context: JobContext) -> Result<ProcessOutcome, ProcessError> {
        let JobContext {
            job,
            attempt_number,
            max_attempts,
        } = context;
        let final_run = attempt_number >= max_attempts;
        let resolved = self.registry.resolve(job.channel);
        let kind = match &resolved {
            Ok(provider) => provider.kind(),
            Err(ProviderResolutionError::Unavailable { provider, .. }) => *provider,
            Err(ProviderResolutionError::NotRegistered(channel)) => {
                ProviderKind::default_for(*channel)
            }
        };

        let mut attempt = self
            .store
            .insert_or_get_attempt(&Attempt::new(job.message_id, job.channel, kind, &*self.clock))
            .await?
            .into_inner();
        if attempt.is_terminal() {
            debug!(
                message_id = %job.message_id,
                channel = job.channel.as_str(),
                "attempt already terminal; acknowledging redelivery"
            );
            return self.acknowledge_redelivery(&job).await;
        }

        let provider = match resolved {
            Ok(provider) => provider,
            Err(err) => {
                warn!(
                    message_id = %job.message_id,
                    channel = job.channel.as_str(),
                    error = %err,
                    "no usable provider"
                );
                let detail = err.to_failure();
                attempt.fail(detail.clone(), &*self.clock)?;
                let event = self.failure_event(&job, kind, &detail);
                return self.finish(&job, attempt, vec![event]).await;
            }
        };

        attempt.start(&*self.clock)?;
        if !self.store.save_attempt(&attempt).await? {
            return self.acknowledge_redelivery(&job).await;
        }
        self.aggregator.recompute_status(job.message_id).await?;
        debug!(
            message_id = %job.message_id,
            channel = job.channel.as_str(),
            provider = kind.as_str(),
            attempt = attempt_number,
            "attempt started"
        );

        let prepared = provider
            .validate(&job.envelope)
            .and_then(|()| provider.prepare(&job.envelope));
        let response = match prepared {
            Err(err) => ProviderResponse::rejected(err.to_failure(), None),
            Ok(prepared) => match provider.send(&prepared).await {
                Ok(response) => response,
                Err(err) if final_run => {
                    warn!(
                        message_id = %job.message_id,
                        channel = job.channel.as_str(),
                        attempt = attempt_number,
                        error = %err,
                        "transient failure on final attempt"
                    );
                    ProviderResponse::rejected(err.to_failure(), None)
                }
                Err(err) => {
                    warn!(
                        message_id = %job.message_id,
                        channel = job.channel.as_str(),
                        attempt = attempt_number,
                        error = %err,
                        "transient failure; retry scheduled"
                    );
                    return Err(ProcessError::Transient(err));
                }
            },
        };

        self.record_response(&job, provider.as_ref(), attempt, &response)
            .await
    }

    /// Fails a job's attempt after the queue gave up on it.
    ///
    /// When the attempt is already terminal only the message status is
    /// recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when persistence fails.
    pub async fn abandon(
        &self,
        job: &ChannelJob,
        reason: &str,
    ) -> Result<ProcessOutcome, ProcessError> {
        let existing = self.store.find_attempt(job.message_id, job.channel).await?;
        let mut attempt = match existing {
            Some(attempt) => attempt,
            None => {
                let kind = self
                    .registry
                    .resolve(job.channel)
                    .map_or_else(|_| ProviderKind::default_for(job.channel), |p| p.kind());
                self.store
                    .insert_or_get_attempt(&Attempt::new(
                        job.message_id,
                        job.channel,
                        kind,
                        &*self.clock,
                    ))
                    .await?
                    .into_inner()
            }
        };
        if attempt.is_terminal() {
            return self.acknowledge_redelivery(job).await;
        }

        warn!(
            message_id = %job.message_id,
            channel = job.channel.as_str(),
            reason,
            "retries exhausted"
        );
        let detail = FailureDetail::new("retries_exhausted", reason);
        attempt.fail(detail.clone(), &*self.clock)?;
        let event = self.failure_event(job, attempt.provider(), &detail);
        self.finish(job, attempt, vec![event]).await
    }

    async fn record_response(
        &self,
        job: &ChannelJob,
        provider: &dyn ChannelProvider,
        mut attempt: Attempt,
        response: &ProviderResponse,
    ) -> Result<ProcessOutcome, ProcessError> {
        if response.success {
            attempt.succeed(response.external_id.clone(), &*self.clock)?;
        } else {
            let detail = response.error.clone().unwrap_or_else(|| {
                FailureDetail::new("provider_rejected", "provider reported failure")
            });
            attempt.fail(detail, &*self.clock)?;
        }
        let events = provider.map_events(response, job.message_id, self.clock.utc());
        self.finish(job, attempt, events).await
    }

    async fn acknowledge_redelivery(
        &self,
        job: &ChannelJob,
    ) -> Result<ProcessOutcome, ProcessError> {
        self.aggregator.recompute_status(job.message_id).await?;
        Ok(ProcessOutcome::Redelivered)
    }

    fn failure_event(
        &self,
        job: &ChannelJob,
        kind: ProviderKind,
        detail: &FailureDetail,
    ) -> DeliveryEvent {
        DeliveryEvent::new(job.message_id, EventType::AttemptFailed, self.clock.utc())
            .for_provider(kind)
            .with_channel(job.channel)
            .with_payload(json!({ "error": detail }))
    }

    async fn finish(
        &self,
        job: &ChannelJob,
        attempt: Attempt,
        events: Vec<DeliveryEvent>,
    ) -> Result<ProcessOutcome, ProcessError> {
        if !self.store.finish_attempt(&attempt, &events).await? {
            debug!(
                message_id = %job.message_id,
                channel = job.channel.as_str(),
                "attempt finished concurrently; dropping duplicate outcome"
            );
            return self.acknowledge_redelivery(job).await;
        }

        let status = attempt.status();
        if attempt.error().is_some() {
            warn!(
                message_id = %job.message_id,
                channel = job.channel.as_str(),
                provider = attempt.provider().as_str(),
                code = attempt.error().map(|error| error.code.as_str()),
                "attempt failed"
            );
        } else {
            info!(
                message_id = %job.message_id,
                channel = job.channel.as_str(),
                provider = attempt.provider().as_str(),
                external_id = attempt.external_id(),
                "attempt succeeded"
            );
        }
        self.audit
            .record(AuditEntry::new(
                job.message_id,
                AuditAction::AttemptFinished {
                    channel: job.channel,
                    provider: attempt.provider(),
                    status,
                },
                self.clock.utc(),
            ))
            .await;

        self.aggregator.recompute_status(job.message_id).await?;
        Ok(if attempt.error().is_some() {
            ProcessOutcome::Failed
        } else {
            ProcessOutcome::Succeeded
        })
    }
}
