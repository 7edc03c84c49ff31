//! Message service: the orchestration entry point.

use super::{AggregationError, StatusAggregator};
use crate::dispatch::{domain::EnqueueError, ports::JobQueue, services::ChannelJobEnqueuer};
use crate::notification::{
    domain::{
        Attempt, AttemptStatus, Channel, DeliveryEvent, Envelope, EventType, IdempotencyKey,
        Message, MessageId, MessageStatus, RawEnvelope, ValidationError,
    },
    ports::{AuditAction, AuditEntry, AuditSink, DeliveryStore, EnvelopeValidator, RepositoryError},
};
use crate::provider::{
    domain::{ProviderKind, ReconciliationReport},
    services::ProviderRegistry,
};
use futures::future::join_all;
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default timeout for on-demand provider status queries.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Acknowledgement returned by [`MessageService::create_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    /// Accepted (or previously accepted) message.
    pub message_id: MessageId,
    /// Status after acceptance.
    pub status: MessageStatus,
    /// Channels fanned out to.
    pub channels: Vec<Channel>,
    /// `true` when the idempotency key had already been accepted.
    pub duplicate: bool,
}

impl CreateReceipt {
    fn for_message(message: &Message, status: MessageStatus, duplicate: bool) -> Self {
        Self {
            message_id: message.id(),
            status,
            channels: message.envelope().channels().to_vec(),
            duplicate,
        }
    }
}

/// A stored message with its event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    /// Message identifier.
    pub id: MessageId,
    /// Aggregate status.
    pub status: MessageStatus,
    /// Stored envelope.
    pub envelope: Envelope,
    /// Events in creation order.
    pub events: Vec<DeliveryEvent>,
    /// Provider status reports, present only when reconciliation ran.
    pub reconciliation: Vec<ReconciliationReport>,
}

/// Read-back options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Query providers for the delivery status of unconfirmed attempts.
    pub reconcile: bool,
}

impl ReadOptions {
    /// Options that enable reconciliation.
    #[must_use]
    pub const fn reconciled() -> Self {
        Self { reconcile: true }
    }
}

/// An inbound provider callback, such as a delivery receipt or bounce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallback {
    /// Message the callback concerns.
    pub message_id: MessageId,
    /// Callback kind; must be a `webhook.*` event.
    pub event_type: EventType,
    /// Reporting provider.
    pub provider: Option<ProviderKind>,
    /// Channel, when the provider does not imply it.
    pub channel: Option<Channel>,
    /// Raw callback body.
    pub payload: Option<Value>,
}

impl ProviderCallback {
    /// Creates a callback with no provider, channel, or payload.
    #[must_use]
    pub const fn new(message_id: MessageId, event_type: EventType) -> Self {
        Self {
            message_id,
            event_type,
            provider: None,
            channel: None,
            payload: None,
        }
    }

    /// Sets the reporting provider.
    #[must_use]
    pub const fn from_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the channel.
    #[must_use]
    pub const fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Attaches the raw callback body.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Service-level errors for message operations.
#[derive(Debug, Error)]
pub enum MessageServiceError {
    /// The envelope is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The message was stored but not every channel job was queued. The
    /// message stays `pending`.
    #[error("message {message_id} was accepted but could not be fully enqueued")]
    Enqueue {
        /// Accepted message.
        message_id: MessageId,
        /// Queue failure.
        #[source]
        source: EnqueueError,
    },
    /// Status recomputation failed.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    /// The referenced message does not exist.
    #[error("message {0} not found")]
    MessageNotFound(MessageId),
    /// Callbacks may not record attempt outcomes.
    #[error("callbacks cannot record '{0}' events")]
    InvalidCallback(EventType),
}

/// Result type for message service operations.
pub type MessageServiceResult<T> = Result<T, MessageServiceError>;

/// Accepts envelopes, reads messages back, and records provider callbacks.
pub struct MessageService<V, S, Q, C>
where
    V: EnvelopeValidator,
    S: DeliveryStore,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    validator: Arc<V>,
    store: Arc<S>,
    enqueuer: ChannelJobEnqueuer<Q, C>,
    aggregator: StatusAggregator<S, C>,
    registry: Arc<ProviderRegistry>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<C>,
    status_timeout: Duration,
}

impl<V, S, Q, C> MessageService<V, S, Q, C>
where
    V: EnvelopeValidator,
    S: DeliveryStore,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a message service.
    #[must_use]
    pub fn new(
        validator: Arc<V>,
        store: Arc<S>,
        enqueuer: ChannelJobEnqueuer<Q, C>,
        registry: Arc<ProviderRegistry>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<C>,
    ) -> Self {
        let aggregator =
            StatusAggregator::new(Arc::clone(&store), Arc::clone(&audit), Arc::clone(&clock));
        Self {
            validator,
            store,
            enqueuer,
            aggregator,
            registry,
            audit,
            clock,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }

    /// Sets the timeout for provider status queries during reconciliation.
    #[must_use]
    pub const fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Validates and accepts an envelope, then fans it out to channel jobs.
    ///
    /// Resubmitting an accepted idempotency key returns the existing message
    /// with `duplicate: true` and enqueues nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MessageServiceError::Validation`] for malformed envelopes,
    /// [`MessageServiceError::Enqueue`] when the message was stored but not
    /// every job was queued, and repository or aggregation errors otherwise.
    pub async fn create_message(&self, raw: &RawEnvelope) -> MessageServiceResult<CreateReceipt> {
        let envelope = self.validator.validate(raw)?;
        let candidate = Message::accept(envelope, &*self.clock);
        let outcome = self.store.insert_or_get(&candidate).await?;
        let inserted = outcome.is_inserted();
        let message = outcome.into_inner();
        let message_id = message.id();

        if !inserted {
            debug!(
                message_id = %message_id,
                idempotency_key = message.idempotency_key().as_str(),
                "duplicate submission"
            );
            return Ok(CreateReceipt::for_message(&message, message.status(), true));
        }

        info!(
            message_id = %message_id,
            channels = message.envelope().channels().len(),
            "message accepted"
        );
        self.audit
            .record(AuditEntry::new(
                message_id,
                AuditAction::MessageAccepted {
                    channels: message.envelope().channels().len(),
                },
                message.created_at(),
            ))
            .await;

        self.enqueuer
            .enqueue_message(message_id, message.envelope())
            .await
            .map_err(|source| MessageServiceError::Enqueue { message_id, source })?;
        let status = self.aggregator.recompute_status(message_id).await?;
        Ok(CreateReceipt::for_message(&message, status, false))
    }

    /// Returns a message and its events, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`MessageServiceError::Repository`] when persistence fails.
    pub async fn get_message(&self, id: MessageId) -> MessageServiceResult<Option<MessageView>> {
        self.get_message_with(id, ReadOptions::default()).await
    }

    /// Returns the message accepted under an idempotency key, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageServiceError::Repository`] when persistence fails.
    pub async fn get_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> MessageServiceResult<Option<MessageView>> {
        let Ok(idempotency_key) = IdempotencyKey::new(key) else {
            return Ok(None);
        };
        match self.store.find_message_by_key(&idempotency_key).await? {
            Some(message) => self.view(message, ReadOptions::default()).await.map(Some),
            None => Ok(None),
        }
    }

    /// Returns a message and its events, optionally reconciling with
    /// providers.
    ///
    /// Reconciliation never changes stored state. Failed or timed-out
    /// provider queries are logged and omitted.
    ///
    /// # Errors
    ///
    /// Returns [`MessageServiceError::Repository`] when persistence fails.
    pub async fn get_message_with(
        &self,
        id: MessageId,
        options: ReadOptions,
    ) -> MessageServiceResult<Option<MessageView>> {
        match self.store.find_message(id).await? {
            Some(message) => self.view(message, options).await.map(Some),
            None => Ok(None),
        }
    }

    /// Records an inbound provider callback as an event.
    ///
    /// Callbacks never change attempts or message status.
    ///
    /// # Errors
    ///
    /// Returns [`MessageServiceError::InvalidCallback`] for `attempt.*`
    /// event types, [`MessageServiceError::MessageNotFound`] for unknown
    /// messages, and repository errors otherwise.
    pub async fn record_callback(
        &self,
        callback: ProviderCallback,
    ) -> MessageServiceResult<DeliveryEvent> {
        let ProviderCallback {
            message_id,
            event_type,
            provider,
            channel,
            payload,
        } = callback;
        if event_type.is_attempt_outcome() {
            return Err(MessageServiceError::InvalidCallback(event_type));
        }
        if self.store.find_message(message_id).await?.is_none() {
            return Err(MessageServiceError::MessageNotFound(message_id));
        }

        let at = self.clock.utc();
        let mut event = DeliveryEvent::new(message_id, event_type, at);
        if let Some(kind) = provider {
            event = event.for_provider(kind);
        }
        if let Some(tag) = channel {
            event = event.with_channel(tag);
        }
        if let Some(body) = payload {
            event = event.with_payload(body);
        }

        self.store.append_events(std::slice::from_ref(&event)).await?;
        info!(
            message_id = %message_id,
            event_type = event_type.as_str(),
            "provider callback recorded"
        );
        self.audit
            .record(AuditEntry::new(
                message_id,
                AuditAction::CallbackRecorded { event_type },
                at,
            ))
            .await;
        Ok(event)
    }

    async fn view(
        &self,
        message: Message,
        options: ReadOptions,
    ) -> MessageServiceResult<MessageView> {
        let events = self.store.list_events(message.id()).await?;
        let reconciliation = if options.reconcile {
            let attempts = self.store.list_attempts(message.id()).await?;
            self.reconcile(&attempts, &events).await
        } else {
            Vec::new()
        };
        Ok(MessageView {
            id: message.id(),
            status: message.status(),
            envelope: message.envelope().clone(),
            events,
            reconciliation,
        })
    }

    async fn reconcile(
        &self,
        attempts: &[Attempt],
        events: &[DeliveryEvent],
    ) -> Vec<ReconciliationReport> {
        let confirmed = |channel: Channel| {
            events.iter().any(|event| {
                event.event_type() == EventType::WebhookDelivered
                    && event.channel() == Some(channel)
            })
        };
        let queries = attempts
            .iter()
            .filter(|attempt| attempt.status() == AttemptStatus::Succeeded)
            .filter(|attempt| !confirmed(attempt.channel()))
            .filter_map(|attempt| {
                let external_id = attempt.external_id()?;
                let provider = self.registry.resolve(attempt.channel()).ok()?;
                (provider.kind() == attempt.provider()).then_some((attempt, provider, external_id))
            })
            .map(|(attempt, provider, external_id)| async move {
                let result =
                    tokio::time::timeout(self.status_timeout, provider.fetch_status(external_id))
                        .await;
                match result {
                    Ok(Ok(Some(report))) => Some(ReconciliationReport {
                        channel: attempt.channel(),
                        report,
                        checked_at: self.clock.utc(),
                    }),
                    Ok(Ok(None)) => None,
                    Ok(Err(err)) => {
                        warn!(
                            message_id = %attempt.message_id(),
                            channel = attempt.channel().as_str(),
                            error = %err,
                            "status query failed"
                        );
                        None
                    }
                    Err(_) => {
                        warn!(
                            message_id = %attempt.message_id(),
                            channel = attempt.channel().as_str(),
                            "status query timed out"
                        );
                        None
                    }
                }
            });
        join_all(queries).await.into_iter().flatten().collect()
    }
}
