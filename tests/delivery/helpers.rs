//! Shared wiring for end-to-end delivery tests.

use async_trait::async_trait;
use herald::config::DeliveryConfig;
use herald::dispatch::{
    adapters::InMemoryJobQueue,
    domain::QueuePolicy,
    services::{ChannelJobEnqueuer, ChannelJobProcessor, DeliveryWorker},
};
use herald::notification::{
    adapters::{InMemoryDeliveryStore, NoopAuditSink},
    domain::{Identity, RawEnvelope},
    services::MessageService,
    validation::service::DefaultEnvelopeValidator,
};
use herald::provider::{
    domain::NetworkError,
    ports::{HttpRequest, HttpResponse, HttpTransport},
    services::{ProviderFactory, ProviderRegistry},
};
use mockable::DefaultClock;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Slack and Telegram pointed at local hosts; every other provider is left
/// unconfigured.
pub const CHAT_ONLY_CONFIG: &str = r#"{
    "providers": {
        "slack": { "bot_token": "xoxb-test", "api_base": "https://slack.test/api" },
        "telegram": { "bot_token": "123:abc", "api_base": "https://telegram.test" }
    },
    "queue": { "attempts": 2, "backoff_base_ms": 0 }
}"#;

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, NetworkError> + Send + Sync;

/// Transport that answers from a closure and records every request.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, NetworkError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests whose URL contains `fragment`, in send order.
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| {
                requests
                    .iter()
                    .filter(|request| request.url.contains(fragment))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let answer = (self.responder)(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        answer
    }
}

/// Accepts every Slack and Telegram call.
pub fn chat_apis_accept(request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
    if request.url.contains("slack.test") {
        return Ok(HttpResponse::new(
            200,
            json!({ "ok": true, "ts": "1700000000.000100" }).to_string(),
        ));
    }
    if request.url.contains("telegram.test") {
        return Ok(HttpResponse::new(
            200,
            json!({ "ok": true, "result": { "message_id": 77 } }).to_string(),
        ));
    }
    Ok(HttpResponse::new(404, "no route"))
}

pub type Queue = InMemoryJobQueue<DefaultClock>;
pub type Service =
    MessageService<DefaultEnvelopeValidator, InMemoryDeliveryStore, Queue, DefaultClock>;

/// The delivery core wired around in-memory infrastructure.
pub struct Stack {
    pub store: Arc<InMemoryDeliveryStore>,
    pub queue: Arc<Queue>,
    pub service: Arc<Service>,
    pub transport: Arc<ScriptedTransport>,
    processor: Arc<ChannelJobProcessor<InMemoryDeliveryStore, DefaultClock>>,
}

impl Stack {
    pub fn new(config: &DeliveryConfig, scripted: ScriptedTransport) -> Self {
        let clock = Arc::new(DefaultClock);
        let transport = Arc::new(scripted);
        let factory = ProviderFactory::new(
            config.providers.clone(),
            Arc::clone(&transport) as _,
            Arc::clone(&clock) as _,
        );
        let registry = Arc::new(ProviderRegistry::from_factory(
            &factory,
            &config.channel_providers,
        ));
        let store = Arc::new(InMemoryDeliveryStore::new());
        let queue = Arc::new(InMemoryJobQueue::new(Arc::clone(&clock)));

        let enqueuer = ChannelJobEnqueuer::new(Arc::clone(&queue), Arc::clone(&clock), config.queue);
        let service = Arc::new(MessageService::new(
            Arc::new(DefaultEnvelopeValidator::with_config(config.validation.clone())),
            Arc::clone(&store),
            enqueuer,
            Arc::clone(&registry),
            Arc::new(NoopAuditSink),
            Arc::clone(&clock),
        ));
        let processor = Arc::new(ChannelJobProcessor::new(
            Arc::clone(&store),
            registry,
            Arc::new(NoopAuditSink),
            clock,
        ));
        Self {
            store,
            queue,
            service,
            transport,
            processor,
        }
    }

    /// Builds the stack from [`CHAT_ONLY_CONFIG`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails to parse.
    pub fn chat_only(transport: ScriptedTransport) -> eyre::Result<Self> {
        let config = DeliveryConfig::from_json_str(CHAT_ONLY_CONFIG)?;
        Ok(Self::new(&config, transport))
    }

    /// A fresh worker competing on the shared queue.
    pub fn worker(&self) -> DeliveryWorker<Queue, InMemoryDeliveryStore, DefaultClock> {
        DeliveryWorker::new(Arc::clone(&self.queue), Arc::clone(&self.processor))
    }
}

/// Retry policy used by [`CHAT_ONLY_CONFIG`].
pub const CHAT_QUEUE: QueuePolicy = QueuePolicy {
    attempts: 2,
    backoff_base_ms: 0,
};

/// Envelope for one recipient reachable on Slack and Telegram.
pub fn chat_envelope(key: &str, channels: &[&str]) -> RawEnvelope {
    RawEnvelope::new(key, "Deploy finished")
        .with_channels(channels.iter().copied())
        .with_recipient(
            Identity::new()
                .with_slack_channel("C0DEPLOY")
                .with_telegram_chat_id("4242")
                .with_email("ops@example.com"),
        )
}
