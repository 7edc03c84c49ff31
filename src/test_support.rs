//! Test doubles shared by the unit test modules.

use crate::notification::{
    domain::{Envelope, RawEnvelope},
    ports::{AuditEntry, AuditSink, EnvelopeValidator},
    validation::service::DefaultEnvelopeValidator,
};
use crate::provider::{
    domain::{
        NetworkError, PreparedMessage, PreparedRequest, ProviderError, ProviderKind,
        ProviderResponse, ProviderStatusReport, WireBody,
    },
    ports::ChannelProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Clock that only moves when told to.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) const fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).expect("duration fits in a time delta");
        let mut now = self.now.lock().expect("clock lock");
        *now += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(fixed_now())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// 2026-03-01T09:30:00Z.
pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Runs the default validator over a raw envelope.
pub(crate) fn validated(raw: &RawEnvelope) -> Envelope {
    DefaultEnvelopeValidator::new()
        .validate(raw)
        .expect("test envelope should validate")
}

/// Audit sink that keeps every entry.
#[derive(Default)]
pub(crate) struct RecordingAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditSink {
    pub(crate) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit lock").clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().expect("audit lock").push(entry);
    }
}

/// Scriptable provider: replays queued send results, then accepts.
pub(crate) struct StubProvider {
    kind: ProviderKind,
    rejection: Option<ProviderError>,
    script: Mutex<VecDeque<Result<ProviderResponse, NetworkError>>>,
    status: Option<ProviderStatusReport>,
    status_delay: Option<Duration>,
    sends: AtomicUsize,
}

impl StubProvider {
    pub(crate) fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            rejection: None,
            script: Mutex::new(VecDeque::new()),
            status: None,
            status_delay: None,
            sends: AtomicUsize::new(0),
        }
    }

    /// Makes `validate` fail.
    pub(crate) fn rejecting(mut self, error: ProviderError) -> Self {
        self.rejection = Some(error);
        self
    }

    /// Queues the result of the next unscripted send.
    pub(crate) fn then(self, result: Result<ProviderResponse, NetworkError>) -> Self {
        self.script.lock().expect("script lock").push_back(result);
        self
    }

    pub(crate) fn with_status(mut self, status: &str) -> Self {
        self.status = Some(ProviderStatusReport {
            provider: self.kind,
            external_id: self.default_external_id(),
            status: status.to_owned(),
            raw: None,
        });
        self
    }

    pub(crate) const fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub(crate) fn default_external_id(&self) -> String {
        format!("{}-ext", self.kind)
    }
}

#[async_trait]
impl ChannelProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn validate(&self, _envelope: &Envelope) -> Result<(), ProviderError> {
        self.rejection.clone().map_or(Ok(()), Err)
    }

    fn prepare(&self, envelope: &Envelope) -> Result<PreparedMessage, ProviderError> {
        self.validate(envelope)?;
        Ok(PreparedMessage::new(
            self.kind,
            vec![PreparedRequest::new(
                "stub",
                WireBody::Json(json!({ "text": envelope.payload().text })),
            )],
        ))
    }

    async fn send(&self, _prepared: &PreparedMessage) -> Result<ProviderResponse, NetworkError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().expect("script lock").pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ProviderResponse::accepted(
                Some(self.default_external_id()),
                None,
            ))
        })
    }

    async fn fetch_status(
        &self,
        external_id: &str,
    ) -> Result<Option<ProviderStatusReport>, NetworkError> {
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .status
            .clone()
            .filter(|report| report.external_id == external_id))
    }
}
