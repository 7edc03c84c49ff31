//! Queue options derived from an envelope and the queue policy.

use crate::notification::domain::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// `base * 2^(attempt - 1)` after the given failed attempt.
    Exponential {
        /// Delay after the first failure.
        #[serde(with = "millis")]
        base: Duration,
    },
}

impl Backoff {
    /// Returns the delay before retrying after `failed_attempt` (one-based)
    /// has failed.
    #[must_use]
    pub fn delay_for(self, failed_attempt: u32) -> Duration {
        match self {
            Self::Exponential { base } => {
                let factor = 1_u32
                    .checked_shl(failed_attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
        }
    }
}

/// Options attached to one queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Maximum number of runs, including the first.
    pub attempts: u32,
    /// Delay strategy between runs.
    pub backoff: Backoff,
    /// Dispatch priority; lower values are dispatched first.
    pub priority: u32,
    /// Delay before the job first becomes eligible.
    #[serde(with = "millis")]
    pub delay: Duration,
}

/// Queue-level retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Maximum runs per channel job.
    pub attempts: u32,
    /// Base backoff delay in milliseconds.
    pub backoff_base_ms: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl QueuePolicy {
    /// Returns the backoff strategy.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff::Exponential {
            base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Builds job options for an envelope's priority and schedule.
    #[must_use]
    pub fn job_options(
        &self,
        priority: Priority,
        schedule_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> JobOptions {
        JobOptions {
            attempts: self.attempts.max(1),
            backoff: self.backoff(),
            priority: priority_value(priority),
            delay: delay_until(schedule_at, now),
        }
    }
}

/// Maps an envelope priority to a queue priority value.
#[must_use]
pub const fn priority_value(priority: Priority) -> u32 {
    match priority {
        Priority::High => 1,
        Priority::Normal => 5,
        Priority::Low => 10,
    }
}

/// Returns `max(0, schedule_at - now)`.
#[must_use]
pub fn delay_until(schedule_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    schedule_at
        .and_then(|at| (at - now).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
