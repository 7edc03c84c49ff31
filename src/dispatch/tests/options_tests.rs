//! Tests for queue options derived from envelopes.

use crate::dispatch::domain::{Backoff, JobContext, QueuePolicy, delay_until, priority_value};
use crate::notification::domain::Priority;
use crate::test_support::fixed_now;
use chrono::TimeDelta;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

use super::fixtures::detached_job;

#[rstest]
#[case(1, 1_000)]
#[case(2, 2_000)]
#[case(3, 4_000)]
#[case(4, 8_000)]
fn exponential_backoff_doubles_per_failure(#[case] failed_attempt: u32, #[case] millis: u64) {
    let backoff = Backoff::Exponential {
        base: Duration::from_secs(1),
    };
    assert_eq!(backoff.delay_for(failed_attempt), Duration::from_millis(millis));
}

#[test]
fn backoff_saturates_instead_of_overflowing() {
    let backoff = Backoff::Exponential {
        base: Duration::from_secs(1),
    };
    assert!(backoff.delay_for(64) >= backoff.delay_for(31));
}

#[rstest]
#[case(Priority::High, 1)]
#[case(Priority::Normal, 5)]
#[case(Priority::Low, 10)]
fn priority_maps_to_queue_values(#[case] priority: Priority, #[case] value: u32) {
    assert_eq!(priority_value(priority), value);
}

#[test]
fn delay_is_zero_without_a_future_schedule() {
    let now = fixed_now();
    assert_eq!(delay_until(None, now), Duration::ZERO);
    assert_eq!(
        delay_until(Some(now - TimeDelta::minutes(5)), now),
        Duration::ZERO
    );
    assert_eq!(
        delay_until(Some(now + TimeDelta::seconds(90)), now),
        Duration::from_secs(90)
    );
}

#[test]
fn job_options_combine_policy_and_envelope() {
    let policy = QueuePolicy {
        attempts: 5,
        backoff_base_ms: 250,
    };
    let now = fixed_now();

    let options = policy.job_options(Priority::High, Some(now + TimeDelta::seconds(30)), now);

    assert_eq!(options.attempts, 5);
    assert_eq!(options.priority, 1);
    assert_eq!(options.delay, Duration::from_secs(30));
    assert_eq!(
        options.backoff,
        Backoff::Exponential {
            base: Duration::from_millis(250)
        }
    );
}

#[test]
fn job_options_allow_at_least_one_run() {
    let policy = QueuePolicy {
        attempts: 0,
        backoff_base_ms: 1_000,
    };
    let options = policy.job_options(Priority::Normal, None, fixed_now());
    assert_eq!(options.attempts, 1);
}

#[test]
fn queue_policy_defaults_fill_missing_fields() {
    let policy: QueuePolicy = serde_json::from_value(json!({ "attempts": 7 })).expect("policy");
    assert_eq!(
        policy,
        QueuePolicy {
            attempts: 7,
            backoff_base_ms: 1_000,
        }
    );
    assert_eq!(QueuePolicy::default().attempts, 3);
}

#[test]
fn job_options_serialize_durations_as_milliseconds() {
    let options = QueuePolicy::default().job_options(Priority::Low, None, fixed_now());
    let value = serde_json::to_value(options).expect("serialize");
    assert_eq!(
        value,
        json!({
            "attempts": 3,
            "backoff": { "type": "exponential", "base": 1000 },
            "priority": 10,
            "delay": 0,
        })
    );
}

#[rstest]
#[case(1, 3, false)]
#[case(3, 3, true)]
#[case(1, 1, true)]
fn final_attempt_is_the_last_allowed_run(
    #[case] attempt_number: u32,
    #[case] max_attempts: u32,
    #[case] expected: bool,
) {
    let context = JobContext {
        job: detached_job("email"),
        attempt_number,
        max_attempts,
    };
    assert_eq!(context.is_final_attempt(), expected);
}
