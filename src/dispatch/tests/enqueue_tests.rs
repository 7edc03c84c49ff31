//! Tests for per-channel job fan-out.

use super::fixtures::raw_envelope;
use crate::dispatch::{
    adapters::InMemoryJobQueue,
    domain::{EnqueueError, JobId, QueueError, QueuePolicy},
    ports::{JobConsumer, MockJobQueue},
    services::ChannelJobEnqueuer,
};
use crate::notification::domain::{Channel, MessageId};
use crate::test_support::{ManualClock, fixed_now, validated};
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn one_job_is_queued_per_channel_in_channel_order() {
    let clock = Arc::new(ManualClock::default());
    let queue = Arc::new(InMemoryJobQueue::new(Arc::clone(&clock)));
    let enqueuer =
        ChannelJobEnqueuer::new(Arc::clone(&queue), Arc::clone(&clock), QueuePolicy::default());
    let envelope = validated(&raw_envelope("fan-out", &["sms", "email", "sms"]));
    let message_id = MessageId::new();

    let jobs = enqueuer
        .enqueue_message(message_id, &envelope)
        .await
        .expect("enqueue");

    let channels: Vec<Channel> = jobs.iter().map(|(channel, _)| *channel).collect();
    assert_eq!(channels, vec![Channel::Sms, Channel::Email]);
    assert_eq!(queue.len().expect("len"), 2);

    let reserved = queue.reserve().await.expect("reserve").expect("job");
    assert_eq!(reserved.payload.message_id, message_id);
    assert_eq!(reserved.payload.envelope, envelope);
}

#[test]
fn options_follow_priority_and_schedule() {
    let clock = Arc::new(ManualClock::default());
    let queue = Arc::new(InMemoryJobQueue::new(Arc::clone(&clock)));
    let enqueuer = ChannelJobEnqueuer::new(
        queue,
        clock,
        QueuePolicy {
            attempts: 4,
            backoff_base_ms: 500,
        },
    );
    let envelope = validated(
        &raw_envelope("later", &["email"])
            .with_priority("low")
            .with_schedule_at(fixed_now() + TimeDelta::minutes(2)),
    );

    let options = enqueuer.options_for(&envelope);

    assert_eq!(options.attempts, 4);
    assert_eq!(options.priority, 10);
    assert_eq!(options.delay, Duration::from_secs(120));
}

#[tokio::test]
async fn rejected_channels_are_reported_alongside_accepted_ones() {
    let accepted_id = JobId::new();
    let mut queue = MockJobQueue::new();
    queue
        .expect_add()
        .times(2)
        .returning(move |_, job, _| match job.channel {
            Channel::Email => Ok(accepted_id),
            _ => Err(QueueError::Rejected("queue full".to_owned())),
        });
    let enqueuer = ChannelJobEnqueuer::new(
        Arc::new(queue),
        Arc::new(ManualClock::default()),
        QueuePolicy::default(),
    );
    let envelope = validated(&raw_envelope("half", &["email", "sms"]));
    let message_id = MessageId::new();

    let err = enqueuer
        .enqueue_message(message_id, &envelope)
        .await
        .expect_err("sms rejected");

    let EnqueueError::Partial {
        message_id: reported,
        accepted,
        failures,
    } = err;
    assert_eq!(reported, message_id);
    assert_eq!(accepted, vec![(Channel::Email, accepted_id)]);
    let [(channel, QueueError::Rejected(reason))] = failures.as_slice() else {
        panic!("expected one rejection, got {failures:?}");
    };
    assert_eq!(*channel, Channel::Sms);
    assert_eq!(reason, "queue full");
}
