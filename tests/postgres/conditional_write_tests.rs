//! Versioned and terminal-once writes of the `PostgreSQL` delivery store.

use super::helpers::{TestStore, accepted_message};
use chrono::{TimeDelta, Utc};
use herald::notification::{
    domain::{
        Attempt, AttemptStatus, Channel, DeliveryEvent, EventType, FailureDetail, Message,
        MessageId, MessageStatus,
    },
    ports::{AttemptRepository, EventRepository, MessageRepository, RepositoryError},
};
use herald::provider::domain::ProviderKind;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

fn stored_message(ctx: &TestStore, key: &str) -> Message {
    ctx.runtime
        .block_on(ctx.store.insert_or_get(&accepted_message(key)))
        .expect("insert")
        .into_inner()
}

fn open_attempt(ctx: &TestStore, message: &Message) -> Attempt {
    let mut attempt = Attempt::new(message.id(), Channel::Email, ProviderKind::Ses, &DefaultClock);
    ctx.runtime
        .block_on(ctx.store.insert_or_get_attempt(&attempt))
        .expect("insert attempt");
    attempt.start(&DefaultClock).expect("start");
    assert!(
        ctx.runtime
            .block_on(ctx.store.save_attempt(&attempt))
            .expect("save start")
    );
    attempt
}

#[rstest]
fn stale_versions_lose_the_status_write(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_cas").expect("store setup");
    let message = stored_message(&ctx, "pg-cas-1");

    let first = ctx
        .runtime
        .block_on(ctx.store.update_status(message.id(), 0, MessageStatus::Queued, Utc::now()))
        .expect("first write");
    let stale = ctx
        .runtime
        .block_on(ctx.store.update_status(
            message.id(),
            0,
            MessageStatus::Processing,
            Utc::now(),
        ))
        .expect("stale write");

    assert!(first);
    assert!(!stale);
    let current = ctx
        .runtime
        .block_on(ctx.store.find_message(message.id()))
        .expect("find")
        .expect("message");
    assert_eq!(current.status(), MessageStatus::Queued);
    assert_eq!(current.version(), 1);
}

#[rstest]
fn status_writes_to_unknown_messages_are_rejected(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_cas_missing").expect("store setup");
    let missing = MessageId::new();

    let err = ctx
        .runtime
        .block_on(ctx.store.update_status(missing, 0, MessageStatus::Queued, Utc::now()))
        .expect_err("unknown message");

    assert!(matches!(err, RepositoryError::NotFound(id) if id == missing));
}

#[rstest]
fn terminal_attempts_are_written_once(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_terminal_once").expect("store setup");
    let message = stored_message(&ctx, "pg-term-1");
    let attempt = open_attempt(&ctx, &message);
    let mut succeeded = attempt.clone();
    succeeded
        .succeed(Some("ses-1".to_owned()), &DefaultClock)
        .expect("succeed");
    let mut failed = attempt;
    failed
        .fail(FailureDetail::new("throttled", "slow down"), &DefaultClock)
        .expect("fail");

    let won = ctx
        .runtime
        .block_on(ctx.store.save_attempt(&succeeded))
        .expect("terminal write");
    let lost = ctx
        .runtime
        .block_on(ctx.store.save_attempt(&failed))
        .expect("late write");

    assert!(won);
    assert!(!lost);
    let stored = ctx
        .runtime
        .block_on(ctx.store.find_attempt(message.id(), Channel::Email))
        .expect("find")
        .expect("attempt");
    assert_eq!(stored.status(), AttemptStatus::Succeeded);
    assert_eq!(stored.external_id(), Some("ses-1"));
    assert!(stored.error().is_none());
}

#[rstest]
fn finishing_commits_the_attempt_and_its_events_once(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_finish").expect("store setup");
    let message = stored_message(&ctx, "pg-fin-1");
    let mut attempt = open_attempt(&ctx, &message);
    attempt.succeed(None, &DefaultClock).expect("succeed");
    let event = DeliveryEvent::new(message.id(), EventType::AttemptSucceeded, Utc::now())
        .with_channel(Channel::Email)
        .for_provider(ProviderKind::Ses);

    let first = ctx
        .runtime
        .block_on(ctx.store.finish_attempt(&attempt, std::slice::from_ref(&event)))
        .expect("finish");
    let again = ctx
        .runtime
        .block_on(ctx.store.finish_attempt(&attempt, std::slice::from_ref(&event)))
        .expect("finish again");

    assert!(first);
    assert!(!again);
    let events = ctx
        .runtime
        .block_on(ctx.store.list_events(message.id()))
        .expect("list");
    assert_eq!(events.len(), 1);
    assert!(events.iter().all(|stored| stored.event_type() == EventType::AttemptSucceeded));
}

#[rstest]
fn finishing_with_an_orphan_event_rolls_back(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_finish_rollback").expect("store setup");
    let message = stored_message(&ctx, "pg-fin-2");
    let mut attempt = open_attempt(&ctx, &message);
    attempt.succeed(None, &DefaultClock).expect("succeed");
    let orphan = DeliveryEvent::new(MessageId::new(), EventType::AttemptSucceeded, Utc::now());

    let err = ctx
        .runtime
        .block_on(ctx.store.finish_attempt(&attempt, &[orphan]))
        .expect_err("orphan event");

    assert!(matches!(err, RepositoryError::NotFound(_)));
    let stored = ctx
        .runtime
        .block_on(ctx.store.find_attempt(message.id(), Channel::Email))
        .expect("find")
        .expect("attempt");
    assert_eq!(stored.status(), AttemptStatus::Started);
    let events = ctx
        .runtime
        .block_on(ctx.store.list_events(message.id()))
        .expect("list");
    assert!(events.is_empty());
}

#[rstest]
fn events_read_back_in_creation_order(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_event_order").expect("store setup");
    let message = stored_message(&ctx, "pg-ord-1");
    let at = Utc::now();
    let batch = [
        DeliveryEvent::new(message.id(), EventType::WebhookDelivered, at),
        DeliveryEvent::new(message.id(), EventType::AttemptFailed, at),
        DeliveryEvent::new(message.id(), EventType::WebhookOpened, at - TimeDelta::seconds(1)),
    ];

    ctx.runtime
        .block_on(ctx.store.append_events(&batch))
        .expect("append");

    let kinds: Vec<EventType> = ctx
        .runtime
        .block_on(ctx.store.list_events(message.id()))
        .expect("list")
        .iter()
        .map(DeliveryEvent::event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventType::WebhookOpened,
            EventType::WebhookDelivered,
            EventType::AttemptFailed,
        ]
    );
}
