//! Unique-key behaviour of the `PostgreSQL` delivery store.

use super::helpers::{TestStore, accepted_message};
use herald::notification::{
    domain::{Attempt, Channel, MessageId},
    ports::{AttemptRepository, InsertOutcome, MessageRepository, RepositoryError},
};
use herald::provider::domain::ProviderKind;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

#[rstest]
fn duplicate_keys_return_the_stored_message(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_dup_key").expect("store setup");
    let first = accepted_message("pg-dup-1");
    let second = accepted_message("pg-dup-1");

    let inserted = ctx
        .runtime
        .block_on(ctx.store.insert_or_get(&first))
        .expect("insert");
    let repeated = ctx
        .runtime
        .block_on(ctx.store.insert_or_get(&second))
        .expect("insert again");

    assert!(inserted.is_inserted());
    let InsertOutcome::Existing(existing) = repeated else {
        panic!("second insert should return the stored row");
    };
    assert_eq!(existing.id(), first.id());
    assert_eq!(existing.version(), 0);
    let found = ctx
        .runtime
        .block_on(ctx.store.find_message_by_key(first.idempotency_key()))
        .expect("find")
        .expect("message");
    assert_eq!(found.id(), first.id());
}

#[rstest]
fn attempts_are_unique_per_message_and_channel(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_dup_attempt").expect("store setup");
    let clock = DefaultClock;
    let message = ctx
        .runtime
        .block_on(ctx.store.insert_or_get(&accepted_message("pg-att-1")))
        .expect("insert")
        .into_inner();
    let first = Attempt::new(message.id(), Channel::Email, ProviderKind::Ses, &clock);
    let rival = Attempt::new(message.id(), Channel::Email, ProviderKind::Ses, &clock);
    let other_channel = Attempt::new(message.id(), Channel::Sms, ProviderKind::TwilioSms, &clock);

    let inserted = ctx
        .runtime
        .block_on(ctx.store.insert_or_get_attempt(&first))
        .expect("insert");
    let repeated = ctx
        .runtime
        .block_on(ctx.store.insert_or_get_attempt(&rival))
        .expect("insert rival");
    let sibling = ctx
        .runtime
        .block_on(ctx.store.insert_or_get_attempt(&other_channel))
        .expect("insert sibling");

    assert!(inserted.is_inserted());
    let InsertOutcome::Existing(existing) = repeated else {
        panic!("rival insert should return the stored attempt");
    };
    assert_eq!(existing.id(), first.id());
    assert!(sibling.is_inserted());
    let attempts = ctx
        .runtime
        .block_on(ctx.store.list_attempts(message.id()))
        .expect("list");
    assert_eq!(attempts.len(), 2);
}

#[rstest]
fn attempts_for_unknown_messages_are_rejected(shared_test_cluster: &'static TestCluster) {
    let ctx = TestStore::open(shared_test_cluster, "test_orphan_attempt").expect("store setup");
    let missing = MessageId::new();
    let attempt = Attempt::new(missing, Channel::Email, ProviderKind::Ses, &DefaultClock);

    let err = ctx
        .runtime
        .block_on(ctx.store.insert_or_get_attempt(&attempt))
        .expect_err("foreign key");

    assert!(matches!(err, RepositoryError::NotFound(id) if id == missing));
}
