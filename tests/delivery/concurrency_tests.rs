//! Racing submissions and competing workers.

use super::helpers::{ScriptedTransport, Stack, chat_apis_accept, chat_envelope};
use eyre::{Result, eyre};
use herald::notification::domain::MessageStatus;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_submissions_accept_one_message() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(chat_apis_accept))?;
    let shared = Arc::new(chat_envelope("race-1", &["slack", "telegram"]));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&stack.service);
            let envelope = Arc::clone(&shared);
            tokio::spawn(async move { service.create_message(&envelope).await })
        })
        .collect();
    let mut receipts = Vec::with_capacity(handles.len());
    for handle in handles {
        receipts.push(handle.await??);
    }

    let fresh = receipts.iter().filter(|receipt| !receipt.duplicate).count();
    assert_eq!(fresh, 1);
    let first = receipts.first().ok_or_else(|| eyre!("no receipts"))?;
    assert!(
        receipts
            .iter()
            .all(|receipt| receipt.message_id == first.message_id)
    );
    assert_eq!(stack.store.message_count()?, 1);
    assert_eq!(stack.queue.len()?, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_workers_send_each_channel_once() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(chat_apis_accept))?;
    let mut ids = Vec::new();
    for index in 0..6 {
        let receipt = stack
            .service
            .create_message(&chat_envelope(&format!("crowd-{index}"), &["slack", "telegram"]))
            .await?;
        ids.push(receipt.message_id);
    }

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let worker = stack.worker();
            tokio::spawn(async move { worker.run_until_idle().await })
        })
        .collect();
    let mut processed = 0;
    for handle in handles {
        processed += handle.await??;
    }

    assert_eq!(processed, 12);
    assert_eq!(stack.transport.requests_to("slack.test").len(), 6);
    assert_eq!(stack.transport.requests_to("telegram.test").len(), 6);
    for id in ids {
        let view = stack
            .service
            .get_message(id)
            .await?
            .ok_or_else(|| eyre!("message {id} should exist"))?;
        assert_eq!(view.status, MessageStatus::Delivered);
    }
    Ok(())
}
