//! Acceptance, dispatch, and read-back through real provider adapters.

use super::helpers::{ScriptedTransport, Stack, chat_apis_accept, chat_envelope};
use eyre::{Result, eyre};
use herald::notification::{
    domain::{AttemptStatus, Channel, EventType, MessageStatus},
    ports::AttemptRepository,
    services::ProviderCallback,
};
use herald::provider::{domain::ProviderKind, ports::HttpResponse};
use serde_json::json;

#[tokio::test]
async fn unconfigured_channels_fail_while_others_deliver() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(chat_apis_accept))?;

    let receipt = stack
        .service
        .create_message(&chat_envelope("e2e-1", &["slack", "telegram", "email"]))
        .await?;
    assert_eq!(receipt.status, MessageStatus::Queued);

    let processed = stack.worker().run_until_idle().await?;
    assert_eq!(processed, 3);

    let view = stack
        .service
        .get_message(receipt.message_id)
        .await?
        .ok_or_else(|| eyre!("message should exist"))?;
    assert_eq!(view.status, MessageStatus::PartiallyDelivered);
    assert_eq!(view.events.len(), 3);

    let slack = stack
        .store
        .find_attempt(receipt.message_id, Channel::Slack)
        .await?
        .ok_or_else(|| eyre!("slack attempt"))?;
    assert_eq!(slack.status(), AttemptStatus::Succeeded);
    assert_eq!(slack.external_id(), Some("1700000000.000100"));

    let telegram = stack
        .store
        .find_attempt(receipt.message_id, Channel::Telegram)
        .await?
        .ok_or_else(|| eyre!("telegram attempt"))?;
    assert_eq!(telegram.external_id(), Some("77"));

    let email = stack
        .store
        .find_attempt(receipt.message_id, Channel::Email)
        .await?
        .ok_or_else(|| eyre!("email attempt"))?;
    assert_eq!(email.provider(), ProviderKind::Ses);
    assert_eq!(
        email.error().map(|error| error.code.as_str()),
        Some("provider_unavailable")
    );
    Ok(())
}

#[tokio::test]
async fn provider_requests_carry_credentials_and_content() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(chat_apis_accept))?;
    stack
        .service
        .create_message(&chat_envelope("e2e-2", &["slack", "telegram"]))
        .await?;

    stack.worker().run_until_idle().await?;

    let slack = stack.transport.requests_to("slack.test");
    let [post] = slack.as_slice() else {
        return Err(eyre!("expected one Slack call, got {}", slack.len()));
    };
    assert_eq!(post.url, "https://slack.test/api/chat.postMessage");
    assert_eq!(post.header("Authorization"), Some("Bearer xoxb-test"));
    let body: serde_json::Value = serde_json::from_str(post.body.as_deref().unwrap_or_default())?;
    assert_eq!(body, json!({ "channel": "C0DEPLOY", "text": "Deploy finished" }));

    let telegram = stack.transport.requests_to("telegram.test");
    let [send] = telegram.as_slice() else {
        return Err(eyre!("expected one Telegram call, got {}", telegram.len()));
    };
    assert_eq!(send.url, "https://telegram.test/bot123:abc/sendMessage");
    Ok(())
}

#[tokio::test]
async fn failing_channels_retry_without_resending_healthy_ones() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(|request| {
        if request.url.contains("slack.test") {
            return Ok(HttpResponse::new(503, "maintenance"));
        }
        chat_apis_accept(request)
    }))?;
    let receipt = stack
        .service
        .create_message(&chat_envelope("e2e-3", &["slack", "telegram"]))
        .await?;

    stack.worker().run_until_idle().await?;

    assert_eq!(stack.transport.requests_to("slack.test").len(), 2);
    assert_eq!(stack.transport.requests_to("telegram.test").len(), 1);
    let slack = stack
        .store
        .find_attempt(receipt.message_id, Channel::Slack)
        .await?
        .ok_or_else(|| eyre!("slack attempt"))?;
    assert_eq!(slack.status(), AttemptStatus::Failed);
    assert_eq!(
        slack.error().map(|error| error.code.as_str()),
        Some("network_error")
    );
    let view = stack
        .service
        .get_message(receipt.message_id)
        .await?
        .ok_or_else(|| eyre!("message should exist"))?;
    assert_eq!(view.status, MessageStatus::PartiallyDelivered);
    Ok(())
}

#[tokio::test]
async fn provider_rejections_are_not_retried() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(|request| {
        if request.url.contains("slack.test") {
            return Ok(HttpResponse::new(
                200,
                json!({ "ok": false, "error": "channel_not_found" }).to_string(),
            ));
        }
        chat_apis_accept(request)
    }))?;
    let receipt = stack
        .service
        .create_message(&chat_envelope("e2e-4", &["slack"]))
        .await?;

    stack.worker().run_until_idle().await?;

    assert_eq!(stack.transport.requests_to("slack.test").len(), 1);
    let slack = stack
        .store
        .find_attempt(receipt.message_id, Channel::Slack)
        .await?
        .ok_or_else(|| eyre!("slack attempt"))?;
    assert_eq!(
        slack.error().map(|error| error.code.as_str()),
        Some("slack_channel_not_found")
    );
    let view = stack
        .service
        .get_message(receipt.message_id)
        .await?
        .ok_or_else(|| eyre!("message should exist"))?;
    assert_eq!(view.status, MessageStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn callbacks_follow_attempt_events_in_the_history() -> Result<()> {
    let stack = Stack::chat_only(ScriptedTransport::new(chat_apis_accept))?;
    let receipt = stack
        .service
        .create_message(&chat_envelope("e2e-5", &["telegram"]))
        .await?;
    stack.worker().run_until_idle().await?;

    stack
        .service
        .record_callback(
            ProviderCallback::new(receipt.message_id, EventType::WebhookOpened)
                .from_provider(ProviderKind::Telegram),
        )
        .await?;

    let view = stack
        .service
        .get_message(receipt.message_id)
        .await?
        .ok_or_else(|| eyre!("message should exist"))?;
    let kinds: Vec<EventType> = view.events.iter().map(|event| event.event_type()).collect();
    assert_eq!(
        kinds,
        vec![EventType::AttemptSucceeded, EventType::WebhookOpened]
    );
    assert_eq!(view.status, MessageStatus::Delivered);
    Ok(())
}
