//! Configuration document parsing.

use super::helpers::{CHAT_ONLY_CONFIG, CHAT_QUEUE, ScriptedTransport, Stack, chat_apis_accept};
use eyre::Result;
use herald::config::{ConfigError, DeliveryConfig};
use herald::notification::{
    domain::{Channel, RawEnvelope},
    ports::MAX_STORED_IDEMPOTENCY_KEY_LENGTH,
    services::MessageServiceError,
};
use herald::provider::domain::{ProviderConfigurationError, ProviderKind};
use rstest::rstest;

#[test]
fn chat_only_document_parses() -> Result<()> {
    let config = DeliveryConfig::from_json_str(CHAT_ONLY_CONFIG)?;

    assert_eq!(config.queue, CHAT_QUEUE);
    assert!(config.providers.ses.is_none());
    assert_eq!(
        config.providers.slack.map(|slack| slack.bot_token),
        Some("xoxb-test".to_owned())
    );
    assert_eq!(config.validation.max_idempotency_key_length, 255);
    Ok(())
}

#[test]
fn empty_document_uses_defaults() -> Result<()> {
    let config = DeliveryConfig::from_json_str("{}")?;

    assert_eq!(config, DeliveryConfig::default());
    assert_eq!(config.queue.attempts, 3);
    assert_eq!(config.queue.backoff_base_ms, 1_000);
    Ok(())
}

#[rstest]
#[case(Channel::Email, ProviderKind::Ses)]
#[case(Channel::Push, ProviderKind::SnsPush)]
#[case(Channel::Sms, ProviderKind::TwilioSms)]
#[case(Channel::Whatsapp, ProviderKind::TwilioWhatsapp)]
#[case(Channel::Web, ProviderKind::Webhook)]
fn unlisted_channels_use_their_default_provider(
    #[case] channel: Channel,
    #[case] expected: ProviderKind,
) {
    assert_eq!(DeliveryConfig::default().provider_for(channel), expected);
}

#[test]
fn channels_cannot_map_to_another_channels_provider() {
    let document = r#"{ "channel_providers": { "sms": "slack" } }"#;

    let err = DeliveryConfig::from_json_str(document).expect_err("mismatch");

    assert!(matches!(
        err,
        ConfigError::Provider(ProviderConfigurationError::ChannelMismatch {
            channel: Channel::Sms,
            provider: ProviderKind::Slack,
        })
    ));
}

#[test]
fn malformed_documents_are_parse_errors() {
    let err = DeliveryConfig::from_json_str(r#"{ "queue": { "attempts": "three" } }"#)
        .expect_err("bad type");

    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn key_limits_are_capped_at_the_stored_column_width() -> Result<()> {
    let config = DeliveryConfig::from_json_str(
        r#"{ "validation": { "max_idempotency_key_length": 4096 } }"#,
    )?;

    assert_eq!(
        config.validation.max_idempotency_key_length,
        MAX_STORED_IDEMPOTENCY_KEY_LENGTH
    );
    Ok(())
}

#[tokio::test]
async fn validation_limits_come_from_the_document() -> Result<()> {
    let config = DeliveryConfig::from_json_str(
        r#"{ "validation": { "max_idempotency_key_length": 4 } }"#,
    )?;
    let stack = Stack::new(&config, ScriptedTransport::new(chat_apis_accept));

    let err = stack
        .service
        .create_message(&RawEnvelope::new("too-long", "hi").with_channels(["slack"]))
        .await
        .expect_err("key too long");

    assert!(matches!(err, MessageServiceError::Validation(_)));
    assert_eq!(stack.store.message_count()?, 0);
    Ok(())
}
