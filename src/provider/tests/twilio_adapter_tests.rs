//! Tests for the Twilio SMS and WhatsApp adapters.

use crate::notification::domain::{Identity, Payload, RawEnvelope};
use crate::provider::{
    adapters::TwilioProvider,
    domain::{ProviderError, ProviderKind, TwilioSettings},
    ports::{ChannelProvider, HttpMethod, HttpResponse, HttpTransport, MockHttpTransport},
};
use crate::test_support::validated;
use rstest::{fixture, rstest};
use serde_json::Value;
use std::sync::Arc;

#[fixture]
fn settings() -> TwilioSettings {
    TwilioSettings {
        account_sid: "AC123".to_owned(),
        auth_token: "token".to_owned(),
        from_number: Some("+15550001111".to_owned()),
        whatsapp_from: Some("+15550002222".to_owned()),
        messaging_service_sid: None,
        api_base: None,
    }
}

fn sms(settings: TwilioSettings, mock: MockHttpTransport) -> TwilioProvider {
    let transport: Arc<dyn HttpTransport> = Arc::new(mock);
    TwilioProvider::sms(settings, transport).expect("sms provider should build")
}

fn whatsapp(settings: TwilioSettings, mock: MockHttpTransport) -> TwilioProvider {
    let transport: Arc<dyn HttpTransport> = Arc::new(mock);
    TwilioProvider::whatsapp(settings, transport).expect("whatsapp provider should build")
}

fn sms_envelope(recipients: &[&str]) -> RawEnvelope {
    RawEnvelope::new("otp-1", "Your code is 123456")
        .with_channels(["sms", "whatsapp"])
        .with_payload(Payload::text("Your code is 123456").with_title("Acme"))
        .with_recipients(
            recipients
                .iter()
                .map(|number| Identity::new().with_phone(*number)),
        )
}

#[rstest]
fn sms_prepare_sends_title_and_text_from_the_configured_number(settings: TwilioSettings) {
    let prepared = sms(settings, MockHttpTransport::new())
        .prepare(&validated(&sms_envelope(&["+15551234567"])))
        .expect("prepare");

    assert_eq!(prepared.provider(), ProviderKind::TwilioSms);
    let request = prepared.requests().first().expect("one request");
    assert_eq!(request.body.field("To"), Some("+15551234567"));
    assert_eq!(request.body.field("From"), Some("+15550001111"));
    assert_eq!(request.body.field("Body"), Some("Acme\n\nYour code is 123456"));
}

#[rstest]
fn envelope_sender_overrides_the_configured_number(settings: TwilioSettings) {
    let raw = sms_envelope(&["+15551234567"]).with_sender(Identity::new().with_phone("+15559998888"));
    let prepared = sms(settings, MockHttpTransport::new())
        .prepare(&validated(&raw))
        .expect("prepare");

    let request = prepared.requests().first().expect("one request");
    assert_eq!(request.body.field("From"), Some("+15559998888"));
}

#[rstest]
fn messaging_service_takes_precedence_over_numbers(settings: TwilioSettings) {
    let settings = TwilioSettings {
        messaging_service_sid: Some("MG42".to_owned()),
        ..settings
    };
    let prepared = sms(settings, MockHttpTransport::new())
        .prepare(&validated(&sms_envelope(&["+15551234567"])))
        .expect("prepare");

    let request = prepared.requests().first().expect("one request");
    assert_eq!(request.body.field("MessagingServiceSid"), Some("MG42"));
    assert_eq!(request.body.field("From"), None);
}

#[rstest]
fn whatsapp_addresses_are_prefixed(settings: TwilioSettings) {
    let prepared = whatsapp(settings, MockHttpTransport::new())
        .prepare(&validated(&sms_envelope(&["+15551234567"])))
        .expect("prepare");

    let request = prepared.requests().first().expect("one request");
    assert_eq!(request.body.field("To"), Some("whatsapp:+15551234567"));
    assert_eq!(request.body.field("From"), Some("whatsapp:+15550002222"));
}

#[rstest]
#[case::missing_plus("15551234567")]
#[case::too_short("+1555")]
#[case::letters("+1555CALLNOW")]
fn non_e164_numbers_are_rejected(settings: TwilioSettings, #[case] number: &str) {
    let err = sms(settings, MockHttpTransport::new())
        .validate(&validated(&sms_envelope(&[number])))
        .expect_err("invalid number");
    assert_eq!(err.code(), "invalid_recipient");
}

#[rstest]
fn missing_sender_number_is_reported(settings: TwilioSettings) {
    let settings = TwilioSettings {
        from_number: None,
        ..settings
    };
    let err = sms(settings, MockHttpTransport::new())
        .validate(&validated(&sms_envelope(&["+15551234567"])))
        .expect_err("no sender");
    assert_eq!(
        err,
        ProviderError::MissingSender {
            provider: ProviderKind::TwilioSms,
            field: "phone",
        }
    );
}

#[rstest]
#[tokio::test]
async fn send_posts_a_form_with_basic_auth(settings: TwilioSettings) {
    let mut transport = MockHttpTransport::new();
    transport
        .expect_execute()
        .withf(|request| {
            request.method == HttpMethod::Post
                && request.url == "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
                && request.basic_auth == Some(("AC123".to_owned(), "token".to_owned()))
                && request
                    .body
                    .as_deref()
                    .is_some_and(|body| body.starts_with("To=%2B15551234567&From="))
        })
        .times(1)
        .returning(|_| Ok(HttpResponse::new(201, r#"{"sid":"SM100","status":"queued"}"#)));
    let provider = sms(settings, transport);

    let prepared = provider
        .prepare(&validated(&sms_envelope(&["+15551234567"])))
        .expect("prepare");
    let response = provider.send(&prepared).await.expect("send");

    assert!(response.success);
    assert_eq!(response.external_id.as_deref(), Some("SM100"));
}

#[rstest]
#[tokio::test]
async fn one_rejected_recipient_fails_the_send(settings: TwilioSettings) {
    let mut transport = MockHttpTransport::new();
    transport.expect_execute().times(2).returning(|request| {
        if request
            .body
            .as_deref()
            .is_some_and(|body| body.contains("%2B15551234567"))
        {
            Ok(HttpResponse::new(201, r#"{"sid":"SM1"}"#))
        } else {
            Ok(HttpResponse::new(
                400,
                r#"{"code":21211,"message":"Invalid 'To' Phone Number"}"#,
            ))
        }
    });
    let provider = sms(settings, transport);

    let prepared = provider
        .prepare(&validated(&sms_envelope(&["+15551234567", "+15557654321"])))
        .expect("prepare");
    let response = provider.send(&prepared).await.expect("send");

    assert!(!response.success);
    let error = response.error.expect("error detail");
    assert_eq!(error.code, "rejected");
    assert_eq!(error.message, "HTTP 400: 21211 Invalid 'To' Phone Number");
    let results = response
        .data
        .as_ref()
        .and_then(|data| data.get("results"))
        .and_then(Value::as_array)
        .expect("per-recipient results");
    assert_eq!(results.len(), 2);
}

#[rstest]
#[tokio::test]
async fn fetch_status_reads_the_message_resource(settings: TwilioSettings) {
    let mut transport = MockHttpTransport::new();
    transport
        .expect_execute()
        .withf(|request| {
            request.method == HttpMethod::Get
                && request.url
                    == "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages/SM100.json"
        })
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, r#"{"sid":"SM100","status":"delivered"}"#)));
    let provider = sms(settings, transport);

    let report = provider
        .fetch_status("SM100")
        .await
        .expect("status query")
        .expect("known message");

    assert_eq!(report.provider, ProviderKind::TwilioSms);
    assert_eq!(report.external_id, "SM100");
    assert_eq!(report.status, "delivered");
}

#[rstest]
#[tokio::test]
async fn fetch_status_ignores_malformed_identifiers(settings: TwilioSettings) {
    let provider = sms(settings, MockHttpTransport::new());

    let report = provider.fetch_status("../Calls").await.expect("no call");

    assert!(report.is_none());
}

#[rstest]
fn blank_auth_token_fails_construction(settings: TwilioSettings) {
    let settings = TwilioSettings {
        auth_token: String::new(),
        ..settings
    };
    let transport: Arc<dyn HttpTransport> = Arc::new(MockHttpTransport::new());

    assert!(TwilioProvider::sms(settings, transport).is_err());
}
