//! Conversions between domain aggregates and Diesel rows.

use super::models::{AttemptRow, EventRow, MessageRow, NewEventRow};
use crate::notification::{
    domain::{
        Attempt, AttemptId, AttemptStatus, Channel, DeliveryEvent, Envelope, EventId, EventType,
        FailureDetail, Message, MessageId, MessageStatus, PersistedAttemptData,
        PersistedEventData, PersistedMessageData,
    },
    ports::{RepositoryError, RepositoryResult},
};
use crate::provider::domain::ProviderKind;

pub(crate) fn message_to_row(message: &Message) -> RepositoryResult<MessageRow> {
    let envelope = serde_json::to_value(message.envelope())
        .map_err(|err| RepositoryError::serialization(err.to_string()))?;
    Ok(MessageRow {
        id: message.id().into_inner(),
        idempotency_key: message.idempotency_key().as_str().to_owned(),
        envelope,
        status: message.status().as_str().to_owned(),
        version: message.version(),
        created_at: message.created_at(),
        updated_at: message.updated_at(),
    })
}

pub(crate) fn row_to_message(row: MessageRow) -> RepositoryResult<Message> {
    let envelope = serde_json::from_value::<Envelope>(row.envelope)
        .map_err(|err| RepositoryError::serialization(err.to_string()))?;
    if envelope.idempotency_key().as_str() != row.idempotency_key {
        return Err(RepositoryError::serialization(format!(
            "envelope key does not match row key '{}'",
            row.idempotency_key
        )));
    }
    let status = MessageStatus::try_from(row.status.as_str())
        .map_err(|err| RepositoryError::serialization(err.to_string()))?;
    Ok(Message::from_persisted(PersistedMessageData {
        id: MessageId::from_uuid(row.id),
        envelope,
        status,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn attempt_to_row(attempt: &Attempt) -> AttemptRow {
    AttemptRow {
        id: attempt.id().into_inner(),
        message_id: attempt.message_id().into_inner(),
        channel: attempt.channel().as_str().to_owned(),
        provider: attempt.provider().as_str().to_owned(),
        status: attempt.status().as_str().to_owned(),
        error_code: attempt.error().map(|error| error.code.clone()),
        error_message: attempt.error().map(|error| error.message.clone()),
        external_id: attempt.external_id().map(ToOwned::to_owned),
        started_at: attempt.started_at(),
        finished_at: attempt.finished_at(),
        created_at: attempt.created_at(),
    }
}

pub(crate) fn row_to_attempt(row: AttemptRow) -> RepositoryResult<Attempt> {
    let AttemptRow {
        id,
        message_id,
        channel,
        provider,
        status,
        error_code,
        error_message,
        external_id,
        started_at,
        finished_at,
        created_at,
    } = row;

    let error = match (error_code, error_message) {
        (Some(code), message) => Some(FailureDetail::new(code, message.unwrap_or_default())),
        (None, _) => None,
    };

    Ok(Attempt::from_persisted(PersistedAttemptData {
        id: AttemptId::from_uuid(id),
        message_id: MessageId::from_uuid(message_id),
        channel: parse_channel(&channel)?,
        provider: parse_provider(&provider)?,
        status: AttemptStatus::try_from(status.as_str())
            .map_err(|err| RepositoryError::serialization(err.to_string()))?,
        error,
        external_id,
        started_at,
        finished_at,
        created_at,
    }))
}

pub(crate) fn event_to_row(event: &DeliveryEvent) -> NewEventRow {
    NewEventRow {
        id: event.id().into_inner(),
        message_id: event.message_id().into_inner(),
        event_type: event.event_type().as_str().to_owned(),
        channel: event.channel().map(|channel| channel.as_str().to_owned()),
        provider: event.provider().map(|provider| provider.as_str().to_owned()),
        payload: event.payload().cloned(),
        created_at: event.created_at(),
    }
}

pub(crate) fn row_to_event(row: EventRow) -> RepositoryResult<DeliveryEvent> {
    Ok(DeliveryEvent::from_persisted(PersistedEventData {
        id: EventId::from_uuid(row.id),
        message_id: MessageId::from_uuid(row.message_id),
        event_type: EventType::try_from(row.event_type.as_str())
            .map_err(|err| RepositoryError::serialization(err.to_string()))?,
        channel: row.channel.as_deref().map(parse_channel).transpose()?,
        provider: row.provider.as_deref().map(parse_provider).transpose()?,
        payload: row.payload,
        created_at: row.created_at,
    }))
}

fn parse_channel(value: &str) -> RepositoryResult<Channel> {
    Channel::try_from(value).map_err(|err| RepositoryError::serialization(err.to_string()))
}

fn parse_provider(value: &str) -> RepositoryResult<ProviderKind> {
    ProviderKind::try_from(value).map_err(|err| RepositoryError::serialization(err.to_string()))
}
