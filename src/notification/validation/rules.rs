//! Individual envelope validation rules.
//!
//! Each rule is a pure function over one part of a [`RawEnvelope`]. Rules that
//! normalize return the normalized value on success.

use crate::notification::{
    domain::{Channel, IdempotencyKey, Priority, RawEnvelope, ValidationError},
    ports::validator::ValidationConfig,
};

/// Validates the idempotency key.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyIdempotencyKey`] or
/// [`ValidationError::IdempotencyKeyTooLong`].
pub fn validate_idempotency_key(
    raw: &RawEnvelope,
    config: &ValidationConfig,
) -> Result<IdempotencyKey, ValidationError> {
    let key = IdempotencyKey::new(raw.idempotency_key.as_str())?;
    let length = key.as_str().chars().count();
    if length > config.max_idempotency_key_length {
        return Err(ValidationError::IdempotencyKeyTooLong {
            actual: length,
            max: config.max_idempotency_key_length,
        });
    }
    Ok(key)
}

/// Validates channel tags and collapses duplicates, keeping first occurrence.
///
/// # Errors
///
/// Returns [`ValidationError::NoChannels`] for an empty list and one
/// [`ValidationError::UnknownChannel`] per unsupported tag.
pub fn validate_channels(raw: &RawEnvelope) -> Result<Vec<Channel>, ValidationError> {
    if raw.channels.is_empty() {
        return Err(ValidationError::NoChannels);
    }

    let mut channels = Vec::with_capacity(raw.channels.len());
    let mut errors = Vec::new();
    for (index, tag) in raw.channels.iter().enumerate() {
        match Channel::try_from(tag.as_str()) {
            Ok(channel) if !channels.contains(&channel) => channels.push(channel),
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::UnknownChannel {
                index: Some(index),
                tag: tag.clone(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(channels)
    } else {
        Err(ValidationError::multiple(errors))
    }
}

/// Validates the payload text body.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyText`] or [`ValidationError::TextTooLong`].
pub fn validate_text(raw: &RawEnvelope, config: &ValidationConfig) -> Result<(), ValidationError> {
    let text = raw.payload.text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let length = raw.payload.text.chars().count();
    if length > config.max_text_length {
        return Err(ValidationError::TextTooLong {
            actual: length,
            max: config.max_text_length,
        });
    }
    Ok(())
}

/// Parses the priority tag, defaulting to [`Priority::Normal`].
///
/// # Errors
///
/// Returns [`ValidationError::UnknownPriority`] for unsupported tags.
pub fn validate_priority(raw: &RawEnvelope) -> Result<Priority, ValidationError> {
    raw.priority.as_deref().map_or(Ok(Priority::Normal), |tag| {
        Priority::try_from(tag).map_err(|_| ValidationError::UnknownPriority(tag.to_owned()))
    })
}

/// Validates that override keys are supported channel tags.
///
/// Overrides for channels that were not requested are accepted and ignored
/// at delivery time.
///
/// # Errors
///
/// Returns one [`ValidationError::UnknownOverrideChannel`] per bad key.
pub fn validate_override_channels(raw: &RawEnvelope) -> Result<Vec<Channel>, ValidationError> {
    let mut channels = Vec::with_capacity(raw.channel_overrides.len());
    let mut errors = Vec::new();
    for tag in raw.channel_overrides.keys() {
        match Channel::try_from(tag.as_str()) {
            Ok(channel) => channels.push(channel),
            Err(_) => errors.push(ValidationError::UnknownOverrideChannel(tag.clone())),
        }
    }

    if errors.is_empty() {
        Ok(channels)
    } else {
        Err(ValidationError::multiple(errors))
    }
}
