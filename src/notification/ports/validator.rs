//! Validator port for inbound envelopes.

use crate::notification::domain::{Channel, Envelope, FieldViolation, RawEnvelope, ValidationError};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Port for envelope validation.
///
/// Implementations collect every violation before returning, combine them
/// with [`ValidationError::multiple`], and stay channel-agnostic: per-channel
/// identity requirements belong to providers.
pub trait EnvelopeValidator: Send + Sync {
    /// Validates and normalizes a raw envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] enumerating every violated field.
    fn validate(&self, raw: &RawEnvelope) -> ValidationResult<Envelope>;

    /// Validates one channel tag against the closed channel enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownChannel`] for unsupported tags.
    fn validate_channel(&self, tag: &str) -> ValidationResult<Channel> {
        Channel::try_from(tag).map_err(|_| ValidationError::UnknownChannel {
            index: None,
            tag: tag.to_owned(),
        })
    }

    /// Non-failing variant of [`EnvelopeValidator::validate`].
    fn safe_validate(&self, raw: &RawEnvelope) -> ValidationOutcome {
        match self.validate(raw) {
            Ok(envelope) => ValidationOutcome::Valid(envelope),
            Err(error) => ValidationOutcome::Invalid(error),
        }
    }
}

/// Discriminated validation result.
///
/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "error": {"message": ..., "violations": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The envelope is valid.
    Valid(Envelope),
    /// The envelope violated one or more rules.
    Invalid(ValidationError),
}

impl ValidationOutcome {
    /// Returns `true` when validation passed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the validated envelope, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Envelope> {
        match self {
            Self::Valid(envelope) => Some(envelope),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the validation error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(error) => Some(error),
        }
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the validation error for invalid envelopes.
    pub fn into_result(self) -> ValidationResult<Envelope> {
        match self {
            Self::Valid(envelope) => Ok(envelope),
            Self::Invalid(error) => Err(error),
        }
    }
}

struct ErrorBody<'a>(&'a ValidationError);

impl Serialize for ErrorBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let violations: Vec<FieldViolation> = self.0.violations();
        let mut state = serializer.serialize_struct("ValidationError", 2)?;
        state.serialize_field("message", &self.0.to_string())?;
        state.serialize_field("violations", &violations)?;
        state.end()
    }
}

impl Serialize for ValidationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationOutcome", 2)?;
        state.serialize_field("success", &self.is_success())?;
        match self {
            Self::Valid(envelope) => state.serialize_field("data", envelope)?,
            Self::Invalid(error) => state.serialize_field("error", &ErrorBody(error))?,
        }
        state.end()
    }
}

/// Longest idempotency key the message store can hold, in characters.
pub const MAX_STORED_IDEMPOTENCY_KEY_LENGTH: usize = 1024;

/// Configuration for validation limits.
///
/// # Examples
///
/// ```
/// use herald::notification::ports::validator::ValidationConfig;
///
/// let config = ValidationConfig::default();
/// assert_eq!(config.max_idempotency_key_length, 255);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum idempotency key length in characters.
    pub max_idempotency_key_length: usize,
    /// Maximum payload text length in characters.
    pub max_text_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_idempotency_key_length: 255,
            max_text_length: 100_000,
        }
    }
}

impl ValidationConfig {
    /// Clamps the key limit to [`MAX_STORED_IDEMPOTENCY_KEY_LENGTH`], so an
    /// over-long key is a validation error rather than a store failure.
    #[must_use]
    pub const fn capped(self) -> Self {
        if self.max_idempotency_key_length > MAX_STORED_IDEMPOTENCY_KEY_LENGTH {
            Self {
                max_idempotency_key_length: MAX_STORED_IDEMPOTENCY_KEY_LENGTH,
                ..self
            }
        } else {
            self
        }
    }

    /// Creates a lenient configuration with generous limits.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            max_idempotency_key_length: MAX_STORED_IDEMPOTENCY_KEY_LENGTH,
            max_text_length: 1_000_000,
        }
    }

    /// Creates a strict configuration with reduced limits.
    ///
    /// Useful for SMS-first deployments where long bodies are rejected
    /// downstream anyway.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_idempotency_key_length: 128,
            max_text_length: 4_096,
        }
    }
}
