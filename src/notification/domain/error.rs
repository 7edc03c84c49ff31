//! Error types for envelope validation and domain value parsing.
//!
//! Validation collects every violated field before returning, so callers can
//! report all problems with a submission at once.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while validating an inbound envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The idempotency key is empty or whitespace-only.
    #[error("idempotency key must not be empty")]
    EmptyIdempotencyKey,

    /// The idempotency key exceeds the configured length limit.
    #[error("idempotency key length {actual} exceeds limit of {max}")]
    IdempotencyKeyTooLong {
        /// Actual key length in characters.
        actual: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// No delivery channels were requested.
    #[error("at least one channel is required")]
    NoChannels,

    /// A channel tag is not part of the supported enumeration.
    #[error("unknown channel '{tag}'")]
    UnknownChannel {
        /// Position in the submitted channel list, when known.
        index: Option<usize>,
        /// The rejected tag.
        tag: String,
    },

    /// The payload text is empty or whitespace-only.
    #[error("payload text must not be empty")]
    EmptyText,

    /// The payload text exceeds the configured length limit.
    #[error("payload text length {actual} exceeds limit of {max}")]
    TextTooLong {
        /// Actual text length in characters.
        actual: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The priority tag is not one of `low`, `normal`, `high`.
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),

    /// A channel override is keyed by an unsupported channel tag.
    #[error("channel override references unknown channel '{0}'")]
    UnknownOverrideChannel(String),

    /// Multiple validation errors occurred.
    #[error("multiple validation errors: {}", format_errors(.0))]
    Multiple(Vec<Self>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One violated field, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Wire path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Combines multiple validation errors into a single error.
    ///
    /// A single error is returned directly rather than wrapped. Nested
    /// `Multiple` values are flattened.
    #[must_use]
    pub fn multiple(errors: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                Self::Multiple(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        if flattened.len() == 1 {
            if let Some(single) = flattened.pop() {
                return single;
            }
        }
        Self::Multiple(flattened)
    }

    /// Returns the wire field this error concerns.
    #[must_use]
    pub fn field(&self) -> String {
        match self {
            Self::EmptyIdempotencyKey | Self::IdempotencyKeyTooLong { .. } => {
                "idempotencyKey".to_owned()
            }
            Self::NoChannels => "channels".to_owned(),
            Self::UnknownChannel {
                index: Some(index), ..
            } => format!("channels[{index}]"),
            Self::UnknownChannel { index: None, .. } => "channels".to_owned(),
            Self::EmptyText | Self::TextTooLong { .. } => "payload.text".to_owned(),
            Self::UnknownPriority(_) => "priority".to_owned(),
            Self::UnknownOverrideChannel(tag) => format!("channelOverrides.{tag}"),
            Self::Multiple(_) => "*".to_owned(),
        }
    }

    /// Returns every individual violation, flattening `Multiple`.
    #[must_use]
    pub fn violations(&self) -> Vec<FieldViolation> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Self::violations).collect(),
            other => vec![FieldViolation {
                field: other.field(),
                message: other.to_string(),
            }],
        }
    }
}

/// Error returned while parsing a stored or wire enumeration value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseDomainValueError {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// The rejected raw value.
    pub value: String,
}

impl ParseDomainValueError {
    /// Creates a parse error for the given enumeration and value.
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Errors raised when an attempt transition violates its state machine.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AttemptTransitionError {
    /// The attempt already reached a terminal status.
    #[error("attempt {0} is already terminal")]
    AlreadyTerminal(super::AttemptId),
}
