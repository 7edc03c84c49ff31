//! Domain model for notification delivery.
//!
//! Envelopes, messages, attempts, and events live here. Infrastructure
//! concerns stay outside the domain boundary.

mod attempt;
mod channel;
mod envelope;
mod error;
mod event;
mod ids;
mod message;

pub use attempt::{Attempt, AttemptStatus, FailureDetail, PersistedAttemptData};
pub use channel::{Channel, Priority};
pub(crate) use envelope::EnvelopeParts;
pub use envelope::{Envelope, Identity, Payload, PayloadOverride, RawEnvelope, Recipients};
pub use error::{AttemptTransitionError, FieldViolation, ParseDomainValueError, ValidationError};
pub use event::{DeliveryEvent, EventType, PersistedEventData};
pub use ids::{AttemptId, EventId, IdempotencyKey, MessageId};
pub use message::{Message, MessageStatus, PersistedMessageData};
