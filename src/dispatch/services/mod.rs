//! Dispatch services: fan-out, job processing, and the worker loop.

mod enqueue;
mod processor;
mod worker;

pub use enqueue::ChannelJobEnqueuer;
pub use processor::{ChannelJobProcessor, ProcessOutcome};
pub use worker::{DEFAULT_POLL_INTERVAL, DeliveryWorker};
