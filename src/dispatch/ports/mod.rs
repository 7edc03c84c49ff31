//! Port contracts for job dispatch.

pub mod queue;

pub use queue::{FailOutcome, JobConsumer, JobQueue, ReservedJob};

#[cfg(test)]
pub use queue::MockJobQueue;
