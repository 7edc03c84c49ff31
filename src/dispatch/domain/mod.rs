//! Dispatch domain: channel jobs, queue options, and errors.

mod error;
mod job;
mod options;

pub use error::{EnqueueError, ProcessError, QueueError};
pub use job::{CHANNEL_JOB_NAME, ChannelJob, JobContext, JobId};
pub use options::{Backoff, JobOptions, QueuePolicy, delay_until, priority_value};
