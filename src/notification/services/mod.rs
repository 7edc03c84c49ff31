//! Application services for message acceptance and status aggregation.

mod aggregator;
mod message;

pub use aggregator::{AggregationError, StatusAggregator, aggregate_status};
pub use message::{
    CreateReceipt, DEFAULT_STATUS_TIMEOUT, MessageService, MessageServiceError,
    MessageServiceResult, MessageView, ProviderCallback, ReadOptions,
};
