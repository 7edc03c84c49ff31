//! Infrastructure adapters for dispatch ports.

pub mod memory;

pub use memory::{DeadLetter, InMemoryJobQueue};
