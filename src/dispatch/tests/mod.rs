//! Unit tests for job dispatch.

mod enqueue_tests;
mod options_tests;
