//! Utility modules

pub mod retry;

pub use retry::{Attempted, Backoff, RetryError, RetryPolicy, Retryable};
