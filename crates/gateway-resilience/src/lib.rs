//! # Gateway Resilience
//!
//! Retry with exponential backoff for the transport clients used by the
//! provider adapters.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
