//! # Gateway Telemetry
//!
//! Structured logging for the model invocation gateway:
//! - Subscriber setup with env-filter and pretty/compact/JSON output
//! - Span helpers for adapter calls

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod spans;

pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingError};
