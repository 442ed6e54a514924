//! Integration tests for the model invocation gateway
//!
//! Covers the adapters end to end against mock upstreams:
//! - OpenAI-compatible REST calls (invoke, streaming, embeddings, models, costs)
//! - Yandex folder substitution and credential checks
//! - Bedrock family adapters over a recording transport
//! - Bedrock SigV4 transport against a mock runtime endpoint
//! - Configuration loading into a working registry

pub mod fixtures;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_providers::*;

#[cfg(test)]
mod bedrock_tests;
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod openai_tests;
#[cfg(test)]
mod streaming_tests;
#[cfg(test)]
mod yandex_tests;
