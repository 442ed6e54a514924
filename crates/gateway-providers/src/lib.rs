//! # Gateway Providers
//!
//! Model provider adapters for the gateway.
//!
//! - OpenAI and any endpoint speaking the OpenAI REST protocol
//! - Yandex Foundation Models (through its OpenAI-compatible endpoint)
//! - AWS Bedrock model families (Amazon, Anthropic, AI21, Cohere, Meta, Mistral)
//!
//! [`ProviderRegistry`] builds the configured adapters from caller-supplied
//! connection parameters.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bedrock;
mod http;
pub mod openai;
pub mod registry;
pub mod yandex;

// Re-export main types
pub use bedrock::{
    bedrock_adapter_for, BedrockAccount, BedrockAdapter, BedrockModelFamily, BedrockTransport,
    ModelFamily, SigV4Transport,
};
pub use openai::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use registry::ProviderRegistry;
pub use yandex::YandexProvider;
