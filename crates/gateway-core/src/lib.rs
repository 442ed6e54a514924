//! # Gateway Core
//!
//! Canonical types and capability traits for the model invocation gateway.
//!
//! This crate provides the foundation every adapter builds on:
//! - Canonical request, message and response shapes
//! - The [`ModelProvider`] capability trait and the [`ProviderAccount`] extension
//! - The streaming callback contract and its ordering guard
//! - The error taxonomy
//! - Connection parameters supplied at adapter construction

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use connection::{
    BedrockConnection, OpenAiConnection, ProviderConnectionParams, YandexConnection,
};
pub use error::{is_retryable_status, ErrorKind, GatewayError, GatewayResult};
pub use provider::{
    CostRange, Modality, ModelInfo, ModelProvider, ProviderAccount, ProviderInfo, UsageCosts,
};
pub use request::{
    ContentPart, ContentType, EmbeddingsRequest, MessageBody, MessageRole, ModelInvocationRequest,
    ModelMessage,
};
pub use response::{EmbeddingsResponse, ModelResponse, ResponseType, Usage, UsageReport};
pub use streaming::{stream_events, ChannelCallbacks, StreamCallbacks, StreamEvent, StreamRelay};
pub use types::{ApiKey, ProviderKind};
