//! Capability traits implemented by every adapter.

use crate::error::GatewayResult;
use crate::request::{EmbeddingsRequest, ModelInvocationRequest};
use crate::response::{EmbeddingsResponse, ModelResponse};
use crate::streaming::StreamCallbacks;
use crate::types::ProviderKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generation capability shared by all adapters.
///
/// Adapters are built once per connection configuration and reused; they hold
/// no per-call state, so calls may run concurrently.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Adapter identifier
    fn id(&self) -> &str;

    /// Backend kind
    fn kind(&self) -> ProviderKind;

    /// Generate a complete response
    async fn invoke(&self, request: &ModelInvocationRequest) -> GatewayResult<ModelResponse>;

    /// Generate a response token by token.
    ///
    /// Never fails directly: every failure is delivered through
    /// [`StreamCallbacks::on_error`].
    async fn invoke_streaming(
        &self,
        request: &ModelInvocationRequest,
        callbacks: &mut dyn StreamCallbacks,
    );

    /// Compute an embedding vector
    async fn embed(&self, request: &EmbeddingsRequest) -> GatewayResult<EmbeddingsResponse>;
}

/// Account-level information a provider exposes besides generation
#[async_trait]
pub trait ProviderAccount: Send + Sync {
    /// Connection summary
    fn info(&self) -> ProviderInfo;

    /// Models offered by the provider
    async fn models(&self) -> GatewayResult<Vec<ModelInfo>>;

    /// Spend over a period
    async fn costs(&self, range: CostRange) -> GatewayResult<UsageCosts>;
}

/// Connection summary of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Backend kind
    pub kind: ProviderKind,
    /// Display name
    pub name: String,
    /// Whether all required credentials are present
    pub is_connected: bool,
    /// Whether `costs` can return data
    pub costs_info_available: bool,
    /// Extra provider-specific details
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl ProviderInfo {
    /// Create provider info
    pub fn new(kind: ProviderKind, is_connected: bool, costs_info_available: bool) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            is_connected,
            costs_info_available,
            details: HashMap::new(),
        }
    }

    /// Add a detail entry
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Input/output modality of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text
    Text,
    /// Image
    Image,
    /// Embedding vector
    Embedding,
}

/// Model catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model id or URI passed as `model_id`
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning provider
    pub provider: ProviderKind,
    /// Context window in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<u32>,
    /// Accepted input modalities
    pub input_formats: Vec<Modality>,
    /// Produced output modalities
    pub output_formats: Vec<Modality>,
    /// Whether streaming is supported
    pub streaming: bool,
}

impl ModelInfo {
    /// Create a text-in/text-out model entry
    pub fn text(id: impl Into<String>, name: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider,
            max_input_tokens: None,
            input_formats: vec![Modality::Text],
            output_formats: vec![Modality::Text],
            streaming: true,
        }
    }

    /// Create an embedding model entry
    pub fn embedding(
        id: impl Into<String>,
        name: impl Into<String>,
        provider: ProviderKind,
    ) -> Self {
        Self {
            output_formats: vec![Modality::Embedding],
            streaming: false,
            ..Self::text(id, name, provider)
        }
    }

    /// Set the context window
    #[must_use]
    pub const fn with_max_input_tokens(mut self, tokens: u32) -> Self {
        self.max_input_tokens = Some(tokens);
        self
    }

    /// Mark the model as accepting images
    #[must_use]
    pub fn with_image_input(mut self) -> Self {
        if !self.input_formats.contains(&Modality::Image) {
            self.input_formats.push(Modality::Image);
        }
        self
    }
}

/// Time window for a cost query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl CostRange {
    /// Window covering the last `days` days up to now
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

/// Spend over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCosts {
    /// Queried window
    pub range: CostRange,
    /// Total amount
    pub total: f64,
    /// Currency code
    pub currency: String,
    /// Amount per project or account
    #[serde(default)]
    pub by_project: HashMap<String, f64>,
}
