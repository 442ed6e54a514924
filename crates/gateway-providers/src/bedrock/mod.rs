//! AWS Bedrock model-family adapters.
//!
//! Bedrock has no shared wire format: every model family expects its own
//! request body and returns its own response shape. Each family implements
//! [`BedrockModelFamily`] (build parameters, parse response) and is wrapped in
//! a [`BedrockAdapter`] that plugs it into the [`ModelProvider`] contract on
//! top of a shared [`BedrockTransport`].

mod ai21;
mod amazon;
mod anthropic;
mod cohere;
pub mod event_stream;
mod fields;
mod meta;
mod mistral;
mod sigv4;
mod transcript;
pub mod transport;

pub use ai21::Ai21Family;
pub use amazon::AmazonFamily;
pub use anthropic::AnthropicFamily;
pub use cohere::CohereFamily;
pub use meta::MetaFamily;
pub use mistral::MistralFamily;
pub use transport::{BedrockOutput, BedrockTransport, SigV4Transport};

use async_trait::async_trait;
use futures::StreamExt;
use gateway_core::{
    BedrockConnection, CostRange, EmbeddingsRequest, EmbeddingsResponse, GatewayError,
    GatewayResult, ModelInfo, ModelInvocationRequest, ModelProvider, ModelResponse,
    ProviderAccount, ProviderInfo, ProviderKind, StreamCallbacks, StreamRelay, Usage,
    UsageCosts, UsageReport,
};
use gateway_telemetry::invocation_span;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// Request handed to the Bedrock transport
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeModelParams {
    /// Model id or inference-profile id
    pub model_id: String,
    /// Family-specific JSON body
    pub body: Value,
}

impl InvokeModelParams {
    /// Create parameters for `model_id`
    pub fn new(model_id: impl Into<String>, body: Value) -> Self {
        Self {
            model_id: model_id.into(),
            body,
        }
    }

    /// Serialized body
    pub fn body_bytes(&self) -> GatewayResult<Vec<u8>> {
        serde_json::to_vec(&self.body).map_err(|e| {
            GatewayError::validation(
                format!("Failed to serialize request: {e}"),
                None,
                "serialization_error",
            )
        })
    }
}

/// Wire format of one Bedrock model family
pub trait BedrockModelFamily: Send + Sync + 'static {
    /// Family name used in logs and errors
    const NAME: &'static str;

    /// Build the invoke body; fails fast on input the family cannot express
    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams>;

    /// Parse an invoke response; unexpected shapes degrade to empty content
    fn parse_response(&self, body: &Value) -> ModelResponse;

    /// Text carried by one streaming chunk
    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        let content = self.parse_response(chunk).content;
        (!content.is_empty()).then_some(content)
    }

    /// Build an embeddings body
    fn build_embeddings_params(
        &self,
        _request: &EmbeddingsRequest,
    ) -> GatewayResult<InvokeModelParams> {
        Err(GatewayError::unsupported(
            ProviderKind::AwsBedrock.display_name(),
            format!("Embeddings for {} models", Self::NAME),
        ))
    }

    /// Parse an embeddings response
    fn parse_embeddings(&self, _body: &Value) -> EmbeddingsResponse {
        EmbeddingsResponse::new(Vec::new(), 0)
    }
}

/// Bedrock model family, detected from the model id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Amazon Titan and Nova
    Amazon,
    /// Anthropic Claude
    Anthropic,
    /// AI21 Jamba and Jurassic
    Ai21,
    /// Cohere Command and Embed
    Cohere,
    /// Meta Llama
    Meta,
    /// Mistral
    Mistral,
}

/// Cross-region inference-profile prefixes
const REGION_PREFIXES: &[&str] = &["us.", "eu.", "apac.", "global."];

impl ModelFamily {
    /// Every family
    pub const ALL: [Self; 6] = [
        Self::Amazon,
        Self::Anthropic,
        Self::Ai21,
        Self::Cohere,
        Self::Meta,
        Self::Mistral,
    ];

    /// Detect the family from a model id
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        let base = base_model_id(model_id);
        if base.starts_with("amazon.") {
            Some(Self::Amazon)
        } else if base.starts_with("anthropic.") {
            Some(Self::Anthropic)
        } else if base.starts_with("ai21.") {
            Some(Self::Ai21)
        } else if base.starts_with("cohere.") {
            Some(Self::Cohere)
        } else if base.starts_with("meta.") {
            Some(Self::Meta)
        } else if base.starts_with("mistral.") {
            Some(Self::Mistral)
        } else {
            None
        }
    }

    /// Family name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Amazon => AmazonFamily::NAME,
            Self::Anthropic => AnthropicFamily::NAME,
            Self::Ai21 => Ai21Family::NAME,
            Self::Cohere => CohereFamily::NAME,
            Self::Meta => MetaFamily::NAME,
            Self::Mistral => MistralFamily::NAME,
        }
    }
}

/// Model id without a cross-region inference-profile prefix
pub fn base_model_id(model_id: &str) -> &str {
    REGION_PREFIXES
        .iter()
        .find_map(|prefix| model_id.strip_prefix(prefix))
        .unwrap_or(model_id)
}

/// A family wired to the shared transport
pub struct BedrockAdapter<F> {
    id: String,
    family: F,
    transport: Arc<dyn BedrockTransport>,
}

impl<F: BedrockModelFamily> BedrockAdapter<F> {
    /// Create an adapter
    pub fn new(id: impl Into<String>, family: F, transport: Arc<dyn BedrockTransport>) -> Self {
        Self {
            id: id.into(),
            family,
            transport,
        }
    }
}

impl<F> std::fmt::Debug for BedrockAdapter<F>
where
    F: BedrockModelFamily,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockAdapter")
            .field("id", &self.id)
            .field("family", &F::NAME)
            .finish_non_exhaustive()
    }
}

/// Parse a response body, degrading to `null` when it is not JSON
fn parse_body(family: &str, body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!(family, error = %e, "Bedrock response is not JSON, using empty result");
        Value::Null
    })
}

/// Usage carried by the final chunk of a Bedrock stream
fn invocation_metrics(chunk: &Value) -> Option<Usage> {
    let metrics = chunk.get("amazon-bedrock-invocationMetrics")?;
    Some(Usage::new(
        fields::u64_at(metrics, "/inputTokenCount"),
        fields::u64_at(metrics, "/outputTokenCount"),
    ))
}

#[async_trait]
impl<F: BedrockModelFamily> ModelProvider for BedrockAdapter<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::AwsBedrock
    }

    async fn invoke(&self, request: &ModelInvocationRequest) -> GatewayResult<ModelResponse> {
        let span = invocation_span!(ProviderKind::AwsBedrock, request.model_id, "invoke");
        let params = self.family.build_params(request)?;
        debug!(family = F::NAME, model = %params.model_id, "Invoking Bedrock model");

        let output = self.transport.invoke_model(&params).instrument(span).await?;
        let body = parse_body(F::NAME, &output.body);
        let mut response = self.family.parse_response(&body);

        let usage = &mut response.metadata.usage;
        if usage.input_tokens == 0 {
            usage.input_tokens = output.input_tokens.unwrap_or(0);
        }
        if usage.output_tokens == 0 {
            usage.output_tokens = output.output_tokens.unwrap_or(0);
        }
        Ok(response)
    }

    async fn invoke_streaming(
        &self,
        request: &ModelInvocationRequest,
        callbacks: &mut dyn StreamCallbacks,
    ) {
        let span = invocation_span!(ProviderKind::AwsBedrock, request.model_id, "stream");
        let mut relay = StreamRelay::new(callbacks);

        let params = match self.family.build_params(request) {
            Ok(params) => params,
            Err(e) => {
                relay.error(e);
                return;
            }
        };
        debug!(family = F::NAME, model = %params.model_id, "Streaming Bedrock model");

        let mut stream = match self
            .transport
            .invoke_model_stream(&params)
            .instrument(span)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                relay.error(e);
                return;
            }
        };
        relay.start();

        let mut usage = UsageReport::Unknown;
        while let Some(item) = stream.next().await {
            let payload = match item {
                Ok(payload) => payload,
                Err(e) => {
                    relay.error(e);
                    return;
                }
            };
            let chunk: Value = match serde_json::from_slice(&payload) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(family = F::NAME, error = %e, "Skipping malformed stream chunk");
                    continue;
                }
            };
            if let Some(metrics) = invocation_metrics(&chunk) {
                usage = UsageReport::Known(metrics);
            }
            if let Some(text) = self.family.parse_stream_chunk(&chunk) {
                relay.token(&text);
            }
        }

        relay.complete(usage);
    }

    async fn embed(&self, request: &EmbeddingsRequest) -> GatewayResult<EmbeddingsResponse> {
        let span = invocation_span!(ProviderKind::AwsBedrock, request.model_id, "embed");
        let params = self.family.build_embeddings_params(request)?;
        debug!(family = F::NAME, model = %params.model_id, "Embedding with Bedrock model");

        let output = self.transport.invoke_model(&params).instrument(span).await?;
        let mut response = self
            .family
            .parse_embeddings(&parse_body(F::NAME, &output.body));
        if response.metadata.usage.input_tokens == 0 {
            response.metadata.usage.input_tokens = output.input_tokens.unwrap_or(0);
        }
        Ok(response)
    }
}

/// Adapter for the family that serves `model_id`
pub fn bedrock_adapter_for(
    model_id: &str,
    transport: Arc<dyn BedrockTransport>,
) -> GatewayResult<Arc<dyn ModelProvider>> {
    let family = ModelFamily::from_model_id(model_id).ok_or_else(|| {
        GatewayError::validation(
            format!("Unsupported Bedrock model family for: {model_id}"),
            Some("model_id".to_string()),
            "unknown_model_family",
        )
    })?;
    Ok(family_adapter(family, transport))
}

/// Adapter for `family`
pub fn family_adapter(
    family: ModelFamily,
    transport: Arc<dyn BedrockTransport>,
) -> Arc<dyn ModelProvider> {
    let id = format!("bedrock-{}", family.name());
    match family {
        ModelFamily::Amazon => Arc::new(BedrockAdapter::new(id, AmazonFamily, transport)),
        ModelFamily::Anthropic => Arc::new(BedrockAdapter::new(id, AnthropicFamily, transport)),
        ModelFamily::Ai21 => Arc::new(BedrockAdapter::new(id, Ai21Family, transport)),
        ModelFamily::Cohere => Arc::new(BedrockAdapter::new(id, CohereFamily, transport)),
        ModelFamily::Meta => Arc::new(BedrockAdapter::new(id, MetaFamily, transport)),
        ModelFamily::Mistral => Arc::new(BedrockAdapter::new(id, MistralFamily, transport)),
    }
}

/// Static Bedrock catalog
pub fn bedrock_models() -> Vec<ModelInfo> {
    let kind = ProviderKind::AwsBedrock;
    vec![
        ModelInfo::text("anthropic.claude-3-5-sonnet-20241022-v2:0", "Claude 3.5 Sonnet v2", kind)
            .with_max_input_tokens(200_000)
            .with_image_input(),
        ModelInfo::text("anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku", kind)
            .with_max_input_tokens(200_000)
            .with_image_input(),
        ModelInfo::text("amazon.nova-pro-v1:0", "Nova Pro", kind).with_max_input_tokens(300_000),
        ModelInfo::text("amazon.nova-lite-v1:0", "Nova Lite", kind).with_max_input_tokens(300_000),
        ModelInfo::text("amazon.titan-text-express-v1", "Titan Text G1 - Express", kind)
            .with_max_input_tokens(8_000),
        ModelInfo::embedding("amazon.titan-embed-text-v2:0", "Titan Text Embeddings V2", kind)
            .with_max_input_tokens(8_000),
        ModelInfo::text("ai21.jamba-1-5-large-v1:0", "Jamba 1.5 Large", kind)
            .with_max_input_tokens(256_000),
        ModelInfo::text("cohere.command-r-plus-v1:0", "Command R+", kind)
            .with_max_input_tokens(128_000),
        ModelInfo::embedding("cohere.embed-multilingual-v3", "Embed Multilingual", kind)
            .with_max_input_tokens(512),
        ModelInfo::text("meta.llama3-70b-instruct-v1:0", "Llama 3 70B Instruct", kind)
            .with_max_input_tokens(8_000),
        ModelInfo::text("mistral.mistral-large-2402-v1:0", "Mistral Large", kind)
            .with_max_input_tokens(32_000),
        ModelInfo::text("mistral.mixtral-8x7b-instruct-v0:1", "Mixtral 8x7B Instruct", kind)
            .with_max_input_tokens(32_000),
    ]
}

/// Account surface for a Bedrock connection
#[derive(Debug, Clone)]
pub struct BedrockAccount {
    region: String,
    connected: bool,
}

impl BedrockAccount {
    /// Describe `connection`
    pub fn new(connection: &BedrockConnection) -> Self {
        Self {
            region: connection.region.clone(),
            connected: connection.has_credentials(),
        }
    }
}

#[async_trait]
impl ProviderAccount for BedrockAccount {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(ProviderKind::AwsBedrock, self.connected, false)
            .with_detail("region", self.region.clone())
    }

    async fn models(&self) -> GatewayResult<Vec<ModelInfo>> {
        Ok(bedrock_models())
    }

    async fn costs(&self, _range: CostRange) -> GatewayResult<UsageCosts> {
        Err(GatewayError::unsupported(
            ProviderKind::AwsBedrock.display_name(),
            "Cost retrieval",
        ))
    }
}
