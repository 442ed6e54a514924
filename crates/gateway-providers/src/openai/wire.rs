//! OpenAI REST API types.
//!
//! Response types default every field so a payload with an unexpected shape
//! still deserializes; missing values surface as empty content or zero usage.

use gateway_core::Usage;
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionParams {
    /// Model id
    pub model: String,
    /// Conversation
    pub messages: Vec<ChatMessageParam>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Output token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Server-sent events
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// Streaming options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

/// Streaming options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamOptions {
    /// Ask for a trailing usage chunk
    pub include_usage: bool,
}

/// Wire role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for reasoning models
    Developer,
    /// Instructions
    System,
    /// End user
    User,
    /// Model
    Assistant,
}

/// One message of the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessageParam {
    /// Author role
    pub role: ChatRole,
    /// Content
    pub content: ChatContent,
}

impl ChatMessageParam {
    /// Text message
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: ChatContent::Text(text.into()),
        }
    }
}

/// Message content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatContent {
    /// Plain text
    Text(String),
    /// Content parts
    Parts(Vec<ChatContentPart>),
}

/// Content part
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    /// Text part
    Text {
        /// Text
        text: String,
    },
    /// Image part
    ImageUrl {
        /// Image location
        image_url: ImageUrl,
    },
}

/// Image location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    /// HTTP(S) or data URL
    pub url: String,
}

/// Body of `POST /embeddings`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmbeddingsParams<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

impl ChatCompletionResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PromptTokensDetails {
    pub cached_tokens: u64,
}

impl From<ChatUsage> for Usage {
    fn from(usage: ChatUsage) -> Self {
        Self::new(usage.prompt_tokens, usage.completion_tokens).with_cache_read(
            usage
                .prompt_tokens_details
                .map_or(0, |details| details.cached_tokens),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatCompletionChunk {
    pub choices: Vec<ChunkChoice>,
    pub usage: Option<ChatUsage>,
    /// Upstream failure reported inside the stream
    pub error: Option<ApiErrorBody>,
}

impl ChatCompletionChunk {
    /// Text delta; reasoning text counts when no regular content is present
    pub fn delta_text(&self) -> Option<&str> {
        let delta = &self.choices.first()?.delta;
        delta
            .content
            .as_deref()
            .filter(|text| !text.is_empty())
            .or(delta.reasoning_content.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChunkChoice {
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChunkDelta {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EmbeddingsApiResponse {
    pub data: Vec<EmbeddingData>,
    pub usage: Option<EmbeddingsApiUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EmbeddingData {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EmbeddingsApiUsage {
    pub prompt_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl ApiErrorBody {
    /// `message (type)`, or the bare message when untyped
    pub fn describe(self) -> String {
        match self.error_type {
            Some(kind) => format!("{} ({kind})", self.message),
            None => self.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModelsList {
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModelEntry {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CostsPage {
    pub data: Vec<CostBucket>,
    pub has_more: bool,
    pub next_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CostBucket {
    pub results: Vec<CostResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CostResult {
    pub amount: CostAmount,
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CostAmount {
    pub value: f64,
    pub currency: String,
}
