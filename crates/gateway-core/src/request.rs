//! Request types for the gateway.
//!
//! Every adapter consumes the same canonical shapes defined here; turning them
//! into a provider wire format is entirely the adapter's job.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical generation request shared by every adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInvocationRequest {
    /// Target model id (e.g. "gpt-5-mini", "anthropic.claude-3-haiku-20240307-v1:0")
    pub model_id: String,

    /// System prompt injected ahead of the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Ordered conversation
    #[serde(default)]
    pub messages: Vec<ModelMessage>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Top-p (nucleus sampling) parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl ModelInvocationRequest {
    /// Create a new builder for `ModelInvocationRequest`
    #[must_use]
    pub fn builder() -> ModelInvocationRequestBuilder {
        ModelInvocationRequestBuilder::default()
    }

    /// System prompt, if present and not blank
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }

    /// Validate sampling parameters and model id
    ///
    /// # Errors
    /// Returns error if any field is out of range
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.model_id.trim().is_empty() {
            return Err(GatewayError::validation(
                "model id cannot be empty",
                Some("modelId".to_string()),
                "missing_model",
            ));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(GatewayError::validation(
                    format!("temperature must be between 0.0 and 2.0, got {temperature}"),
                    Some("temperature".to_string()),
                    "invalid_temperature",
                ));
            }
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(GatewayError::validation(
                    format!("top_p must be between 0.0 and 1.0, got {top_p}"),
                    Some("topP".to_string()),
                    "invalid_top_p",
                ));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(GatewayError::validation(
                "max_tokens must be greater than 0",
                Some("maxTokens".to_string()),
                "invalid_max_tokens",
            ));
        }

        Ok(())
    }
}

/// Builder for `ModelInvocationRequest`
#[derive(Debug, Default)]
pub struct ModelInvocationRequestBuilder {
    model_id: Option<String>,
    system_prompt: Option<String>,
    messages: Vec<ModelMessage>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
}

impl ModelInvocationRequestBuilder {
    /// Set the model id
    #[must_use]
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the messages
    #[must_use]
    pub fn messages(mut self, messages: Vec<ModelMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a message
    #[must_use]
    pub fn message(mut self, message: ModelMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max_tokens
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set top_p
    #[must_use]
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Build the request
    ///
    /// An empty message list is accepted here; adapters that need at least
    /// one message reject it when building their parameters.
    ///
    /// # Errors
    /// Returns error if the model id is missing or a parameter is out of range
    pub fn build(self) -> Result<ModelInvocationRequest, GatewayError> {
        let model_id = self.model_id.ok_or_else(|| {
            GatewayError::validation(
                "model id is required",
                Some("modelId".to_string()),
                "missing_model",
            )
        })?;

        let request = ModelInvocationRequest {
            model_id,
            system_prompt: self.system_prompt,
            messages: self.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        };

        request.validate()?;

        Ok(request)
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    /// Author of the turn
    pub role: MessageRole,

    /// Turn content
    pub body: MessageBody,
}

impl ModelMessage {
    /// Create a message with an arbitrary role
    pub fn new(role: MessageRole, body: impl Into<MessageBody>) -> Self {
        Self {
            role,
            body: body.into(),
        }
    }

    /// Create a user message
    pub fn user(body: impl Into<MessageBody>) -> Self {
        Self::new(MessageRole::User, body)
    }

    /// Create an assistant message
    pub fn assistant(body: impl Into<MessageBody>) -> Self {
        Self::new(MessageRole::Assistant, body)
    }

    /// Create a system message
    pub fn system(body: impl Into<MessageBody>) -> Self {
        Self::new(MessageRole::System, body)
    }

    /// Create an error message (a failed assistant turn kept for replay)
    pub fn error(body: impl Into<MessageBody>) -> Self {
        Self::new(MessageRole::Error, body)
    }

    /// Text content of the message, parts joined with `separator`
    pub fn text(&self, separator: &str) -> String {
        self.body.text(separator)
    }
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End user
    User,
    /// Model
    Assistant,
    /// Instructions for the model
    System,
    /// Failed model turn; replayed like an assistant turn
    Error,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Plain text or an ordered list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    /// Plain text
    Text(String),
    /// Multipart content
    Parts(Vec<ContentPart>),
}

impl MessageBody {
    /// Concatenate text content, parts joined with `separator`.
    /// Non-text parts are ignored.
    pub fn text(&self, separator: &str) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| part.content_type == ContentType::Text)
                .map(|part| part.content.as_str())
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageBody {
    fn from(parts: Vec<ContentPart>) -> Self {
        Self::Parts(parts)
    }
}

/// One part of a multipart message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    /// Part type
    pub content_type: ContentType,

    /// Text, or an image URL (`data:` URLs carry the bytes inline)
    pub content: String,

    /// MIME type when `content` is raw base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Text,
            content: text.into(),
            mime_type: None,
        }
    }

    /// Create an image part from a URL or data URL
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Image,
            content: url.into(),
            mime_type: None,
        }
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Whether the part has no content
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Content part type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Text
    Text,
    /// Image
    Image,
    /// Video
    Video,
    /// Audio
    Audio,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Embeddings request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingsRequest {
    /// Embedding model id
    pub model_id: String,

    /// Text to embed
    pub input: String,

    /// Requested vector size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

impl EmbeddingsRequest {
    /// Create an embeddings request
    pub fn new(model_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            input: input.into(),
            dimensions: None,
        }
    }

    /// Set the output dimensions
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}
