//! Response types for the gateway.

use serde::{Deserialize, Serialize};

/// Canonical generation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Response type, always text
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Generated text, possibly empty
    pub content: String,

    /// Response metadata
    pub metadata: ResponseMetadata,
}

impl ModelResponse {
    /// Create a text response
    pub fn text(content: impl Into<String>, usage: Usage) -> Self {
        Self {
            response_type: ResponseType::Text,
            content: content.into(),
            metadata: ResponseMetadata { usage },
        }
    }

    /// Token usage
    pub const fn usage(&self) -> &Usage {
        &self.metadata.usage
    }
}

/// Response type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Text completion
    Text,
}

/// Metadata attached to a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Token usage
    pub usage: Usage,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Generated tokens
    pub output_tokens: u64,
    /// Prompt tokens served from the provider cache
    pub cache_read_input_tokens: u64,
}

impl Usage {
    /// Create usage from input and output counts
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_read_input_tokens: 0,
        }
    }

    /// Set cached prompt tokens
    #[must_use]
    pub const fn with_cache_read(mut self, cache_read_input_tokens: u64) -> Self {
        self.cache_read_input_tokens = cache_read_input_tokens;
        self
    }

    /// Total billed tokens
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Whether every counter is zero
    pub const fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.cache_read_input_tokens == 0
    }
}

/// Usage delivered with a completed stream.
///
/// Providers only attach usage to some chunks; when none carries it the
/// stream completes with `Unknown` rather than a zero count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "usage", rename_all = "lowercase")]
pub enum UsageReport {
    /// Provider reported usage
    Known(Usage),
    /// No usage-bearing chunk arrived
    #[default]
    Unknown,
}

impl UsageReport {
    /// Usage if known
    pub const fn known(&self) -> Option<&Usage> {
        match self {
            Self::Known(usage) => Some(usage),
            Self::Unknown => None,
        }
    }

    /// Whether usage was reported
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<Option<Usage>> for UsageReport {
    fn from(usage: Option<Usage>) -> Self {
        usage.map_or(Self::Unknown, Self::Known)
    }
}

/// Embeddings result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Response metadata
    pub metadata: EmbeddingsMetadata,
}

impl EmbeddingsResponse {
    /// Create an embeddings response
    pub const fn new(embedding: Vec<f32>, input_tokens: u64) -> Self {
        Self {
            embedding,
            metadata: EmbeddingsMetadata {
                usage: EmbeddingsUsage { input_tokens },
            },
        }
    }
}

/// Embeddings metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingsMetadata {
    /// Token usage
    pub usage: EmbeddingsUsage,
}

/// Embeddings token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingsUsage {
    /// Input tokens
    pub input_tokens: u64,
}
