//! Small domain types shared by every crate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API key wrapper that never prints its value
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Wrap a raw key
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    /// Expose the key for use in an auth header
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Backends the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI or any endpoint speaking its REST protocol
    #[serde(alias = "openai")]
    OpenAi,
    /// Yandex Foundation Models through the OpenAI-compatible endpoint
    #[serde(alias = "yandex")]
    YandexFm,
    /// AWS Bedrock model families
    #[serde(alias = "bedrock")]
    AwsBedrock,
}

impl ProviderKind {
    /// All provider kinds
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::YandexFm, Self::AwsBedrock];

    /// Human-readable name used to tag upstream errors
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::YandexFm => "Yandex FM",
            Self::AwsBedrock => "AWS Bedrock",
        }
    }

    /// Stable identifier
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "open_ai",
            Self::YandexFm => "yandex_fm",
            Self::AwsBedrock => "aws_bedrock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "yandex" | "yandex_fm" => Ok(Self::YandexFm),
            "bedrock" | "aws_bedrock" => Ok(Self::AwsBedrock),
            other => Err(crate::GatewayError::validation(
                format!("unknown provider: {other}"),
                Some("provider".to_string()),
                "unknown_provider",
            )),
        }
    }
}
