//! Connection parameters handed to adapters at construction.
//!
//! The caller resolves these per tenant; adapters never look at environment
//! variables or global configuration themselves.

use crate::types::ApiKey;
use serde::Deserialize;
use std::time::Duration;

/// Default OpenAI REST endpoint
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Yandex Foundation Models OpenAI-compatible endpoint
pub const DEFAULT_YANDEX_BASE_URL: &str = "https://llm.api.cloud.yandex.net/v1";

/// Default Bedrock region
pub const DEFAULT_BEDROCK_REGION: &str = "us-east-1";

/// Retries performed by HTTP clients before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 10;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_yandex_base_url() -> String {
    DEFAULT_YANDEX_BASE_URL.to_string()
}

fn default_region() -> String {
    DEFAULT_BEDROCK_REGION.to_string()
}

/// Credentials for every supported backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConnectionParams {
    /// OpenAI connection
    pub openai: Option<OpenAiConnection>,
    /// Yandex Foundation Models connection
    pub yandex: Option<YandexConnection>,
    /// AWS Bedrock connection
    pub bedrock: Option<BedrockConnection>,
}

/// OpenAI (or compatible) connection
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConnection {
    /// Bearer API key
    pub api_key: ApiKey,

    /// REST base URL including the version segment
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Admin key used for organization cost reports
    #[serde(default)]
    pub admin_api_key: Option<ApiKey>,

    /// Socket timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Transport-level retry count
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl OpenAiConnection {
    /// Connection to the public OpenAI endpoint
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_openai_base_url(),
            admin_api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Yandex Foundation Models connection
#[derive(Debug, Clone, Deserialize)]
pub struct YandexConnection {
    /// API key; calls fail with a configuration error without it
    #[serde(default)]
    pub api_key: Option<ApiKey>,

    /// Cloud folder substituted into `{folder}` model URIs
    #[serde(default)]
    pub folder_id: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_yandex_base_url")]
    pub base_url: String,

    /// Socket timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Transport-level retry count
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for YandexConnection {
    fn default() -> Self {
        Self {
            api_key: None,
            folder_id: None,
            base_url: default_yandex_base_url(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// AWS Bedrock connection
#[derive(Debug, Clone, Deserialize)]
pub struct BedrockConnection {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key id
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<ApiKey>,

    /// Session token for temporary credentials
    #[serde(default)]
    pub session_token: Option<ApiKey>,

    /// Endpoint override (VPC endpoints, tests)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Socket timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Total attempts per call, including the first
    #[serde(default = "default_max_retries")]
    pub max_attempts: u32,
}

impl Default for BedrockConnection {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BedrockConnection {
    /// Whether both halves of the access key are present
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.as_deref().is_some_and(|id| !id.is_empty())
            && self
                .secret_access_key
                .as_ref()
                .is_some_and(|secret| !secret.is_blank())
    }
}
