//! Yandex Foundation Models adapter.
//!
//! Delegates generation to the OpenAI-compatible adapter pointed at Yandex's
//! OpenAI endpoint. Model URIs carry a `{folder}` placeholder that is replaced
//! with the configured folder id before each call.

use crate::openai::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use async_trait::async_trait;
use gateway_core::{
    CostRange, EmbeddingsRequest, EmbeddingsResponse, GatewayError, GatewayResult, ModelInfo,
    ModelInvocationRequest, ModelProvider, ModelResponse, ProviderAccount, ProviderInfo,
    ProviderKind, StreamCallbacks, StreamRelay, UsageCosts, YandexConnection,
};
use std::borrow::Cow;
use tracing::debug;

/// Placeholder replaced by the folder id in model URIs
pub const FOLDER_PLACEHOLDER: &str = "{folder}";

/// Folder used for synchronous calls when none is configured
const DEFAULT_FOLDER: &str = "default";

struct CatalogEntry {
    uri: &'static str,
    name: &'static str,
    max_input_tokens: u32,
}

const YANDEX_MODELS: &[CatalogEntry] = &[
    CatalogEntry {
        uri: "gpt://{folder}/yandexgpt/latest",
        name: "YandexGPT Pro",
        max_input_tokens: 32_000,
    },
    CatalogEntry {
        uri: "gpt://{folder}/yandexgpt-lite/latest",
        name: "YandexGPT Lite",
        max_input_tokens: 32_000,
    },
    CatalogEntry {
        uri: "gpt://{folder}/qwen3-235b-a22b-fp8/latest",
        name: "Qwen3 235B",
        max_input_tokens: 256_000,
    },
    CatalogEntry {
        uri: "gpt://{folder}/gemma-3-27b-it/latest",
        name: "Gemma3 27B",
        max_input_tokens: 128_000,
    },
    CatalogEntry {
        uri: "gpt://{folder}/gpt-oss-120b/latest",
        name: "gpt-oss-120b",
        max_input_tokens: 128_000,
    },
    CatalogEntry {
        uri: "gpt://{folder}/gpt-oss-20b/latest",
        name: "gpt-oss-20b",
        max_input_tokens: 128_000,
    },
];

/// Static Yandex model catalog; URIs keep the `{folder}` placeholder
pub fn yandex_models() -> Vec<ModelInfo> {
    YANDEX_MODELS
        .iter()
        .map(|entry| {
            ModelInfo::text(entry.uri, entry.name, ProviderKind::YandexFm)
                .with_max_input_tokens(entry.max_input_tokens)
        })
        .collect()
}

/// Yandex Foundation Models adapter
#[derive(Debug)]
pub struct YandexProvider {
    id: String,
    folder_id: Option<String>,
    inner: Option<OpenAiCompatibleProvider>,
}

impl YandexProvider {
    /// Create the adapter. A missing API key is accepted here and reported on
    /// every call instead.
    pub fn new(id: impl Into<String>, connection: &YandexConnection) -> GatewayResult<Self> {
        let id = id.into();
        let inner = match connection.api_key.as_ref().filter(|key| !key.is_blank()) {
            Some(key) => {
                let config = OpenAiCompatibleConfig::new(id.clone(), key.clone())
                    .with_provider(ProviderKind::YandexFm)
                    .with_base_url(connection.base_url.clone())
                    .with_timeout(connection.timeout)
                    .with_max_retries(connection.max_retries);
                Some(OpenAiCompatibleProvider::new(config)?)
            }
            None => None,
        };

        Ok(Self {
            id,
            folder_id: connection
                .folder_id
                .clone()
                .filter(|folder| !folder.trim().is_empty()),
            inner,
        })
    }

    fn missing_credentials() -> GatewayError {
        GatewayError::configuration(
            "Yandex API key is not set. Set YANDEX_FM_API_KEY/YANDEX_FM_API_FOLDER in connection settings.",
        )
    }

    fn protocol(&self) -> GatewayResult<&OpenAiCompatibleProvider> {
        self.inner.as_ref().ok_or_else(Self::missing_credentials)
    }

    /// Replace the folder placeholder in a model URI
    pub fn resolve_model_uri<'a>(&self, model_id: &'a str, folder: &str) -> Cow<'a, str> {
        if model_id.contains(FOLDER_PLACEHOLDER) {
            Cow::Owned(model_id.replace(FOLDER_PLACEHOLDER, folder))
        } else {
            Cow::Borrowed(model_id)
        }
    }

    fn with_folder(&self, request: &ModelInvocationRequest, folder: &str) -> ModelInvocationRequest {
        let mut resolved = request.clone();
        resolved.model_id = self.resolve_model_uri(&request.model_id, folder).into_owned();
        resolved
    }
}

#[async_trait]
impl ModelProvider for YandexProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::YandexFm
    }

    async fn invoke(&self, request: &ModelInvocationRequest) -> GatewayResult<ModelResponse> {
        let protocol = self.protocol()?;
        let folder = self.folder_id.as_deref().unwrap_or(DEFAULT_FOLDER);
        let resolved = self.with_folder(request, folder);
        debug!(model = %resolved.model_id, "Invoking Yandex model");
        protocol.invoke(&resolved).await
    }

    async fn invoke_streaming(
        &self,
        request: &ModelInvocationRequest,
        callbacks: &mut dyn StreamCallbacks,
    ) {
        let (Some(protocol), Some(folder)) = (self.inner.as_ref(), self.folder_id.as_deref())
        else {
            StreamRelay::new(callbacks).error(Self::missing_credentials());
            return;
        };

        let resolved = self.with_folder(request, folder);
        debug!(model = %resolved.model_id, "Streaming Yandex model");
        protocol.invoke_streaming(&resolved, callbacks).await;
    }

    async fn embed(&self, _request: &EmbeddingsRequest) -> GatewayResult<EmbeddingsResponse> {
        Err(GatewayError::unsupported(
            ProviderKind::YandexFm.display_name(),
            "Embeddings",
        ))
    }
}

#[async_trait]
impl ProviderAccount for YandexProvider {
    fn info(&self) -> ProviderInfo {
        let info = ProviderInfo::new(
            ProviderKind::YandexFm,
            self.inner.is_some() && self.folder_id.is_some(),
            false,
        );
        match &self.folder_id {
            Some(folder) => info.with_detail("folderId", folder.clone()),
            None => info,
        }
    }

    async fn models(&self) -> GatewayResult<Vec<ModelInfo>> {
        Ok(yandex_models())
    }

    async fn costs(&self, _range: CostRange) -> GatewayResult<UsageCosts> {
        Err(GatewayError::unsupported(
            ProviderKind::YandexFm.display_name(),
            "Cost retrieval",
        ))
    }
}
