//! OpenAI-compatible adapter.
//!
//! Speaks the OpenAI REST protocol (`/chat/completions`, `/embeddings`,
//! `/models`) against any base URL with bearer-key auth. The same adapter
//! serves OpenAI directly and, with a different base URL and key, Yandex
//! Foundation Models.
//!
//! Retries happen at the transport level: every HTTP call (and the opening
//! of a stream) runs through a [`RetryPolicy`] sized by
//! [`OpenAiCompatibleConfig::max_retries`].

pub mod params;
pub mod wire;

use crate::http::{build_client, decode_or_default, transport_error};
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    ApiKey, CostRange, EmbeddingsRequest, EmbeddingsResponse, GatewayError, GatewayResult,
    ModelInfo, ModelInvocationRequest, ModelProvider, ModelResponse, OpenAiConnection,
    ProviderAccount, ProviderInfo, ProviderKind, StreamCallbacks, StreamRelay, Usage, UsageCosts,
    UsageReport,
};
use gateway_resilience::RetryPolicy;
use gateway_telemetry::invocation_span;
use reqwest::{Client, Response};
use reqwest_eventsource::{retry::Never, Event, EventSource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace, warn, Instrument};

pub use params::{
    apply_overrides, build_chat_params, format_message, system_role_for, ParameterOverride,
    DEVELOPER_ROLE_PREFIXES, PARAMETER_OVERRIDES,
};
pub use wire::{ChatCompletionParams, ChatContent, ChatContentPart, ChatMessageParam, ChatRole};

use wire::{
    ApiErrorResponse, ChatCompletionChunk, ChatCompletionResponse, CostsPage,
    EmbeddingsApiResponse, EmbeddingsParams, ModelsList,
};

const COST_PAGE_LIMIT: usize = 50;

/// OpenAI-compatible adapter configuration
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Adapter instance ID
    pub id: String,
    /// Backend this adapter talks to; tags errors and info
    pub provider: ProviderKind,
    /// REST base URL including the version segment
    pub base_url: String,
    /// Bearer key
    pub api_key: ApiKey,
    /// Admin key for organization cost reports
    pub admin_api_key: Option<ApiKey>,
    /// Socket timeout
    pub timeout: Duration,
    /// Transport-level retries
    pub max_retries: u32,
}

impl OpenAiCompatibleConfig {
    /// Configuration for the public OpenAI endpoint
    pub fn new(id: impl Into<String>, api_key: impl Into<ApiKey>) -> Self {
        Self {
            id: id.into(),
            provider: ProviderKind::OpenAi,
            base_url: gateway_core::connection::DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            admin_api_key: None,
            timeout: Duration::from_secs(120),
            max_retries: gateway_core::connection::DEFAULT_MAX_RETRIES,
        }
    }

    /// Configuration from caller-resolved connection parameters
    pub fn from_connection(id: impl Into<String>, connection: &OpenAiConnection) -> Self {
        Self {
            id: id.into(),
            provider: ProviderKind::OpenAi,
            base_url: connection.base_url.clone(),
            api_key: connection.api_key.clone(),
            admin_api_key: connection.admin_api_key.clone(),
            timeout: connection.timeout,
            max_retries: connection.max_retries,
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the backend kind
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Set the admin key
    #[must_use]
    pub fn with_admin_api_key(mut self, key: impl Into<ApiKey>) -> Self {
        self.admin_api_key = Some(key.into());
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Adapter for OpenAI-protocol endpoints
pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("id", &self.config.id)
            .field("provider", &self.config.provider)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// Create a new adapter
    pub fn new(config: OpenAiCompatibleConfig) -> GatewayResult<Self> {
        if config.api_key.is_blank() {
            warn!(
                provider = %config.provider,
                "API key is empty, upstream calls will be rejected"
            );
        }

        let client = build_client(config.timeout)?;
        let retry = RetryPolicy::with_max_retries("openai-compatible", config.max_retries);

        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Adapter configuration
    pub fn config(&self) -> &OpenAiCompatibleConfig {
        &self.config
    }

    fn provider_name(&self) -> &'static str {
        self.config.provider.display_name()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_from_response(&self, response: Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body).map_or_else(
            |_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.clone()
                }
            },
            |parsed| parsed.error.describe(),
        );

        GatewayError::from_status(self.provider_name(), status.as_u16(), message)
    }

    async fn read_json<R>(&self, response: Response) -> GatewayResult<R>
    where
        R: DeserializeOwned + Default,
    {
        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout))?;
        Ok(decode_or_default(self.provider_name(), &bytes))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> GatewayResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Default,
    {
        let url = self.endpoint(path);
        let url = url.as_str();
        self.retry
            .execute(|| async move {
                let response = self
                    .client
                    .post(url)
                    .bearer_auth(self.config.api_key.expose())
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| transport_error(&e, self.config.timeout))?;
                self.read_json(response).await
            })
            .await
    }

    async fn get_json<R>(&self, path: &str, key: &ApiKey, query: &[(&str, String)]) -> GatewayResult<R>
    where
        R: DeserializeOwned + Default,
    {
        let url = self.endpoint(path);
        let url = url.as_str();
        self.retry
            .execute(|| async move {
                let response = self
                    .client
                    .get(url)
                    .bearer_auth(key.expose())
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| transport_error(&e, self.config.timeout))?;
                self.read_json(response).await
            })
            .await
    }

    async fn stream_error(&self, error: reqwest_eventsource::Error) -> GatewayError {
        use reqwest_eventsource::Error;

        match error {
            Error::InvalidStatusCode(_, response) => self.error_from_response(response).await,
            Error::Transport(e) => transport_error(&e, self.config.timeout),
            Error::InvalidContentType(content_type, _) => GatewayError::streaming(format!(
                "unexpected content type {content_type:?}"
            )),
            other => GatewayError::streaming(other.to_string()),
        }
    }

    /// Open the event stream, waiting for the response headers
    async fn open_event_source(&self, params: &ChatCompletionParams) -> GatewayResult<EventSource> {
        let builder = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(self.config.api_key.expose())
            .json(params);

        let mut source = EventSource::new(builder)
            .map_err(|e| GatewayError::internal(format!("Failed to create event source: {e}")))?;
        source.set_retry_policy(Box::new(Never));

        match source.next().await {
            Some(Ok(Event::Open)) => Ok(source),
            Some(Ok(Event::Message(_))) => {
                source.close();
                Err(GatewayError::streaming("received data before the stream opened"))
            }
            Some(Err(error)) => {
                source.close();
                Err(self.stream_error(error).await)
            }
            None => Err(GatewayError::streaming("stream closed before opening")),
        }
    }

    async fn relay_stream(&self, request: &ModelInvocationRequest, relay: &mut StreamRelay<'_>) {
        let params = build_chat_params(request, true);
        debug!(
            provider = self.provider_name(),
            model = %params.model,
            "Starting chat completion stream"
        );

        let params = &params;
        let mut source = match self
            .retry
            .execute(move || self.open_event_source(params))
            .await
        {
            Ok(source) => source,
            Err(error) => {
                relay.error(error);
                return;
            }
        };

        let mut usage = UsageReport::Unknown;
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => trace!("Stream reopened"),
                Ok(Event::Message(message)) => {
                    let data = message.data.trim();
                    if data == "[DONE]" {
                        break;
                    }
                    match serde_json::from_str::<ChatCompletionChunk>(data) {
                        Ok(chunk) => {
                            if let Some(error) = chunk.error {
                                source.close();
                                relay.error(GatewayError::provider(
                                    self.provider_name(),
                                    error.describe(),
                                    None,
                                    false,
                                ));
                                return;
                            }
                            if let Some(chunk_usage) = chunk.usage {
                                usage = UsageReport::Known(chunk_usage.into());
                            }
                            if let Some(text) = chunk.delta_text() {
                                relay.token(text);
                            }
                        }
                        Err(e) => warn!(
                            provider = self.provider_name(),
                            error = %e,
                            "Skipping malformed stream chunk"
                        ),
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(error) => {
                    source.close();
                    relay.error(self.stream_error(error).await);
                    return;
                }
            }
        }

        source.close();
        relay.complete(usage);
    }

    fn catalog_entry(&self, id: String) -> ModelInfo {
        if id.contains("embedding") {
            ModelInfo::embedding(id.clone(), id, self.config.provider)
        } else {
            ModelInfo::text(id.clone(), id, self.config.provider)
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn kind(&self) -> ProviderKind {
        self.config.provider
    }

    async fn invoke(&self, request: &ModelInvocationRequest) -> GatewayResult<ModelResponse> {
        let params = build_chat_params(request, false);
        debug!(
            provider = self.provider_name(),
            model = %params.model,
            messages = params.messages.len(),
            "Sending chat completion request"
        );

        let response: ChatCompletionResponse = self
            .post_json("chat/completions", &params)
            .instrument(invocation_span!(self.provider_name(), params.model, "invoke"))
            .await?;

        let content = response.first_content().map_or_else(
            || {
                warn!(provider = self.provider_name(), "Response has no message content");
                String::new()
            },
            str::to_string,
        );
        let usage = response.usage.map(Usage::from).unwrap_or_default();

        Ok(ModelResponse::text(content, usage))
    }

    async fn invoke_streaming(
        &self,
        request: &ModelInvocationRequest,
        callbacks: &mut dyn StreamCallbacks,
    ) {
        let mut relay = StreamRelay::new(callbacks);
        relay.start();
        self.relay_stream(request, &mut relay)
            .instrument(invocation_span!(
                self.provider_name(),
                request.model_id,
                "invoke_streaming"
            ))
            .await;
    }

    async fn embed(&self, request: &EmbeddingsRequest) -> GatewayResult<EmbeddingsResponse> {
        let params = EmbeddingsParams {
            model: &request.model_id,
            input: &request.input,
            encoding_format: "float",
            dimensions: request.dimensions,
        };

        let response: EmbeddingsApiResponse = self
            .post_json("embeddings", &params)
            .instrument(invocation_span!(self.provider_name(), request.model_id, "embed"))
            .await?;

        let input_tokens = response.usage.as_ref().map_or(0, |usage| usage.prompt_tokens);
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                GatewayError::provider(
                    self.provider_name(),
                    "response contained no embeddings",
                    None,
                    false,
                )
            })?;

        Ok(EmbeddingsResponse::new(embedding, input_tokens))
    }
}

#[async_trait]
impl ProviderAccount for OpenAiCompatibleProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(
            self.config.provider,
            !self.config.api_key.is_blank(),
            self.config.admin_api_key.is_some(),
        )
        .with_detail("baseUrl", self.config.base_url.clone())
    }

    async fn models(&self) -> GatewayResult<Vec<ModelInfo>> {
        let list: ModelsList = self.get_json("models", &self.config.api_key, &[]).await?;
        let mut models: Vec<ModelInfo> = list
            .data
            .into_iter()
            .filter(|entry| !entry.id.is_empty())
            .map(|entry| self.catalog_entry(entry.id))
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }

    async fn costs(&self, range: CostRange) -> GatewayResult<UsageCosts> {
        let admin_key = self.config.admin_api_key.as_ref().ok_or_else(|| {
            GatewayError::configuration(format!(
                "{} admin API key is required for cost reports",
                self.provider_name()
            ))
        })?;

        let mut total = 0.0;
        let mut currency = String::from("usd");
        let mut by_project: HashMap<String, f64> = HashMap::new();
        let mut page: Option<String> = None;

        for _ in 0..COST_PAGE_LIMIT {
            let mut query = vec![
                ("start_time", range.start.timestamp().to_string()),
                ("end_time", range.end.timestamp().to_string()),
                ("group_by", "project_id".to_string()),
                ("limit", "30".to_string()),
            ];
            if let Some(cursor) = page.take() {
                query.push(("page", cursor));
            }

            let costs: CostsPage = self
                .get_json("organization/costs", admin_key, &query)
                .await?;

            for result in costs.data.into_iter().flat_map(|bucket| bucket.results) {
                total += result.amount.value;
                if !result.amount.currency.is_empty() {
                    currency = result.amount.currency;
                }
                let project = result.project_id.unwrap_or_else(|| "default".to_string());
                *by_project.entry(project).or_insert(0.0) += result.amount.value;
            }

            match (costs.has_more, costs.next_page) {
                (true, Some(next)) => page = Some(next),
                _ => break,
            }
        }

        Ok(UsageCosts {
            range,
            total,
            currency,
            by_project,
        })
    }
}
