//! Shared Bedrock runtime caller.
//!
//! The family adapters only build and parse JSON; this module owns signing,
//! retries and the binary event stream.

use super::event_stream::decode_chunks;
use super::sigv4::SigV4Signer;
use super::InvokeModelParams;
use crate::http::{build_client, transport_error};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use gateway_core::{BedrockConnection, GatewayError, GatewayResult, ProviderKind};
use gateway_resilience::RetryPolicy;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::{form_urlencoded, Url};

/// Header carrying the prompt token count
pub const INPUT_TOKENS_HEADER: &str = "x-amzn-bedrock-input-token-count";

/// Header carrying the generated token count
pub const OUTPUT_TOKENS_HEADER: &str = "x-amzn-bedrock-output-token-count";

const SERVICE: &str = "bedrock";
const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// Raw `InvokeModel` result
#[derive(Debug, Clone, Default)]
pub struct BedrockOutput {
    /// Response body
    pub body: Bytes,
    /// Prompt tokens from the response headers
    pub input_tokens: Option<u64>,
    /// Generated tokens from the response headers
    pub output_tokens: Option<u64>,
}

/// Bedrock runtime calls used by the family adapters
#[async_trait]
pub trait BedrockTransport: Send + Sync {
    /// `InvokeModel`
    async fn invoke_model(&self, params: &InvokeModelParams) -> GatewayResult<BedrockOutput>;

    /// `InvokeModelWithResponseStream`; yields the JSON payload of each chunk
    async fn invoke_model_stream(
        &self,
        params: &InvokeModelParams,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<Bytes>>>;
}

/// SigV4-signed HTTPS transport
pub struct SigV4Transport {
    client: Client,
    signer: SigV4Signer,
    endpoint: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SigV4Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigV4Transport")
            .field("endpoint", &self.endpoint.as_str())
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BedrockErrorBody {
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

impl SigV4Transport {
    /// Create a transport; missing credentials are a configuration error
    pub fn new(connection: &BedrockConnection) -> GatewayResult<Self> {
        let access_key_id = connection
            .access_key_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());
        let secret = connection
            .secret_access_key
            .as_ref()
            .filter(|secret| !secret.is_blank());
        let (Some(access_key_id), Some(secret)) = (access_key_id, secret) else {
            return Err(GatewayError::configuration(
                "AWS Bedrock credentials are not set. Set AWS_BEDROCK_ACCESS_KEY_ID/AWS_BEDROCK_SECRET_ACCESS_KEY in connection settings.",
            ));
        };

        let endpoint = connection.endpoint_url.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", connection.region)
        });
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            GatewayError::configuration(format!("Invalid Bedrock endpoint {endpoint}: {e}"))
        })?;

        let signer = SigV4Signer::new(
            access_key_id,
            secret.clone(),
            connection.session_token.clone(),
            connection.region.clone(),
            SERVICE,
        );

        Ok(Self {
            client: build_client(connection.timeout)?,
            signer,
            endpoint,
            timeout: connection.timeout,
            retry: RetryPolicy::with_max_retries(
                "bedrock",
                connection.max_attempts.saturating_sub(1),
            ),
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runtime URL for `model_id` and `action`
    pub fn model_url(&self, model_id: &str, action: &str) -> GatewayResult<Url> {
        let encoded: String = form_urlencoded::byte_serialize(model_id.as_bytes()).collect();
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/model/{encoded}/{action}"))
            .map_err(|e| GatewayError::internal(format!("Invalid Bedrock URL: {e}")))
    }

    async fn error_from_response(response: Response) -> GatewayError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let parsed: BedrockErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.message_upper)
            .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
        GatewayError::from_status(
            ProviderKind::AwsBedrock.display_name(),
            status.as_u16(),
            message,
        )
    }

    async fn send(&self, url: &Url, body: &[u8], accept: &str) -> GatewayResult<Response> {
        let mut headers = BTreeMap::from([
            ("accept".to_string(), accept.to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ]);
        self.signer
            .sign("POST", url, body, &mut headers, Utc::now())?;

        let mut builder = self.client.post(url.clone());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}

#[async_trait]
impl BedrockTransport for SigV4Transport {
    async fn invoke_model(&self, params: &InvokeModelParams) -> GatewayResult<BedrockOutput> {
        let url = self.model_url(&params.model_id, "invoke")?;
        let body = params.body_bytes()?;
        debug!(model = %params.model_id, url = %url, "Sending request to Bedrock");

        let (url, body) = (&url, body.as_slice());
        self.retry
            .execute(|| async move {
                let response = self.send(url, body, "application/json").await?;
                let input_tokens = header_u64(&response, INPUT_TOKENS_HEADER);
                let output_tokens = header_u64(&response, OUTPUT_TOKENS_HEADER);
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| transport_error(&e, self.timeout))?;
                Ok(BedrockOutput {
                    body,
                    input_tokens,
                    output_tokens,
                })
            })
            .await
    }

    async fn invoke_model_stream(
        &self,
        params: &InvokeModelParams,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<Bytes>>> {
        let url = self.model_url(&params.model_id, "invoke-with-response-stream")?;
        let body = params.body_bytes()?;
        debug!(model = %params.model_id, url = %url, "Starting Bedrock response stream");

        let (url, body) = (&url, body.as_slice());
        let response = self
            .retry
            .execute(|| async move { self.send(url, body, EVENT_STREAM_CONTENT_TYPE).await })
            .await?;

        let timeout = self.timeout;
        let frames = response
            .bytes_stream()
            .map(move |read| read.map_err(|e| transport_error(&e, timeout)));
        Ok(decode_chunks(frames))
    }
}
