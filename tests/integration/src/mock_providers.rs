//! Mock upstream APIs for integration testing
//!
//! Provides wiremock-based servers that simulate the OpenAI REST API (also
//! used for Yandex Foundation Models) and the Bedrock runtime.

use gateway_core::ApiKey;
use gateway_core::BedrockConnection;
use gateway_providers::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock OpenAI-compatible API server
pub struct MockOpenAi {
    pub server: MockServer,
}

impl MockOpenAi {
    /// Start a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL including the version segment
    pub fn url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// OpenAI adapter pointed at this server
    pub fn provider(&self, max_retries: u32) -> OpenAiCompatibleProvider {
        let config = OpenAiCompatibleConfig::new("openai-test", "sk-test")
            .with_base_url(self.url())
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(max_retries);
        OpenAiCompatibleProvider::new(config).expect("Failed to build provider")
    }

    /// Adapter with an admin key for cost reports
    pub fn admin_provider(&self) -> OpenAiCompatibleProvider {
        let config = OpenAiCompatibleConfig::new("openai-test", "sk-test")
            .with_base_url(self.url())
            .with_admin_api_key(ApiKey::new("sk-admin"))
            .with_max_retries(0);
        OpenAiCompatibleProvider::new(config).expect("Failed to build provider")
    }

    /// Setup a successful chat completion response
    pub async fn mock_chat_completion(&self, model: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(openai_chat_response(model, content)),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Setup an error response served `times` times
    pub async fn mock_error(&self, status: u16, message: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(openai_error_response("invalid_request_error", message)),
            )
            .up_to_n_times(times)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Setup a server-sent event stream made of `chunks`
    pub async fn mock_stream(&self, chunks: &[Value]) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(chunks), "text/event-stream"),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Setup an embeddings response
    pub async fn mock_embeddings(&self, embedding: &[f32], prompt_tokens: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": if embedding.is_empty() {
                    json!([])
                } else {
                    json!([{ "object": "embedding", "index": 0, "embedding": embedding }])
                },
                "model": "text-embedding-3-small",
                "usage": { "prompt_tokens": prompt_tokens, "total_tokens": prompt_tokens }
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Setup a model listing
    pub async fn mock_models(&self, ids: &[&str]) {
        let data: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "object": "model", "created": 1_700_000_000, "owned_by": "system" }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "object": "list", "data": data })),
            )
            .mount(&self.server)
            .await;
    }
}

/// Generate an OpenAI-style chat completion response
pub fn openai_chat_response(model: &str, content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 12,
            "completion_tokens": 3,
            "total_tokens": 15,
            "prompt_tokens_details": { "cached_tokens": 4 }
        }
    })
}

/// Generate an OpenAI-style error response
pub fn openai_error_response(error_type: &str, message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "code": null
        }
    })
}

/// Streaming chunk carrying a content delta
pub fn openai_delta_chunk(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }],
        "usage": null
    })
}

/// Final streaming chunk carrying usage only
pub fn openai_usage_chunk(prompt_tokens: u64, completion_tokens: u64) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [],
        "usage": {
            "prompt_tokens": prompt_tokens,
            "completion_tokens": completion_tokens,
            "total_tokens": prompt_tokens + completion_tokens
        }
    })
}

/// Encode chunks as an SSE body terminated by `[DONE]`
pub fn sse_body(chunks: &[Value]) -> Vec<u8> {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(&chunk.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

/// Bedrock connection with static test credentials aimed at `endpoint`
pub fn bedrock_connection(endpoint: &str) -> BedrockConnection {
    BedrockConnection {
        region: "us-east-1".to_string(),
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some(ApiKey::new("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")),
        endpoint_url: Some(endpoint.to_string()),
        timeout: Duration::from_secs(5),
        max_attempts: 1,
        ..BedrockConnection::default()
    }
}
