//! Test fixtures and sample data for integration tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use gateway_core::{GatewayError, GatewayResult, ModelInvocationRequest, ModelMessage};
use gateway_providers::bedrock::{BedrockOutput, BedrockTransport, InvokeModelParams};
use serde_json::Value;
use std::sync::{Mutex, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Create a single-message request
pub fn simple_request(model: &str, text: &str) -> ModelInvocationRequest {
    ModelInvocationRequest::builder()
        .model_id(model)
        .message(ModelMessage::user(text))
        .build()
        .expect("Failed to build request")
}

/// Create a request with a system prompt and sampling parameters
pub fn request_with_system(model: &str, system: &str, text: &str) -> ModelInvocationRequest {
    ModelInvocationRequest::builder()
        .model_id(model)
        .system_prompt(system)
        .message(ModelMessage::user(text))
        .temperature(0.5)
        .max_tokens(128)
        .build()
        .expect("Failed to build request")
}

/// Create a multi-turn conversation request
pub fn multi_turn_request(model: &str) -> ModelInvocationRequest {
    ModelInvocationRequest::builder()
        .model_id(model)
        .system_prompt("Answer with digits only")
        .messages(vec![
            ModelMessage::user("What is 2+2?"),
            ModelMessage::assistant("4"),
            ModelMessage::user("And 3+3?"),
        ])
        .build()
        .expect("Failed to build request")
}

/// Canned behaviour of a [`RecordingTransport`]
#[derive(Debug, Clone)]
pub enum CannedReply {
    /// Successful `InvokeModel` body and header token counts
    Body {
        /// JSON body
        body: Value,
        /// Input token header
        input_tokens: Option<u64>,
        /// Output token header
        output_tokens: Option<u64>,
    },
    /// Stream of chunk payloads, optionally ending in an error
    Chunks {
        /// JSON payloads
        chunks: Vec<Value>,
        /// Error yielded after the chunks
        error: Option<GatewayError>,
    },
    /// Call fails before any data
    Fail(GatewayError),
}

/// Fake Bedrock transport that records every request
#[derive(Debug)]
pub struct RecordingTransport {
    reply: CannedReply,
    calls: Mutex<Vec<InvokeModelParams>>,
}

impl RecordingTransport {
    /// Transport returning `reply` for every call
    pub fn new(reply: CannedReply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Transport answering `InvokeModel` with `body`
    pub fn body(body: Value) -> Self {
        Self::new(CannedReply::Body {
            body,
            input_tokens: None,
            output_tokens: None,
        })
    }

    /// Transport streaming `chunks`
    pub fn chunks(chunks: Vec<Value>) -> Self {
        Self::new(CannedReply::Chunks {
            chunks,
            error: None,
        })
    }

    /// Requests seen so far
    pub fn calls(&self) -> Vec<InvokeModelParams> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Body of the only request seen
    pub fn last_body(&self) -> Value {
        self.calls()
            .pop()
            .map(|params| params.body)
            .expect("transport was not called")
    }

    fn record(&self, params: &InvokeModelParams) {
        self.calls.lock().expect("calls lock").push(params.clone());
    }
}

#[async_trait]
impl BedrockTransport for RecordingTransport {
    async fn invoke_model(&self, params: &InvokeModelParams) -> GatewayResult<BedrockOutput> {
        self.record(params);
        match &self.reply {
            CannedReply::Body {
                body,
                input_tokens,
                output_tokens,
            } => Ok(BedrockOutput {
                body: Bytes::from(body.to_string()),
                input_tokens: *input_tokens,
                output_tokens: *output_tokens,
            }),
            CannedReply::Chunks { .. } => Err(GatewayError::internal("stream-only transport")),
            CannedReply::Fail(error) => Err(error.clone()),
        }
    }

    async fn invoke_model_stream(
        &self,
        params: &InvokeModelParams,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<Bytes>>> {
        self.record(params);
        match &self.reply {
            CannedReply::Chunks { chunks, error } => {
                let mut items: Vec<GatewayResult<Bytes>> = chunks
                    .iter()
                    .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                    .collect();
                if let Some(error) = error {
                    items.push(Err(error.clone()));
                }
                Ok(Box::pin(stream::iter(items)))
            }
            CannedReply::Body { .. } => Err(GatewayError::internal("invoke-only transport")),
            CannedReply::Fail(error) => Err(error.clone()),
        }
    }
}
