//! AI21 Labs models.

use super::fields::{insert_opt, str_at, u64_at};
use super::transcript::human_assistant_transcript;
use super::{BedrockModelFamily, InvokeModelParams};
use gateway_core::{GatewayResult, ModelInvocationRequest, ModelResponse, Usage};
use serde_json::{json, Map, Value};

/// AI21 model family
#[derive(Debug, Clone, Copy, Default)]
pub struct Ai21Family;

impl BedrockModelFamily for Ai21Family {
    const NAME: &'static str = "ai21";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let mut body = Map::new();
        body.insert("prompt".to_string(), json!(human_assistant_transcript(request)));
        insert_opt(&mut body, "maxTokens", request.max_tokens);
        insert_opt(&mut body, "temperature", request.temperature);
        insert_opt(&mut body, "topP", request.top_p);
        body.insert("stopSequences".to_string(), json!(["Human:"]));

        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        // Jamba answers in chat-completion shape, Jurassic in completions shape.
        let content = str_at(body, "/choices/0/message/content")
            .or_else(|| str_at(body, "/completions/0/data/text"))
            .unwrap_or_default();
        let usage = Usage::new(
            u64_at(body, "/usage/prompt_tokens"),
            u64_at(body, "/usage/completion_tokens"),
        );
        ModelResponse::text(content, usage)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        str_at(chunk, "/choices/0/delta/content")
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}
