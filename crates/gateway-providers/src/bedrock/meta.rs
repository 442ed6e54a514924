//! Meta Llama (Llama 3 prompt format).

use super::fields::{insert_opt, str_at, u64_at};
use super::transcript::prepended_system_texts;
use super::{BedrockModelFamily, InvokeModelParams};
use gateway_core::{GatewayResult, MessageRole, ModelInvocationRequest, ModelResponse, Usage};
use serde_json::{json, Map, Value};

const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
const END_OF_TURN: &str = "<|eot_id|>";
const ASSISTANT_HEADER: &str = "<|start_header_id|>assistant<|end_header_id|>";
const PART_SEPARATOR: &str = " ";

/// Meta model family
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaFamily;

fn push_turn(prompt: &mut String, role: &str, text: &str) {
    prompt.push_str("<|start_header_id|>");
    prompt.push_str(role);
    prompt.push_str("<|end_header_id|>\n\n");
    prompt.push_str(text);
    prompt.push_str(END_OF_TURN);
}

/// Sentinel-token prompt ending with an open assistant header.
///
/// System blocks sit right after `<|begin_of_text|>`, the most recently seen
/// system message first.
fn build_prompt(request: &ModelInvocationRequest) -> String {
    let mut prompt = String::from(BEGIN_OF_TEXT);
    for system in prepended_system_texts(request, PART_SEPARATOR) {
        push_turn(&mut prompt, "system", &system);
    }

    for message in &request.messages {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant | MessageRole::Error => "assistant",
            MessageRole::System => continue,
        };
        push_turn(&mut prompt, role, &message.text(PART_SEPARATOR));
    }

    prompt.push_str(ASSISTANT_HEADER);
    prompt.push_str("\n\n");
    prompt
}

impl BedrockModelFamily for MetaFamily {
    const NAME: &'static str = "meta";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let mut body = Map::new();
        body.insert("prompt".to_string(), json!(build_prompt(request)));
        insert_opt(&mut body, "max_gen_len", request.max_tokens);
        insert_opt(&mut body, "temperature", request.temperature);
        insert_opt(&mut body, "top_p", request.top_p);

        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        let generation = str_at(body, "/generation").unwrap_or_default();
        // Some Llama versions echo the assistant header before the answer.
        let content = generation.replacen(ASSISTANT_HEADER, "\n", 1);
        let usage = Usage::new(
            u64_at(body, "/prompt_token_count"),
            u64_at(body, "/generation_token_count"),
        );
        ModelResponse::text(content.trim(), usage)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        str_at(chunk, "/generation")
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}
