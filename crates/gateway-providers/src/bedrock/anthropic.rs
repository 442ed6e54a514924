//! Anthropic Claude on Bedrock (Messages API).

use super::fields::{insert_opt, str_at, u64_at};
use super::transcript::{parse_data_url, prepended_system_texts, PART_SEPARATOR};
use super::{BedrockModelFamily, InvokeModelParams};
use gateway_core::{
    ContentPart, ContentType, GatewayError, GatewayResult, MessageBody, MessageRole,
    ModelInvocationRequest, ModelMessage, ModelResponse, Usage,
};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Required `anthropic_version` for Bedrock
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Output cap used when the request does not set one; the API requires it
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic model family
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicFamily;

fn image_block(part: &ContentPart) -> GatewayResult<Value> {
    let (media_type, data) = match (parse_data_url(&part.content), part.mime_type.as_deref()) {
        (Some((media_type, data)), _) => (media_type, data),
        (None, Some(mime_type)) => (mime_type, part.content.as_str()),
        (None, None) => {
            return Err(GatewayError::validation(
                "Invalid image format, expected a base64 data URL (data:image/<type>;base64,...)",
                Some("messages.body.content".to_string()),
                "invalid_image",
            ))
        }
    };
    Ok(json!({
        "type": "image",
        "source": { "type": "base64", "media_type": media_type, "data": data }
    }))
}

/// Wire messages for one canonical message.
///
/// Model turns cannot carry images, so their images move to a preceding user
/// message while the text stays on the assistant side.
fn format_message(message: &ModelMessage) -> GatewayResult<Vec<Value>> {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant | MessageRole::Error => "assistant",
        MessageRole::System => return Ok(Vec::new()),
    };

    let parts = match &message.body {
        MessageBody::Text(text) => return Ok(vec![json!({ "role": role, "content": text })]),
        MessageBody::Parts(parts) => parts,
    };

    let mut images = Vec::new();
    let mut texts = Vec::new();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        match part.content_type {
            ContentType::Image => images.push(image_block(part)?),
            ContentType::Text => texts.push(json!({ "type": "text", "text": part.content })),
            other => warn!(content_type = %other, "Skipping unsupported content part"),
        }
    }

    if message.role == MessageRole::User {
        images.extend(texts);
        return Ok(vec![json!({ "role": "user", "content": images })]);
    }

    let mut formatted = Vec::with_capacity(2);
    if !images.is_empty() {
        formatted.push(json!({ "role": "user", "content": images }));
    }
    if !texts.is_empty() {
        formatted.push(json!({ "role": "assistant", "content": texts }));
    }
    Ok(formatted)
}

impl BedrockModelFamily for AnthropicFamily {
    const NAME: &'static str = "anthropic";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            messages.extend(format_message(message)?);
        }

        let mut body = Map::new();
        body.insert("anthropic_version".to_string(), json!(ANTHROPIC_VERSION));
        body.insert(
            "max_tokens".to_string(),
            json!(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        body.insert("messages".to_string(), Value::Array(messages));

        let system = prepended_system_texts(request, PART_SEPARATOR);
        if !system.is_empty() {
            body.insert("system".to_string(), json!(system.join("\n\n")));
        }
        insert_opt(&mut body, "temperature", request.temperature);
        insert_opt(&mut body, "top_p", request.top_p);

        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        let content = body
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = Usage::new(
            u64_at(body, "/usage/input_tokens"),
            u64_at(body, "/usage/output_tokens"),
        )
        .with_cache_read(u64_at(body, "/usage/cache_read_input_tokens"));

        ModelResponse::text(content, usage)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        if chunk.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return None;
        }
        str_at(chunk, "/delta/text")
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}
