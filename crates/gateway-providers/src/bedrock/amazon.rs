//! Amazon Titan and Nova.
//!
//! Titan text models take a flattened `Human:`/`Assistant:` transcript. Nova
//! models take a role-tagged message list with a separate `system` array.

use super::fields::{f32_vec_at, insert_opt, str_at, u64_at};
use super::transcript::{
    human_assistant_transcript, parse_data_url, prepended_system_texts, PART_SEPARATOR,
};
use super::{base_model_id, BedrockModelFamily, InvokeModelParams};
use gateway_core::{
    ContentType, EmbeddingsRequest, EmbeddingsResponse, GatewayError, GatewayResult,
    MessageBody, MessageRole, ModelInvocationRequest, ModelMessage, ModelResponse, ProviderKind,
    Usage,
};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Amazon model family
#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonFamily;

fn is_nova(model_id: &str) -> bool {
    base_model_id(model_id).starts_with("amazon.nova")
}

fn is_embedding_model(model_id: &str) -> bool {
    base_model_id(model_id).contains("embed")
}

impl AmazonFamily {
    fn titan_params(request: &ModelInvocationRequest) -> Value {
        let mut config = Map::new();
        insert_opt(&mut config, "maxTokenCount", request.max_tokens);
        insert_opt(&mut config, "temperature", request.temperature);
        insert_opt(&mut config, "topP", request.top_p);
        config.insert("stopSequences".to_string(), json!(["Human:"]));

        json!({
            "inputText": human_assistant_transcript(request),
            "textGenerationConfig": config,
        })
    }

    fn nova_params(request: &ModelInvocationRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant | MessageRole::Error => "assistant",
                    MessageRole::System => return None,
                };
                Some(json!({ "role": role, "content": nova_content(message) }))
            })
            .collect();

        let mut body = Map::new();
        body.insert("messages".to_string(), Value::Array(messages));

        let system: Vec<Value> = prepended_system_texts(request, PART_SEPARATOR)
            .into_iter()
            .map(|text| json!({ "text": text }))
            .collect();
        if !system.is_empty() {
            body.insert("system".to_string(), Value::Array(system));
        }

        let mut config = Map::new();
        insert_opt(&mut config, "maxTokens", request.max_tokens);
        insert_opt(&mut config, "temperature", request.temperature);
        insert_opt(&mut config, "topP", request.top_p);
        if !config.is_empty() {
            body.insert("inferenceConfig".to_string(), Value::Object(config));
        }

        Value::Object(body)
    }

    fn parse_nova(body: &Value) -> ModelResponse {
        let content = body
            .pointer("/output/message/content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = Usage::new(
            u64_at(body, "/usage/inputTokens"),
            u64_at(body, "/usage/outputTokens"),
        )
        .with_cache_read(u64_at(body, "/usage/cacheReadInputTokenCount"));

        ModelResponse::text(content, usage)
    }

    fn parse_titan(body: &Value) -> ModelResponse {
        let content = str_at(body, "/results/0/outputText").unwrap_or_default();
        let usage = Usage::new(
            u64_at(body, "/inputTextTokenCount"),
            u64_at(body, "/results/0/tokenCount"),
        );
        ModelResponse::text(content, usage)
    }
}

fn nova_content(message: &ModelMessage) -> Vec<Value> {
    match &message.body {
        MessageBody::Text(text) => vec![json!({ "text": text })],
        MessageBody::Parts(parts) => parts
            .iter()
            .filter(|part| !part.is_empty())
            .filter_map(|part| match part.content_type {
                ContentType::Text => Some(json!({ "text": part.content })),
                ContentType::Image => {
                    let Some((media_type, data)) = parse_data_url(&part.content) else {
                        warn!("Nova accepts inline images only, skipping image part");
                        return None;
                    };
                    let format = media_type.strip_prefix("image/").unwrap_or(media_type);
                    Some(json!({ "image": { "format": format, "source": { "bytes": data } } }))
                }
                other => {
                    warn!(content_type = %other, "Skipping unsupported content part");
                    None
                }
            })
            .collect(),
    }
}

impl BedrockModelFamily for AmazonFamily {
    const NAME: &'static str = "amazon";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let body = if is_nova(&request.model_id) {
            Self::nova_params(request)
        } else {
            Self::titan_params(request)
        };
        Ok(InvokeModelParams::new(request.model_id.clone(), body))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        if body.get("output").is_some() {
            Self::parse_nova(body)
        } else {
            Self::parse_titan(body)
        }
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        str_at(chunk, "/contentBlockDelta/delta/text")
            .or_else(|| str_at(chunk, "/outputText"))
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn build_embeddings_params(&self, request: &EmbeddingsRequest) -> GatewayResult<InvokeModelParams> {
        if !is_embedding_model(&request.model_id) {
            return Err(GatewayError::unsupported(
                ProviderKind::AwsBedrock.display_name(),
                format!("Embeddings with {}", request.model_id),
            ));
        }

        let mut body = Map::new();
        body.insert("inputText".to_string(), json!(request.input));
        // Only the v2 Titan embedding models accept a target size.
        if base_model_id(&request.model_id).contains("embed-text-v2") {
            insert_opt(&mut body, "dimensions", request.dimensions);
        }
        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_embeddings(&self, body: &Value) -> EmbeddingsResponse {
        EmbeddingsResponse::new(
            f32_vec_at(body, "/embedding"),
            u64_at(body, "/inputTextTokenCount"),
        )
    }
}
