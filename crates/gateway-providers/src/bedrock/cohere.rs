//! Cohere Command and Embed.

use super::fields::{f32_vec_at, insert_opt, str_at};
use super::transcript::prepended_system_texts;
use super::{base_model_id, BedrockModelFamily, InvokeModelParams};
use gateway_core::{
    EmbeddingsRequest, EmbeddingsResponse, GatewayError, GatewayResult, MessageRole,
    ModelInvocationRequest, ModelResponse, ProviderKind, Usage,
};
use serde_json::{json, Map, Value};

const PART_SEPARATOR: &str = " ";

/// Cohere model family
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereFamily;

/// `User:`/`Chatbot:` transcript; system instructions become a preamble
fn build_prompt(request: &ModelInvocationRequest) -> String {
    let mut prompt: String = prepended_system_texts(request, PART_SEPARATOR)
        .into_iter()
        .map(|preamble| format!("{preamble}\n\n"))
        .collect();

    for message in &request.messages {
        let label = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant | MessageRole::Error => "Chatbot",
            MessageRole::System => continue,
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(&message.text(PART_SEPARATOR));
        prompt.push('\n');
    }

    prompt.push_str("Chatbot:");
    prompt
}

impl BedrockModelFamily for CohereFamily {
    const NAME: &'static str = "cohere";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let mut body = Map::new();
        body.insert("prompt".to_string(), json!(build_prompt(request)));
        insert_opt(&mut body, "max_tokens", request.max_tokens);
        insert_opt(&mut body, "p", request.top_p);
        insert_opt(&mut body, "temperature", request.temperature);
        body.insert("stop_sequences".to_string(), json!(["User:"]));

        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        let content = str_at(body, "/generations/0/text").unwrap_or_default();
        ModelResponse::text(content, Usage::default())
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        str_at(chunk, "/text")
            .or_else(|| str_at(chunk, "/generations/0/text"))
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn build_embeddings_params(&self, request: &EmbeddingsRequest) -> GatewayResult<InvokeModelParams> {
        if !base_model_id(&request.model_id).starts_with("cohere.embed") {
            return Err(GatewayError::unsupported(
                ProviderKind::AwsBedrock.display_name(),
                format!("Embeddings with {}", request.model_id),
            ));
        }
        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            json!({
                "texts": [request.input],
                "input_type": "search_query",
                "truncate": "END",
            }),
        ))
    }

    fn parse_embeddings(&self, body: &Value) -> EmbeddingsResponse {
        let mut embedding = f32_vec_at(body, "/embeddings/0");
        if embedding.is_empty() {
            embedding = f32_vec_at(body, "/embeddings/float/0");
        }
        EmbeddingsResponse::new(embedding, 0)
    }
}
