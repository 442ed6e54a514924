//! Mistral instruct models.
//!
//! Responses come in two shapes: the completion shape (`outputs[].text`) of
//! the instruct models and the chat shape (`choices[].message`) of Mistral
//! Large. The final message is always the live `[INST]` turn. With more than two
//! messages the earlier turns are wrapped once in `<s> ... </s>`.

use super::fields::{insert_opt, str_at, u64_at};
use super::{BedrockModelFamily, InvokeModelParams};
use gateway_core::{
    GatewayError, GatewayResult, MessageRole, ModelInvocationRequest, ModelResponse, Usage,
};
use serde_json::{json, Map, Value};

const PART_SEPARATOR: &str = "\n";

/// Mistral model family
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralFamily;

fn instruction(preamble: Option<String>, content: &str) -> String {
    match preamble {
        Some(preamble) => format!("[INST]{preamble}\n{content}[/INST]"),
        None => format!("[INST]{content}[/INST]"),
    }
}

fn build_prompt(request: &ModelInvocationRequest) -> GatewayResult<String> {
    let (live, history) = request.messages.split_last().ok_or_else(|| {
        GatewayError::validation(
            "Mistral models need at least one message",
            Some("messages".to_string()),
            "empty_messages",
        )
    })?;
    let has_history = request.messages.len() > 2;

    // System instructions from the history fold into one preamble; the most
    // recent one goes first.
    let mut system: Vec<String> = request
        .system_prompt()
        .map(str::to_string)
        .into_iter()
        .collect();
    for message in history.iter().filter(|m| m.role == MessageRole::System) {
        system.insert(0, message.text(PART_SEPARATOR));
    }
    let mut preamble = (!system.is_empty()).then(|| system.join("\n"));

    let mut turns: Vec<String> = Vec::with_capacity(request.messages.len());
    for message in history {
        let content = message.text(PART_SEPARATOR);
        let turn = match message.role {
            MessageRole::User if has_history => instruction(None, &content),
            MessageRole::User => instruction(preamble.take(), &content),
            MessageRole::Assistant | MessageRole::Error => content,
            MessageRole::System => continue,
        };
        if has_history && turns.is_empty() {
            let lead = preamble.take().map(|p| p + "\n").unwrap_or_default();
            turns.push(format!("<s>{lead}{turn}"));
        } else {
            turns.push(turn);
        }
    }

    if has_history {
        match turns.last_mut() {
            Some(last) => last.push_str("</s>"),
            None => turns.push(format!("<s>{}</s>", preamble.take().unwrap_or_default())),
        }
    }

    turns.push(instruction(preamble, &live.text(PART_SEPARATOR)));
    Ok(turns.join("\n"))
}

/// Token counts, top-level or nested under `usage`
fn token_counts(body: &Value) -> Usage {
    let count = |name: &str| {
        let top = u64_at(body, &format!("/{name}"));
        if top > 0 {
            top
        } else {
            u64_at(body, &format!("/usage/{name}"))
        }
    };
    Usage::new(count("prompt_tokens"), count("completion_tokens"))
}

impl BedrockModelFamily for MistralFamily {
    const NAME: &'static str = "mistral";

    fn build_params(&self, request: &ModelInvocationRequest) -> GatewayResult<InvokeModelParams> {
        let mut body = Map::new();
        body.insert("prompt".to_string(), json!(build_prompt(request)?));
        insert_opt(&mut body, "max_tokens", request.max_tokens);
        insert_opt(&mut body, "top_p", request.top_p);
        insert_opt(&mut body, "temperature", request.temperature);

        Ok(InvokeModelParams::new(
            request.model_id.clone(),
            Value::Object(body),
        ))
    }

    fn parse_response(&self, body: &Value) -> ModelResponse {
        let content = str_at(body, "/outputs/0/text")
            .or_else(|| str_at(body, "/choices/0/message/content"))
            .unwrap_or_default();
        ModelResponse::text(content, token_counts(body))
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Option<String> {
        str_at(chunk, "/outputs/0/text")
            .or_else(|| str_at(chunk, "/choices/0/delta/content"))
            .or_else(|| str_at(chunk, "/choices/0/message/content"))
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}
