//! Canonical request to chat-completion parameters.
//!
//! Model-family quirks live in two lookup tables: which role carries the
//! system prompt, and which sampling parameters a family accepts. Both are
//! keyed by model-id prefix.

use super::wire::{
    ChatCompletionParams, ChatContent, ChatContentPart, ChatMessageParam, ChatRole, ImageUrl,
    StreamOptions,
};
use gateway_core::{ContentType, MessageBody, MessageRole, ModelInvocationRequest, ModelMessage};
use tracing::warn;

/// Model-id prefixes whose system prompt goes in a `developer` message
pub const DEVELOPER_ROLE_PREFIXES: &[&str] = &["o1", "o4", "gpt-5"];

/// Role carrying system instructions for `model_id`
pub fn system_role_for(model_id: &str) -> ChatRole {
    if DEVELOPER_ROLE_PREFIXES
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
    {
        ChatRole::Developer
    } else {
        ChatRole::System
    }
}

/// Per-family rewrite of the base parameters
#[derive(Debug, Clone, Copy)]
pub struct ParameterOverride {
    /// Rule name, used in logs and tests
    pub name: &'static str,
    /// Model-id prefixes the rule applies to
    pub prefixes: &'static [&'static str],
    /// Rewrite applied to the parameters
    pub apply: fn(&mut ChatCompletionParams),
}

impl ParameterOverride {
    /// Whether the rule applies to `model_id`
    pub fn matches(&self, model_id: &str) -> bool {
        self.prefixes.iter().any(|prefix| model_id.starts_with(prefix))
    }
}

fn drop_sampling(params: &mut ChatCompletionParams) {
    params.temperature = None;
    params.top_p = None;
}

fn drop_temperature(params: &mut ChatCompletionParams) {
    params.temperature = None;
}

fn force_unit_temperature(params: &mut ChatCompletionParams) {
    params.temperature = Some(1.0);
}

/// Ordered override table; the first matching row wins
pub const PARAMETER_OVERRIDES: &[ParameterOverride] = &[
    ParameterOverride {
        name: "reasoning-no-sampling",
        prefixes: &["o1", "o4"],
        apply: drop_sampling,
    },
    ParameterOverride {
        name: "gpt-4o-no-temperature",
        prefixes: &["gpt-4o"],
        apply: drop_temperature,
    },
    ParameterOverride {
        name: "gpt-5-unit-temperature",
        prefixes: &["gpt-5"],
        apply: force_unit_temperature,
    },
];

/// Apply the first matching override; returns its name
pub fn apply_overrides(params: &mut ChatCompletionParams) -> Option<&'static str> {
    let rule = PARAMETER_OVERRIDES
        .iter()
        .find(|rule| rule.matches(&params.model))?;
    (rule.apply)(params);
    Some(rule.name)
}

/// Build chat-completion parameters for `request`
pub fn build_chat_params(request: &ModelInvocationRequest, stream: bool) -> ChatCompletionParams {
    let system_role = system_role_for(&request.model_id);

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(prompt) = request.system_prompt() {
        messages.push(ChatMessageParam::text(system_role, prompt));
    }
    messages.extend(
        request
            .messages
            .iter()
            .map(|message| format_message(message, system_role)),
    );

    let mut params = ChatCompletionParams {
        model: request.model_id.clone(),
        messages,
        temperature: request.temperature,
        top_p: request.top_p,
        max_completion_tokens: request.max_tokens,
        stream,
        stream_options: stream.then_some(StreamOptions {
            include_usage: true,
        }),
    };

    apply_overrides(&mut params);
    params
}

/// Map a canonical message to its wire form.
///
/// `error` turns replay as assistant turns; system turns use the same role as
/// the injected system prompt.
pub fn format_message(message: &ModelMessage, system_role: ChatRole) -> ChatMessageParam {
    let role = match message.role {
        MessageRole::User => ChatRole::User,
        MessageRole::Assistant | MessageRole::Error => ChatRole::Assistant,
        MessageRole::System => system_role,
    };

    let content = match &message.body {
        MessageBody::Text(text) => ChatContent::Text(text.clone()),
        MessageBody::Parts(parts) => ChatContent::Parts(
            parts
                .iter()
                .filter(|part| !part.is_empty())
                .filter_map(|part| match part.content_type {
                    ContentType::Text => Some(ChatContentPart::Text {
                        text: part.content.clone(),
                    }),
                    ContentType::Image => Some(ChatContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: part.content.clone(),
                        },
                    }),
                    other => {
                        warn!(content_type = %other, "Skipping unsupported content part");
                        None
                    }
                })
                .collect(),
        ),
    };

    ChatMessageParam { role, content }
}
