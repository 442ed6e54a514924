//! Prompt-flattening helpers shared by the transcript-style families.

use gateway_core::{MessageRole, ModelInvocationRequest};

/// Separator between the text parts of one message
pub(crate) const PART_SEPARATOR: &str = "\n";

/// System instructions in prepend order: each system message lands in front
/// of everything seen before it, the request-level prompt first of all.
pub(crate) fn prepended_system_texts(request: &ModelInvocationRequest, separator: &str) -> Vec<String> {
    let mut texts: Vec<String> = request
        .system_prompt()
        .map(str::to_string)
        .into_iter()
        .collect();
    for message in &request.messages {
        if message.role == MessageRole::System {
            let text = message.text(separator);
            if !text.is_empty() {
                texts.insert(0, text);
            }
        }
    }
    texts
}

/// Linear `Human:`/`Assistant:` transcript ending with an open assistant turn.
///
/// System instructions are prepended as `System:` lines; `error` turns replay
/// as assistant turns.
pub(crate) fn human_assistant_transcript(request: &ModelInvocationRequest) -> String {
    let mut prompt = String::new();
    for system in prepended_system_texts(request, PART_SEPARATOR) {
        prompt.push_str("System: ");
        prompt.push_str(&system);
        prompt.push('\n');
    }

    for message in &request.messages {
        let label = match message.role {
            MessageRole::User => "Human",
            MessageRole::Assistant | MessageRole::Error => "Assistant",
            MessageRole::System => continue,
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(&message.text(PART_SEPARATOR));
        prompt.push('\n');
    }

    prompt.push_str("Assistant:");
    prompt
}

/// Split a `data:` URL into media type and base64 payload
pub(crate) fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let remainder = url.strip_prefix("data:")?;
    let (metadata, data) = remainder.split_once(',')?;
    let media_type = metadata.split(';').next().filter(|media| !media.is_empty())?;
    Some((media_type, data))
}
