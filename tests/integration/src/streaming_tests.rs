//! Streaming behaviour over server-sent events

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_core::{stream_events, ErrorKind, ModelProvider, StreamEvent, Usage, UsageReport};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn collect(provider: Arc<dyn ModelProvider>, model: &str) -> Vec<StreamEvent> {
    stream_events(provider, simple_request(model, "Count to three"))
        .collect()
        .await
}

fn tokens(events: &[StreamEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Token(token) => Some(token.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_stream_tokens_and_usage() {
    init_test_tracing();
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "stream": true,
            "stream_options": { "include_usage": true }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[
                openai_delta_chunk("one"),
                openai_delta_chunk(", two"),
                openai_delta_chunk(", three"),
                openai_usage_chunk(9, 5),
            ]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&mock.server)
        .await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;

    assert!(matches!(events.first(), Some(StreamEvent::Start)));
    assert_eq!(tokens(&events), ["one", ", two", ", three"]);
    match events.last() {
        Some(StreamEvent::Complete { content, usage }) => {
            assert_eq!(content, "one, two, three");
            assert_eq!(usage, &UsageReport::Known(Usage::new(9, 5)));
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_stream_without_usage_chunk_is_unknown() {
    let mock = MockOpenAi::new().await;
    mock.mock_stream(&[openai_delta_chunk("Hello"), openai_delta_chunk(" there")])
        .await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;

    match events.last() {
        Some(StreamEvent::Complete { content, usage }) => {
            assert_eq!(content, "Hello there");
            assert_eq!(usage, &UsageReport::Unknown);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_skips_malformed_chunks() {
    let mock = MockOpenAi::new().await;
    let body = format!(
        "data: {}\n\ndata: not-json\n\ndata: {}\n\ndata: [DONE]\n\n",
        openai_delta_chunk("a"),
        openai_delta_chunk("b")
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&mock.server)
        .await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;
    assert_eq!(tokens(&events), ["a", "b"]);
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
}

#[tokio::test]
async fn test_stream_upstream_failure_is_error_event() {
    let mock = MockOpenAi::new().await;
    mock.mock_error(500, "The server had an error", 1).await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Start));
    match &events[1] {
        StreamEvent::Error(error) => {
            assert_eq!(error.kind(), ErrorKind::UpstreamApi);
            assert_eq!(error.status_code(), Some(500));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_error_event_ends_with_error() {
    let mock = MockOpenAi::new().await;
    mock.mock_stream(&[
        openai_delta_chunk("partial"),
        json!({ "error": { "message": "The server had an error", "type": "server_error" } }),
        openai_delta_chunk(" never delivered"),
    ])
    .await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], StreamEvent::Start));
    assert!(matches!(&events[1], StreamEvent::Token(token) if token == "partial"));
    match &events[2] {
        StreamEvent::Error(error) => {
            assert_eq!(error.kind(), ErrorKind::UpstreamApi);
            assert_eq!(
                error.to_string(),
                "OpenAI API error: The server had an error (server_error)"
            );
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_wrong_content_type_is_error_event() {
    let mock = MockOpenAi::new().await;
    mock.mock_chat_completion("gpt-4.1-mini", "not a stream").await;

    let events = collect(Arc::new(mock.provider(0)), "gpt-4.1-mini").await;

    assert!(tokens(&events).is_empty());
    assert!(matches!(events.last(), Some(StreamEvent::Error(_))));
}
