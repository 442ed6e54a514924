//! Yandex adapter over the OpenAI-compatible endpoint

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_core::{
    stream_events, ApiKey, ErrorKind, ModelProvider, ProviderAccount, StreamEvent,
    YandexConnection,
};
use gateway_providers::YandexProvider;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connection(server: &MockServer, folder: Option<&str>) -> YandexConnection {
    YandexConnection {
        api_key: Some(ApiKey::new("yc-key")),
        folder_id: folder.map(str::to_string),
        base_url: format!("{}/v1", server.uri()),
        timeout: Duration::from_secs(5),
        max_retries: 0,
    }
}

#[tokio::test]
async fn test_folder_is_substituted_into_model_uri() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer yc-key"))
        .and(body_partial_json(json!({ "model": "gpt://b1g/yandexgpt/latest" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_chat_response("gpt://b1g/yandexgpt/latest", "Привет")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = YandexProvider::new("yandex", &connection(&server, Some("b1g")))
        .expect("should build");
    let response = provider
        .invoke(&simple_request("gpt://{folder}/yandexgpt/latest", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Привет");
    assert_eq!(response.usage().input_tokens, 12);
}

#[tokio::test]
async fn test_missing_key_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connection = YandexConnection {
        api_key: None,
        ..connection(&server, Some("b1g"))
    };
    let provider = YandexProvider::new("yandex", &connection).expect("should build");

    let err = provider
        .invoke(&simple_request("gpt://{folder}/yandexgpt/latest", "Hi"))
        .await
        .expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!provider.info().is_connected);
}

#[tokio::test]
async fn test_stream_without_folder_is_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = YandexProvider::new("yandex", &connection(&server, None)).expect("should build");
    let events: Vec<StreamEvent> = stream_events(
        Arc::new(provider),
        simple_request("gpt://{folder}/yandexgpt/latest", "Hi"),
    )
    .collect()
    .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(error) => assert_eq!(error.kind(), ErrorKind::Configuration),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_resolves_folder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt://b1g/yandexgpt-lite/latest",
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[openai_delta_chunk("Да"), openai_usage_chunk(4, 1)]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        YandexProvider::new("yandex", &connection(&server, Some("b1g"))).expect("should build");
    let events: Vec<StreamEvent> = stream_events(
        Arc::new(provider),
        simple_request("gpt://{folder}/yandexgpt-lite/latest", "Hi"),
    )
    .collect()
    .await;

    match events.last() {
        Some(StreamEvent::Complete { content, usage }) => {
            assert_eq!(content, "Да");
            assert!(usage.is_known());
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_catalog_keeps_placeholder() {
    let provider = YandexProvider::new("yandex", &YandexConnection::default()).expect("should build");
    let models = provider.models().await.expect("static catalog");
    assert!(models
        .iter()
        .all(|model| model.id.starts_with("gpt://{folder}/")));
}
