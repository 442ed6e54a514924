//! OpenAI-compatible adapter against a mock REST API

use crate::fixtures::*;
use crate::mock_providers::*;
use gateway_core::{
    CostRange, EmbeddingsRequest, ErrorKind, Modality, ModelProvider, ProviderAccount, Usage,
};
use gateway_providers::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Match, Mock, Request, ResponseTemplate};

/// Matches JSON bodies that do not carry `field`
struct MissingField(&'static str);

impl Match for MissingField {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| body.get(self.0).is_none())
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn test_invoke_maps_content_and_usage() {
    init_test_tracing();
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-mini",
            "messages": [
                { "role": "system", "content": "Be terse" },
                { "role": "user", "content": "Hi" }
            ],
            "max_completion_tokens": 128
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_chat_response("gpt-4.1-mini", "Hello!")),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let provider = mock.provider(0);
    let response = provider
        .invoke(&request_with_system("gpt-4.1-mini", "Be terse", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Hello!");
    assert_eq!(response.usage(), &Usage::new(12, 3).with_cache_read(4));
}

#[tokio::test]
async fn test_gpt5_uses_developer_role_and_unit_temperature() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-5-mini",
            "temperature": 1.0,
            "messages": [
                { "role": "developer", "content": "Be terse" },
                { "role": "user", "content": "2+2?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_chat_response("gpt-5-mini", "4")))
        .expect(1)
        .mount(&mock.server)
        .await;

    let response = mock
        .provider(0)
        .invoke(&request_with_system("gpt-5-mini", "Be terse", "2+2?"))
        .await
        .expect("invoke should succeed");
    assert_eq!(response.content, "4");
}

#[tokio::test]
async fn test_gpt4o_omits_temperature() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(MissingField("temperature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_chat_response("gpt-4o", "ok")))
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.provider(0)
        .invoke(&request_with_system("gpt-4o", "Be terse", "Hi"))
        .await
        .expect("invoke should succeed");
}

#[tokio::test]
async fn test_history_replays_in_order() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system", "content": "Answer with digits only" },
                { "role": "user", "content": "What is 2+2?" },
                { "role": "assistant", "content": "4" },
                { "role": "user", "content": "And 3+3?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_chat_response("gpt-4.1", "6")))
        .expect(1)
        .mount(&mock.server)
        .await;

    let response = mock
        .provider(0)
        .invoke(&multi_turn_request("gpt-4.1"))
        .await
        .expect("invoke should succeed");
    assert_eq!(response.content, "6");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock = MockOpenAi::new().await;
    mock.mock_error(400, "Unknown model", 1).await;

    let err = mock
        .provider(3)
        .invoke(&simple_request("gpt-unknown", "Hi"))
        .await
        .expect_err("should fail");

    assert_eq!(err.kind(), ErrorKind::UpstreamApi);
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(
        err.to_string(),
        "OpenAI API error: Unknown model (invalid_request_error)"
    );
}

#[tokio::test]
async fn test_throttling_is_retried() {
    let mock = MockOpenAi::new().await;
    mock.mock_error(429, "Rate limit reached", 1).await;
    mock.mock_chat_completion("gpt-4.1-mini", "after retry").await;

    let response = mock
        .provider(1)
        .invoke(&simple_request("gpt-4.1-mini", "Hi"))
        .await
        .expect("retry should succeed");
    assert_eq!(response.content, "after retry");
}

#[tokio::test]
async fn test_non_json_success_body_degrades() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>gateway</html>", "text/html"))
        .mount(&mock.server)
        .await;

    let response = mock
        .provider(0)
        .invoke(&simple_request("gpt-4.1-mini", "Hi"))
        .await
        .expect("degraded response is not an error");
    assert_eq!(response.content, "");
    assert!(response.usage().is_zero());
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    let config = OpenAiCompatibleConfig::new("openai-test", "sk-test")
        .with_base_url("http://127.0.0.1:1/v1")
        .with_max_retries(0);
    let provider = OpenAiCompatibleProvider::new(config).expect("should build");

    let err = provider
        .invoke(&simple_request("gpt-4.1-mini", "Hi"))
        .await
        .expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_embeddings() {
    let mock = MockOpenAi::new().await;
    mock.mock_embeddings(&[0.25, -0.5, 1.0], 5).await;

    let response = mock
        .provider(0)
        .embed(&EmbeddingsRequest::new("text-embedding-3-small", "hello").with_dimensions(3))
        .await
        .expect("embed should succeed");

    assert_eq!(response.embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(response.metadata.usage.input_tokens, 5);
}

#[tokio::test]
async fn test_empty_embeddings_is_upstream_error() {
    let mock = MockOpenAi::new().await;
    mock.mock_embeddings(&[], 0).await;

    let err = mock
        .provider(0)
        .embed(&EmbeddingsRequest::new("text-embedding-3-small", "hello"))
        .await
        .expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::UpstreamApi);
}

#[tokio::test]
async fn test_models_listing() {
    let mock = MockOpenAi::new().await;
    mock.mock_models(&["gpt-4o", "text-embedding-3-small", "gpt-4.1"]).await;

    let models = mock.provider(0).models().await.expect("models should load");
    let ids: Vec<&str> = models.iter().map(|model| model.id.as_str()).collect();
    assert_eq!(ids, ["gpt-4.1", "gpt-4o", "text-embedding-3-small"]);
    assert_eq!(models[2].output_formats, vec![Modality::Embedding]);
}

#[tokio::test]
async fn test_costs_follow_pages() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/organization/costs"))
        .and(query_param("page", "page-2"))
        .and(header("authorization", "Bearer sk-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "page",
            "data": [{ "results": [
                { "amount": { "value": 1.0, "currency": "usd" }, "project_id": "proj-a" }
            ]}],
            "has_more": false,
            "next_page": null
        })))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/organization/costs"))
        .and(query_param("group_by", "project_id"))
        .and(header("authorization", "Bearer sk-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "page",
            "data": [{ "results": [
                { "amount": { "value": 1.5, "currency": "usd" }, "project_id": "proj-a" },
                { "amount": { "value": 0.5, "currency": "usd" }, "project_id": "proj-b" }
            ]}],
            "has_more": true,
            "next_page": "page-2"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let costs = mock
        .admin_provider()
        .costs(CostRange::last_days(30))
        .await
        .expect("costs should load");

    assert!((costs.total - 3.0).abs() < f64::EPSILON);
    assert_eq!(costs.currency, "usd");
    assert!((costs.by_project["proj-a"] - 2.5).abs() < f64::EPSILON);
    assert!((costs.by_project["proj-b"] - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_costs_require_admin_key() {
    let mock = MockOpenAi::new().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock.server)
        .await;

    let err = mock
        .provider(0)
        .costs(CostRange::last_days(7))
        .await
        .expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
