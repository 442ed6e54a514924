//! Bedrock family adapters over a recording transport and over signed HTTP

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_core::{
    stream_events, EmbeddingsRequest, ErrorKind, GatewayError, ModelProvider,
    ProviderConnectionParams, ProviderKind, StreamEvent, Usage, UsageReport,
};
use gateway_providers::{bedrock_adapter_for, BedrockTransport, ProviderRegistry, SigV4Transport};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header_exists, header_regex, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LLAMA_INVOKE_PATH: &str = r"^/model/meta\.llama3-8b-instruct-v1(%3A|:)0/invoke$";

fn adapter(model_id: &str, transport: &Arc<RecordingTransport>) -> Arc<dyn ModelProvider> {
    let transport: Arc<dyn BedrockTransport> = transport.clone();
    bedrock_adapter_for(model_id, transport).expect("known family")
}

#[tokio::test]
async fn test_meta_prompt_and_usage() {
    init_test_tracing();
    let transport = Arc::new(RecordingTransport::body(json!({
        "generation": "Hello!",
        "prompt_token_count": 21,
        "generation_token_count": 3
    })));

    let response = adapter("meta.llama3-8b-instruct-v1:0", &transport)
        .invoke(&request_with_system("meta.llama3-8b-instruct-v1:0", "Be terse", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Hello!");
    assert_eq!(response.usage(), &Usage::new(21, 3));
    assert_eq!(
        transport.last_body(),
        json!({
            "prompt": "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\nBe terse<|eot_id|>\
                       <|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|>\
                       <|start_header_id|>assistant<|end_header_id|>\n\n",
            "max_gen_len": 128,
            "temperature": 0.5
        })
    );
}

#[tokio::test]
async fn test_anthropic_messages_body() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "content": [{ "type": "text", "text": "6" }],
        "usage": { "input_tokens": 30, "output_tokens": 1, "cache_read_input_tokens": 10 }
    })));

    let model = "anthropic.claude-3-haiku-20240307-v1:0";
    let response = adapter(model, &transport)
        .invoke(&multi_turn_request(model))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "6");
    assert_eq!(response.usage(), &Usage::new(30, 1).with_cache_read(10));
    assert_eq!(
        transport.last_body(),
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": 4096,
            "system": "Answer with digits only",
            "messages": [
                { "role": "user", "content": "What is 2+2?" },
                { "role": "assistant", "content": "4" },
                { "role": "user", "content": "And 3+3?" }
            ]
        })
    );
    assert_eq!(transport.calls()[0].model_id, model);
}

#[tokio::test]
async fn test_titan_transcript() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "inputTextTokenCount": 4,
        "results": [{ "outputText": " Hello", "tokenCount": 2 }]
    })));

    let response = adapter("amazon.titan-text-express-v1", &transport)
        .invoke(&simple_request("amazon.titan-text-express-v1", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, " Hello");
    assert_eq!(response.usage(), &Usage::new(4, 2));
    assert_eq!(
        transport.last_body(),
        json!({
            "inputText": "Human: Hi\nAssistant:",
            "textGenerationConfig": { "stopSequences": ["Human:"] }
        })
    );
}

#[tokio::test]
async fn test_nova_message_list() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "output": { "message": { "role": "assistant", "content": [{ "text": "Hey" }] } },
        "usage": { "inputTokens": 8, "outputTokens": 1 }
    })));

    let model = "us.amazon.nova-lite-v1:0";
    let response = adapter(model, &transport)
        .invoke(&request_with_system(model, "Be terse", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Hey");
    assert_eq!(response.usage(), &Usage::new(8, 1));
    assert_eq!(
        transport.last_body(),
        json!({
            "messages": [{ "role": "user", "content": [{ "text": "Hi" }] }],
            "system": [{ "text": "Be terse" }],
            "inferenceConfig": { "maxTokens": 128, "temperature": 0.5 }
        })
    );
    assert_eq!(transport.calls()[0].model_id, model);
}

#[tokio::test]
async fn test_mistral_usage_from_headers() {
    let transport = Arc::new(RecordingTransport::new(CannedReply::Body {
        body: json!({ "outputs": [{ "text": "ok", "stop_reason": "stop" }] }),
        input_tokens: Some(7),
        output_tokens: Some(2),
    }));

    let model = "mistral.mistral-large-2402-v1:0";
    let response = adapter(model, &transport)
        .invoke(&request_with_system(model, "Be terse", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "ok");
    assert_eq!(response.usage(), &Usage::new(7, 2));
    assert_eq!(
        transport.last_body(),
        json!({
            "prompt": "[INST]Be terse\nHi[/INST]",
            "max_tokens": 128,
            "temperature": 0.5
        })
    );
}

#[tokio::test]
async fn test_ai21_jamba_response() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "choices": [{ "message": { "role": "assistant", "content": "Shalom" } }],
        "usage": { "prompt_tokens": 6, "completion_tokens": 2 }
    })));

    let response = adapter("ai21.jamba-1-5-mini-v1:0", &transport)
        .invoke(&simple_request("ai21.jamba-1-5-mini-v1:0", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Shalom");
    assert_eq!(response.usage(), &Usage::new(6, 2));
    assert_eq!(
        transport.last_body(),
        json!({ "prompt": "Human: Hi\nAssistant:", "stopSequences": ["Human:"] })
    );
}

#[tokio::test]
async fn test_cohere_embeddings_ignore_dimensions() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "embeddings": [[0.5, -0.25, 0.125]]
    })));

    let response = adapter("cohere.embed-english-v3", &transport)
        .embed(&EmbeddingsRequest::new("cohere.embed-english-v3", "hello").with_dimensions(256))
        .await
        .expect("embed should succeed");

    assert_eq!(response.embedding, vec![0.5, -0.25, 0.125]);
    assert_eq!(
        transport.last_body(),
        json!({ "texts": ["hello"], "input_type": "search_query", "truncate": "END" })
    );
}

#[tokio::test]
async fn test_titan_v2_embeddings_send_dimensions() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "embedding": [0.5, -0.25],
        "inputTextTokenCount": 2
    })));

    let response = adapter("amazon.titan-embed-text-v2:0", &transport)
        .embed(&EmbeddingsRequest::new("amazon.titan-embed-text-v2:0", "hello").with_dimensions(256))
        .await
        .expect("embed should succeed");

    assert_eq!(response.embedding, vec![0.5, -0.25]);
    assert_eq!(response.metadata.usage.input_tokens, 2);
    assert_eq!(
        transport.last_body(),
        json!({ "inputText": "hello", "dimensions": 256 })
    );
}

#[tokio::test]
async fn test_text_family_embeddings_unsupported() {
    let transport = Arc::new(RecordingTransport::body(json!({})));

    let err = adapter("meta.llama3-8b-instruct-v1:0", &transport)
        .embed(&EmbeddingsRequest::new("meta.llama3-8b-instruct-v1:0", "hello"))
        .await
        .expect_err("should fail");

    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_anthropic_stream_with_metrics() {
    let transport = Arc::new(RecordingTransport::chunks(vec![
        json!({ "type": "message_start", "message": { "role": "assistant" } }),
        json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": "Hel" } }),
        json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": "lo" } }),
        json!({
            "type": "message_stop",
            "amazon-bedrock-invocationMetrics": { "inputTokenCount": 5, "outputTokenCount": 2 }
        }),
    ]));

    let model = "anthropic.claude-3-haiku-20240307-v1:0";
    let events: Vec<StreamEvent> =
        stream_events(adapter(model, &transport), simple_request(model, "Hi"))
            .collect()
            .await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], StreamEvent::Start));
    assert!(matches!(&events[1], StreamEvent::Token(token) if token == "Hel"));
    assert!(matches!(&events[2], StreamEvent::Token(token) if token == "lo"));
    match &events[3] {
        StreamEvent::Complete { content, usage } => {
            assert_eq!(content, "Hello");
            assert_eq!(usage, &UsageReport::Known(Usage::new(5, 2)));
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_interrupted_mid_way() {
    let transport = Arc::new(RecordingTransport::new(CannedReply::Chunks {
        chunks: vec![json!({ "generation": "Partial" })],
        error: Some(GatewayError::network("connection reset")),
    }));

    let model = "meta.llama3-8b-instruct-v1:0";
    let events: Vec<StreamEvent> =
        stream_events(adapter(model, &transport), simple_request(model, "Hi"))
            .collect()
            .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], StreamEvent::Token(token) if token == "Partial"));
    match &events[2] {
        StreamEvent::Error(error) => assert_eq!(error.kind(), ErrorKind::Network),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_rejected_before_start() {
    let transport = Arc::new(RecordingTransport::new(CannedReply::Fail(
        GatewayError::from_status("AWS Bedrock", 403, "Access denied"),
    )));

    let model = "meta.llama3-8b-instruct-v1:0";
    let events: Vec<StreamEvent> =
        stream_events(adapter(model, &transport), simple_request(model, "Hi"))
            .collect()
            .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(error) => assert_eq!(error.status_code(), Some(403)),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registry_routes_by_family() {
    let transport = Arc::new(RecordingTransport::body(json!({
        "content": [{ "type": "text", "text": "hi" }],
        "usage": { "input_tokens": 3, "output_tokens": 1 }
    })));
    let registry = ProviderRegistry::from_connection(&ProviderConnectionParams::default())
        .expect("empty registry")
        .with_bedrock_transport(&bedrock_connection("http://127.0.0.1:1"), transport.clone());

    assert_eq!(registry.kinds(), vec![ProviderKind::AwsBedrock]);

    let model = "eu.anthropic.claude-3-haiku-20240307-v1:0";
    let provider = registry
        .adapter(ProviderKind::AwsBedrock, model)
        .expect("anthropic adapter");
    provider
        .invoke(&simple_request(model, "Hi"))
        .await
        .expect("invoke should succeed");
    assert_eq!(transport.calls()[0].model_id, model);

    let err = registry
        .adapter(ProviderKind::AwsBedrock, "stability.sd3-large-v1:0")
        .err()
        .expect("unknown family");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_signed_invoke_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(LLAMA_INVOKE_PATH))
        .and(header_regex(
            "authorization",
            r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/bedrock/aws4_request, SignedHeaders=.*host.*, Signature=[0-9a-f]{64}$",
        ))
        .and(header_exists("x-amz-date"))
        .and(header_exists("x-amz-content-sha256"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amzn-bedrock-input-token-count", "7")
                .insert_header("x-amzn-bedrock-output-token-count", "2")
                .set_body_json(json!({ "generation": "Hello there", "stop_reason": "stop" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = SigV4Transport::new(&bedrock_connection(&server.uri())).expect("credentials set");
    let provider = bedrock_adapter_for("meta.llama3-8b-instruct-v1:0", Arc::new(transport))
        .expect("meta adapter");

    let response = provider
        .invoke(&simple_request("meta.llama3-8b-instruct-v1:0", "Hi"))
        .await
        .expect("invoke should succeed");

    assert_eq!(response.content, "Hello there");
    assert_eq!(response.usage(), &Usage::new(7, 2));
}

#[tokio::test]
async fn test_signed_invoke_maps_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(LLAMA_INVOKE_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Malformed input request" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = SigV4Transport::new(&bedrock_connection(&server.uri())).expect("credentials set");
    let provider = bedrock_adapter_for("meta.llama3-8b-instruct-v1:0", Arc::new(transport))
        .expect("meta adapter");

    let err = provider
        .invoke(&simple_request("meta.llama3-8b-instruct-v1:0", "Hi"))
        .await
        .expect_err("should fail");

    assert_eq!(err.kind(), ErrorKind::UpstreamApi);
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.to_string(), "AWS Bedrock API error: Malformed input request");
}
