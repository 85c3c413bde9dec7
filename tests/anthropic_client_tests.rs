//! HTTP behaviour of `AnthropicClient` against a mocked Messages API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hybrid_layer_orchestrator::execution::RemoteAdapter;
use hybrid_layer_orchestrator::{
    AnthropicClient, Complexity, Priority, ProcessingRequest, RemoteFailure, RemoteInference,
    Sensitivity, WorkerError,
};

fn client(base_url: &str) -> AnthropicClient {
    AnthropicClient::with_api_key("test-key", "claude-test").with_base_url(base_url)
}

fn success_body(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    })
}

fn request(query: &str) -> ProcessingRequest {
    ProcessingRequest::new(query, Priority::Low, Sensitivity::Public, Complexity::Complex)
        .expect("test: valid request")
}

#[tokio::test]
async fn test_success_sends_headers_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-test",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server.uri())
        .call("hello", Duration::from_secs(5))
        .await
        .expect("test: success");

    assert_eq!(reply.text, "hi there");
    assert_eq!(reply.confidence, None);
}

#[tokio::test]
async fn test_configured_temperature_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"temperature": 0.25, "max_tokens": 64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server.uri())
        .with_temperature(0.25)
        .with_max_tokens(64)
        .call("hello", Duration::from_secs(5))
        .await
        .expect("test: success");

    assert_eq!(reply.text, "ok");
}

#[tokio::test]
async fn test_multiple_text_blocks_are_concatenated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "part one, "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "part two"}
            ]
        })))
        .mount(&server)
        .await;

    let reply = client(&server.uri())
        .call("hello", Duration::from_secs(5))
        .await
        .expect("test: success");

    assert_eq!(reply.text, "part one, part two");
}

#[tokio::test]
async fn test_rate_limit_maps_to_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .call("hello", Duration::from_secs(5))
        .await
        .expect_err("test: 429");

    match err {
        WorkerError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .call("hello", Duration::from_secs(5))
        .await
        .expect_err("test: empty content");

    assert!(matches!(err, WorkerError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body("late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .call("hello", Duration::from_millis(200))
        .await
        .expect_err("test: timeout");

    assert!(matches!(err, WorkerError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Port 1 on localhost refuses connections.
    let err = client("http://127.0.0.1:1")
        .call("hello", Duration::from_secs(2))
        .await
        .expect_err("test: connection refused");

    assert!(matches!(err, WorkerError::Transport(_)));
}

#[tokio::test]
async fn test_adapter_maps_server_error_to_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let adapter = RemoteAdapter::new(std::sync::Arc::new(client(&server.uri())));
    let err = adapter.run(&request("hello")).await.expect_err("test: 503");

    assert_eq!(
        err,
        RemoteFailure::NonSuccessStatus {
            status: 503,
            body: "overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn test_adapter_success_reports_provider_and_default_confidence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("answer")))
        .mount(&server)
        .await;

    let adapter = RemoteAdapter::new(std::sync::Arc::new(client(&server.uri())));
    let result = adapter.run(&request("hello")).await.expect("test: success");

    assert_eq!(result.model_or_provider, "anthropic/claude-test");
    assert_eq!(result.response_text, "answer");
    assert!((result.confidence - 0.98).abs() < f64::EPSILON);
}
