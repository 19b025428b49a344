use ccp_protocol::{ChatCompletionRequest, ChatMessage};
use ccp_runtime::{OpenAIUpstream, Upstream, UpstreamError};
use httpmock::prelude::*;
use serde_json::json;

fn reduced_payload() -> ChatCompletionRequest {
    let mut payload = ChatCompletionRequest::new(vec![
        ChatMessage::system("hello"),
        ChatMessage::user("there"),
    ]);
    payload
        .extra
        .insert("model".to_string(), json!("gpt-4o-mini"));
    payload
}

#[tokio::test]
async fn forwards_payload_with_bearer_credential() {
    let server = MockServer::start();

    let completion_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-api-key")
            .json_body(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "hello"},
                    {"role": "user", "content": "there"}
                ]
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "id": "chatcmpl-mock-1",
                "object": "chat.completion",
                "choices": [
                    {
                        "index": 0,
                        "message": {"role": "assistant", "content": "mocked answer"},
                        "finish_reason": "stop"
                    }
                ]
            }));
    });

    let upstream = OpenAIUpstream::new("test-api-key", format!("{}/v1", server.base_url()))
        .expect("upstream client should build");

    let response = upstream
        .dispatch(&reduced_payload())
        .await
        .expect("dispatch should succeed");

    completion_mock.assert();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["id"], "chatcmpl-mock-1");
    assert_eq!(
        response.body["choices"][0]["message"]["content"],
        "mocked answer"
    );
}

#[tokio::test]
async fn passes_error_status_and_body_through() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429)
            .header("content-type", "application/json")
            .json_body(json!({"error": {"message": "quota exceeded"}}));
    });

    let upstream = OpenAIUpstream::new("test-api-key", format!("{}/v1/", server.base_url()))
        .expect("upstream client should build");

    let response = upstream
        .dispatch(&reduced_payload())
        .await
        .expect("non-2xx responses are not errors");

    mock.assert();
    assert_eq!(response.status, 429);
    assert_eq!(response.body["error"]["message"], "quota exceeded");
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(502).body("<html>bad gateway</html>");
    });

    let upstream = OpenAIUpstream::new("test-api-key", format!("{}/v1", server.base_url()))
        .expect("upstream client should build");

    let err = upstream.dispatch(&reduced_payload()).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Decode { status: 502, .. }));
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    // Port 9 (discard) on loopback is not expected to accept connections.
    let upstream = OpenAIUpstream::new("test-api-key", "http://127.0.0.1:9/v1")
        .expect("upstream client should build");

    let err = upstream.dispatch(&reduced_payload()).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Transport(_)));
}
