//! E2E tests for the gateway HTTP API against a mocked upstream

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use axum::Router;
use ccp_gateway::auth::{IdentityMap, API_KEY_HEADER};
use ccp_gateway::{build_routes, Pipeline, Settings};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn settings(upstream_base_url: String, upstream_api_key: &str) -> Settings {
    Settings {
        identities: IdentityMap::parse("e2e-key:e2e").expect("identity map should parse"),
        rate_limit_per_minute: 5,
        upstream_base_url,
        upstream_api_key: upstream_api_key.to_string(),
        ..Settings::default()
    }
}

async fn spawn_gateway_server(settings: Settings) -> (SocketAddr, JoinHandle<()>) {
    init_tracing();

    let pipeline = Pipeline::from_settings(&settings).expect("pipeline should build");
    let app: Router = build_routes(Arc::new(pipeline));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve gateway app");
    });

    (addr, handle)
}

async fn post_chat(addr: SocketAddr, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/v1/chat/completions"))
        .header(API_KEY_HEADER, "e2e-key")
        .json(&body)
        .send()
        .await
        .expect("chat request")
}

#[tokio::test]
async fn gateway_forwards_reduced_payload_upstream() {
    let upstream = MockServer::start();
    let long_context = "one ".repeat(138);
    let expected_context = vec!["one"; 128].join(" ");

    let completion_mock = upstream.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer upstream-key")
            .json_body(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": expected_context},
                    {"role": "user", "content": "Hi"}
                ]
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "id": "chatcmpl-e2e",
                "choices": [
                    {"message": {"role": "assistant", "content": "forwarded"}}
                ]
            }));
    });

    let (addr, server_handle) = spawn_gateway_server(settings(
        format!("{}/v1", upstream.base_url()),
        "upstream-key",
    ))
    .await;

    let response = post_chat(
        addr,
        json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "user", "content": long_context},
                {"role": "user", "content": "Hi"}
            ]
        }),
    )
    .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["id"], "chatcmpl-e2e");
    completion_mock.assert();

    let metrics = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .expect("metrics request")
        .text()
        .await
        .expect("metrics body");
    assert!(metrics.contains("tokens_in_total 139"));
    assert!(metrics.contains("tokens_saved_total 10"));

    server_handle.abort();
}

#[tokio::test]
async fn gateway_passes_upstream_errors_through() {
    let upstream = MockServer::start();
    upstream.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({"error": {"message": "Incorrect API key provided"}}));
    });

    let (addr, server_handle) =
        spawn_gateway_server(settings(format!("{}/v1", upstream.base_url()), "wrong")).await;

    let response = post_chat(
        addr,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["message"], "Incorrect API key provided");

    server_handle.abort();
}

#[tokio::test]
async fn gateway_reports_unreachable_upstream() {
    let (addr, server_handle) =
        spawn_gateway_server(settings("http://127.0.0.1:9/v1".to_string(), "key")).await;

    let response = post_chat(
        addr,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Upstream unavailable");

    server_handle.abort();
}

#[tokio::test]
async fn gateway_health_and_stub_mode() {
    let (addr, server_handle) =
        spawn_gateway_server(settings("https://api.openai.com/v1".to_string(), "")).await;

    let health = reqwest::get(format!("http://{addr}/healthz"))
        .await
        .expect("health check request");
    assert!(health.status().is_success());

    for _ in 0..5 {
        let response = post_chat(
            addr,
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        )
        .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json body");
        assert_eq!(
            body["choices"][0]["message"]["content"],
            "[stubbed response]"
        );
    }

    let throttled = post_chat(
        addr,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(throttled.status(), 429);
    assert!(throttled.headers().contains_key("retry-after"));

    server_handle.abort();
}
