//! End-to-end tests over real HTTP against a mockito server.

mod common;

use common::{hello, Acme};
use futures::StreamExt;
use genai_engine::transport::RetryPolicy;
use genai_engine::{Error, FinishReason, GenOptions, Orchestrator};
use mockito::{Matcher, Server};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_retries(max_tries: u32) -> RetryPolicy {
    RetryPolicy {
        max_tries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_sync_call_sends_auth_and_request_id() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".to_string()))
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "acme-large",
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ratelimit-limit-tokens", "40000")
        .with_header("x-ratelimit-remaining-tokens", "39000")
        .with_header("x-ratelimit-reset-tokens", "1.5s")
        .with_body(common::text_response("Hi there", "stop"))
        .create_async()
        .await;

    let orch = Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url(format!("{}/v1/chat", server.url()))
        .bearer("sk-test")
        .build()
        .unwrap();

    let (result, _) = orch.gen_sync(&hello(), &GenOptions::default()).await.unwrap();
    mock.assert_async().await;
    assert_eq!(result.text(), "Hi there");
    assert_eq!(result.usage.limits.len(), 1);
    assert_eq!(result.usage.limits[0].remaining, 39000);
}

#[tokio::test]
async fn test_sse_stream_over_http() {
    init_tracing();
    let mut server = Server::new_async().await;
    let body = [
        common::delta_text("Hello"),
        common::delta_text(", world"),
        common::usage_chunk(3, 2),
        common::delta_finish("stop"),
    ]
    .iter()
    .map(|c| format!("data: {}\n\n", c))
    .collect::<String>()
        + ": keep-alive\n\ndata: [DONE]\n\n";
    let mock = server
        .mock("POST", "/v1/chat")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::PartialJson(serde_json::json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let orch = Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url(format!("{}/v1/chat", server.url()))
        .build()
        .unwrap();

    let mut stream = orch.gen_stream(&hello(), &GenOptions::default()).await;
    let mut text = String::new();
    while let Some(f) = stream.next().await {
        text.push_str(&f.text);
    }
    let (result, _) = stream.finish().await.unwrap();
    mock.assert_async().await;
    assert_eq!(text, "Hello, world");
    assert_eq!(result.text(), "Hello, world");
    assert_eq!(result.usage.total_tokens, 5);
    assert_eq!(result.usage.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_header("retry-after-ms", "1")
        .with_body(r#"{"error":{"message":"too many requests","type":"rate_limit_exceeded"}}"#)
        .expect(3)
        .create_async()
        .await;

    let orch = Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url(format!("{}/v1/chat", server.url()))
        .retry_policy(fast_retries(3))
        .build()
        .unwrap();

    let err = orch.gen_sync(&hello(), &GenOptions::default()).await.unwrap_err();
    mock.assert_async().await;
    match err {
        Error::Api(e) => {
            assert_eq!(e.status, 429);
            assert_eq!(e.message, "too many requests");
            let id = e.request_id.expect("client request id");
            assert!(uuid::Uuid::parse_str(&id).is_ok());
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .with_status(400)
        .with_body(r#"{"error":{"message":"bad temperature","type":"invalid_request_error"}}"#)
        .expect(1)
        .create_async()
        .await;

    let orch = Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url(format!("{}/v1/chat", server.url()))
        .retry_policy(fast_retries(5))
        .build()
        .unwrap();

    let err = orch.gen_sync(&hello(), &GenOptions::default()).await.unwrap_err();
    mock.assert_async().await;
    assert!(!err.is_retryable());
}

#[test]
fn test_missing_api_key_fails_build() {
    let err = Orchestrator::builder(Acme)
        .model("acme-large")
        .sync_url("https://acme.test/v1/chat")
        .api_key_env("GENAI_ENGINE_TEST_MISSING_KEY")
        .api_key_url("https://acme.test/keys")
        .build()
        .unwrap_err();
    match err {
        Error::ApiKeyRequired { env_var, url } => {
            assert_eq!(env_var, "GENAI_ENGINE_TEST_MISSING_KEY");
            assert_eq!(url.as_deref(), Some("https://acme.test/keys"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}
