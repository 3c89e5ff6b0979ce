// Gateway integration tests against a mock Gemini endpoint

use std::time::Duration;

use podium::gemini::{GeminiClient, GenerationOptions, TextGenerator};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn client_for(server: &mockito::ServerGuard) -> GeminiClient {
    GeminiClient::new("test-key".to_string())
        .unwrap()
        .with_base_url(server.url())
}

fn quick_options() -> GenerationOptions {
    let mut options = GenerationOptions::turn();
    options.timeout = Duration::from_secs(5);
    options
}

#[tokio::test]
async fn test_successful_generation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "a crisp argument" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "totalTokenCount": 42 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    mock.assert_async().await;
    assert!(reply.ok);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.text, "a crisp argument");
    assert!(!reply.cancelled);
    assert!(!reply.truncated());
}

#[tokio::test]
async fn test_non_2xx_passes_status_and_body_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(json!({ "error": { "message": "quota exceeded" } }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    assert!(!reply.ok);
    assert_eq!(reply.status, 429);
    assert!(reply.text.is_empty());
    assert_eq!(reply.raw["error"]["message"], "quota exceeded");
}

#[tokio::test]
async fn test_truncated_response_surfaces_partial_text() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "cut off mid" }] },
                    "finishReason": "MAX_TOKENS"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    assert!(reply.ok);
    assert!(reply.truncated());
    assert_eq!(reply.text, "cut off mid");
}

#[tokio::test]
async fn test_truncated_response_without_text_is_not_ok() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    assert!(!reply.ok);
    assert!(reply.truncated());
    assert!(reply.text.is_empty());
}

#[tokio::test]
async fn test_empty_candidates_is_not_ok() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "candidates": [] }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    assert!(!reply.ok);
    assert_eq!(reply.status, 200);
    assert!(reply.text.is_empty());
    assert!(!reply.cancelled);
}

#[tokio::test]
async fn test_timeout_reports_cancelled_not_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(|writer| {
            std::thread::sleep(Duration::from_millis(500));
            writer.write_all(b"{\"candidates\": []}")
        })
        .create_async()
        .await;

    let client = client_for(&server);
    let mut options = quick_options();
    options.timeout = Duration::from_millis(20);
    let reply = client
        .generate("prompt", &options, &CancellationToken::new())
        .await;

    assert!(!reply.ok);
    assert!(reply.cancelled);
    assert!(reply.text.is_empty());
}

#[tokio::test]
async fn test_fired_token_cancels_immediately() {
    // No mock registered: a real request would fail loudly, but the fired
    // token must win before the request matters.
    let server = mockito::Server::new_async().await;
    let client = client_for(&server);

    let token = CancellationToken::new();
    token.cancel();
    let reply = client.generate("prompt", &quick_options(), &token).await;

    assert!(reply.cancelled);
    assert!(!reply.ok);
}

#[tokio::test]
async fn test_transport_failure_is_not_cancelled() {
    // Point at a closed port: connection refused is a transport failure,
    // recognized distinctly from cancellation.
    let client = GeminiClient::new("test-key".to_string())
        .unwrap()
        .with_base_url("http://127.0.0.1:1");

    let reply = client
        .generate("prompt", &quick_options(), &CancellationToken::new())
        .await;

    assert!(!reply.ok);
    assert!(!reply.cancelled);
    assert_eq!(reply.status, 0);
}
