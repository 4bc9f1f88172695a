// Model client tests against a mock Gemini endpoint.

use datachat::config::Config;
use datachat::gemini::{GeminiClient, ModelError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GeminiClient {
    let config = Config::new(
        "test-key".to_string(),
        "gemini-2.0-flash-lite".to_string(),
        server.uri(),
    )
    .unwrap();
    GeminiClient::new(&config)
}

fn completion_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            {
                "content": {
                    "role": "model",
                    "parts": [{ "text": text }]
                }
            }
        ]
    })
}

#[tokio::test]
async fn test_complete_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "contents": [{ "parts": [{ "text": "hello" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there!")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).complete("hello").await.unwrap();
    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn test_complete_joins_multiple_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                {
                    "content": {
                        "parts": [{ "text": "first " }, { "text": "second" }]
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let reply = client_for(&server).complete("hello").await.unwrap();
    assert_eq!(reply, "first second");
}

#[tokio::test]
async fn test_complete_surfaces_api_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).complete("hello").await.unwrap_err();
    match err {
        ModelError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Resource has been exhausted");
        }
        other => panic!("expected ModelError::Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_complete_falls_back_to_raw_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client_for(&server).complete("hello").await.unwrap_err();
    match err {
        ModelError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected ModelError::Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_complete_empty_candidates_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server).complete("hello").await.unwrap_err();
    assert!(matches!(err, ModelError::Empty));
}

#[tokio::test]
async fn test_complete_connection_failure_is_a_request_error() {
    // Nothing listens on this port.
    let config = Config::new(
        "test-key".to_string(),
        "gemini-2.0-flash-lite".to_string(),
        "http://127.0.0.1:9".to_string(),
    )
    .unwrap();
    let err = GeminiClient::new(&config)
        .complete("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Request(_)));
}
