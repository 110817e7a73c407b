//! Gemini client tests against a local mock of the API

use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde_json::{Value, json};
use voice_chat::llm::{GeminiClient, GenerationRequest, Generator};
use voice_chat::session::Message;

mod common;
use common::{Captured, spawn_mock};

/// Mock `generateContent` that records the request and answers with `reply`
fn gemini_mock(captured: Captured, status: StatusCode, reply: Value) -> Router {
    Router::new().route(
        "/models/{call}",
        post(
            move |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                let reply = reply.clone();
                async move {
                    captured.store(json!({
                        "call": call,
                        "key": headers["x-goog-api-key"].to_str().unwrap(),
                        "body": body,
                    }));
                    (status, Json(reply))
                }
            },
        ),
    )
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(
        "test-key".to_string(),
        "test-model".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_base_url(base_url)
}

fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_generate_sends_instruction_and_prompt() {
    let captured = Captured::default();
    let base = spawn_mock(gemini_mock(
        captured.clone(),
        StatusCode::OK,
        text_reply("Hi there!"),
    ))
    .await;

    let request = GenerationRequest {
        instruction: "Be brief.\n\nAlways respond in English.".to_string(),
        prompt: "Hello".to_string(),
        history: Vec::new(),
    };
    let reply = client(&base).generate(&request).await.unwrap();
    assert_eq!(reply, "Hi there!");

    let seen = captured.take();
    assert_eq!(seen["call"], "test-model:generateContent");
    assert_eq!(seen["key"], "test-key");
    assert_eq!(
        seen["body"]["systemInstruction"]["parts"][0]["text"],
        "Be brief.\n\nAlways respond in English."
    );
    let contents = seen["body"]["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[0]["parts"][0]["text"], "Hello");
}

#[tokio::test]
async fn test_history_maps_to_model_role() {
    let captured = Captured::default();
    let base = spawn_mock(gemini_mock(captured.clone(), StatusCode::OK, text_reply("3"))).await;

    let request = GenerationRequest {
        instruction: String::new(),
        prompt: "and now?".to_string(),
        history: vec![Message::user("count"), Message::assistant("1, 2")],
    };
    client(&base).generate(&request).await.unwrap();

    let body = captured.take()["body"].clone();
    assert!(body.get("systemInstruction").is_none());
    let roles: Vec<&str> = body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "model", "user"]);
}

#[tokio::test]
async fn test_multipart_reply_is_concatenated() {
    let reply = json!({
        "candidates": [{
            "content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}
        }]
    });
    let base = spawn_mock(gemini_mock(Captured::default(), StatusCode::OK, reply)).await;

    let text = client(&base)
        .generate(&GenerationRequest::default())
        .await
        .unwrap();
    assert_eq!(text, "Hello, world");
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let reply = json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}});
    let base = spawn_mock(gemini_mock(
        Captured::default(),
        StatusCode::BAD_REQUEST,
        reply,
    ))
    .await;

    let err = client(&base)
        .generate(&GenerationRequest::default())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("API key not valid"), "{message}");
}

#[tokio::test]
async fn test_blocked_prompt_is_an_error() {
    let reply = json!({"promptFeedback": {"blockReason": "SAFETY"}});
    let base = spawn_mock(gemini_mock(Captured::default(), StatusCode::OK, reply)).await;

    let err = client(&base)
        .generate(&GenerationRequest::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_empty_candidate_reports_finish_reason() {
    let reply = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
    let base = spawn_mock(gemini_mock(Captured::default(), StatusCode::OK, reply)).await;

    let err = client(&base)
        .generate(&GenerationRequest::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("MAX_TOKENS"));
}
