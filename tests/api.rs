//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;
use voice_chat::api::{ApiServer, ApiServerBuilder};

mod common;
use common::{
    FAKE_MP3, FakeGenerator, FakeSynthesizer, FakeTranscriber, Harness, Reply, wav_fixture,
};

fn build_test_server(h: &Harness) -> ApiServer {
    ApiServerBuilder::new(h.handler.clone(), 0)
        .model("test-model".to_string())
        .build()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create_session(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    create_session(&app).await;

    let (status, json) = send(&app, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["checks"]["generation"]["status"], "ok");
    assert!(
        json["checks"]["generation"]["message"]
            .as_str()
            .unwrap()
            .contains("test-model")
    );
    assert_eq!(json["checks"]["stt"]["status"], "ok");
    assert_eq!(json["sessions"], 1);
}

#[tokio::test]
async fn test_ready_reports_missing_voice_services() {
    let handler = voice_chat::ChatHandler::new(Arc::new(FakeGenerator::new(Reply::Echo)));
    let app = ApiServerBuilder::new(handler, 0).build().router();

    let (_, json) = send(&app, get("/ready")).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["tts"]["status"], "unavailable");

    let (_, json) = send(&app, get("/api/voice/capabilities")).await;
    assert_eq!(json["stt_available"], false);
    assert_eq!(json["tts_available"], false);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();

    let (status, json) = send(&app, get("/api/personalities")).await;
    assert_eq!(status, StatusCode::OK);
    let personalities = json.as_array().unwrap();
    assert_eq!(personalities.len(), 4);
    assert_eq!(personalities[0]["id"], "general_assistant");
    assert!(personalities[0]["instruction"].is_string());

    let (status, json) = send(&app, get("/api/languages")).await;
    assert_eq!(status, StatusCode::OK);
    let languages = json.as_array().unwrap();
    assert_eq!(languages.len(), 5);
    assert_eq!(languages[0]["locale"], "en-US");
    assert_eq!(languages[4]["voice"], "hi-IN-Neural2-A");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    let id = create_session(&app).await;

    let (status, json) = send(&app, get(&format!("/api/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["personality"], "general_assistant");
    assert_eq!(json["language"], "english");
    assert_eq!(json["phase"]["state"], "idle");
    assert!(json["messages"].as_array().unwrap().is_empty());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&app, get(&format!("/api/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "session_not_found");
}

#[tokio::test]
async fn test_unknown_session_events_are_rejected() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    let id = uuid::Uuid::new_v4();

    let (status, json) = send(
        &app,
        post_json(
            &format!("/api/sessions/{id}/events"),
            &json!({"type": "clear_history"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "session_not_found");
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn test_text_event_and_message_audio() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    let id = create_session(&app).await;

    let (status, json) = send(
        &app,
        post_json(
            &format!("/api/sessions/{id}/events"),
            &json!({"type": "submit_text", "text": "How are you?"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["accepted"], true);
    let messages = json["session"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "How are you?");
    assert_eq!(json["session"]["audio"], json!([1]));

    let response = app
        .clone()
        .oneshot(get(&format!("/api/sessions/{id}/messages/1/audio")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], FAKE_MP3);

    let (status, json) = send(&app, get(&format!("/api/sessions/{id}/messages/5/audio"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "message_not_found");
}

#[tokio::test]
async fn test_message_audio_synthesis_failure() {
    let h = Harness::new(
        FakeGenerator::new(Reply::Fixed("Hi".to_string())),
        FakeTranscriber::text("unused"),
        FakeSynthesizer::failing(),
    );
    let app = build_test_server(&h).router();
    let id = create_session(&app).await;

    send(
        &app,
        post_json(
            &format!("/api/sessions/{id}/events"),
            &json!({"type": "submit_text", "text": "hello"}),
        ),
    )
    .await;

    let (status, json) = send(&app, get(&format!("/api/sessions/{id}/messages/1/audio"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "synthesis_failed");
}

#[tokio::test]
async fn test_audio_upload_then_confirm() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    let id = create_session(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{id}/audio"))
        .header(header::CONTENT_TYPE, "audio/wav")
        .body(Body::from(wav_fixture(0.5)))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["phase"]["state"], "transcribed");
    assert_eq!(json["session"]["phase"]["text"], "hello there");
    assert_eq!(json["notices"][0]["level"], "success");

    let (status, json) = send(
        &app,
        post_json(
            &format!("/api/sessions/{id}/events"),
            &json!({"type": "confirm_voice"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["messages"][0]["content"], "hello there");
    assert_eq!(h.transcriber.calls(), 1);
}

#[tokio::test]
async fn test_busy_session_returns_conflict() {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(
        FakeGenerator::gated(Reply::Echo, gate.clone()),
        FakeTranscriber::text("unused"),
        FakeSynthesizer::new(),
    );
    let server = build_test_server(&h);
    let app = server.router();
    let id = create_session(&app).await;
    let uri = format!("/api/sessions/{id}/events");

    let first_app = app.clone();
    let first_uri = uri.clone();
    let first = tokio::spawn(async move {
        send(
            &first_app,
            post_json(&first_uri, &json!({"type": "submit_text", "text": "one"})),
        )
        .await
    });

    let session = server
        .state()
        .sessions
        .get(id.parse().unwrap())
        .await
        .unwrap();
    common::wait_for_submission(&session).await;

    let (status, json) = send(
        &app,
        post_json(&uri, &json!({"type": "submit_text", "text": "two"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["accepted"], false);

    gate.notify_one();
    let (status, json) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_event_is_rejected() {
    let h = Harness::echo();
    let app = build_test_server(&h).router();
    let id = create_session(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{id}/events"),
            &json!({"type": "launch_rockets"}),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let h = Harness::echo();
    let app = ApiServerBuilder::new(h.handler.clone(), 0)
        .rate_limit(Some(1))
        .build()
        .router();

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
