//! Router-level tests: the full pipeline wired to mock OpenAI and Gemini servers.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chatbot_api_server::config::{Settings, SettingsHandle};
use chatbot_api_server::services::{
    ContentRetriever, FaqMatcher, MessagePipeline, ProviderGateway, SessionStore, StaticContentSource,
};
use chatbot_api_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    router: Router,
    sessions: SessionStore,
}

fn app(server: &MockServer) -> TestApp {
    let mut settings = Settings::default();
    settings.ai.openai.base_url = Some(server.uri());
    settings.ai.openai.api_key = "sk-test".to_string();
    settings.ai.gemini.base_url = Some(server.uri());
    settings.ai.gemini.api_key = "gm-test".to_string();
    let settings = SettingsHandle::fixed(settings);

    let gateway = Arc::new(ProviderGateway::new(settings.clone()));
    let retriever = Arc::new(ContentRetriever::new(
        Arc::new(StaticContentSource::bundled().unwrap()),
        gateway.clone(),
        settings.clone(),
    ));
    let sessions = SessionStore::new(settings.clone());

    let pipeline = Arc::new(MessagePipeline::new(
        sessions.clone(),
        Arc::new(FaqMatcher::bundled().unwrap()),
        retriever,
        gateway,
    ));

    TestApp {
        router: build_router(AppState { pipeline, settings }),
        sessions,
    }
}

async fn post_chat(router: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn mount_embeddings_unavailable(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
}

async fn mount_openai_quota_exceeded(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "You exceeded your current quota", "code": "insufficient_quota" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let app = app(&server);

    let response = app
        .router
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_faq_answer_without_provider_calls() {
    let server = MockServer::start().await;
    let app = app(&server);

    let (status, body) = post_chat(
        &app.router,
        r#"{"message": "How can I track my order?", "sessionId": "widget-1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usedFAQ"], true);
    assert_eq!(body["usedFallback"], false);
    assert_eq!(body["noRelevantContentFound"], false);
    assert!(body["message"].as_str().unwrap().contains("track-order"));

    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(app.sessions.history("widget-1").len(), 2);
}

#[tokio::test]
async fn test_fallback_to_gemini() {
    let server = MockServer::start().await;
    mount_embeddings_unavailable(&server).await;
    mount_openai_quota_exceeded(&server).await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Happy to help with that." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server);

    let (status, body) = post_chat(
        &app.router,
        r#"{"message": "Tell me a story", "sessionId": "widget-2"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Happy to help with that.");
    assert_eq!(body["usedFallback"], true);
    assert_eq!(body["usedFAQ"], false);
    assert_eq!(body["noRelevantContentFound"], true);
    assert_eq!(app.sessions.history("widget-2").len(), 2);
}

#[tokio::test]
async fn test_both_providers_down() {
    let server = MockServer::start().await;
    mount_embeddings_unavailable(&server).await;
    mount_openai_quota_exceeded(&server).await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let app = app(&server);

    let (status, body) = post_chat(
        &app.router,
        r#"{"message": "Tell me a story", "sessionId": "widget-3"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate response with both AI providers");
    assert_eq!(body["usedFallback"], true);
    assert_eq!(body["noRelevantContentFound"], true);
    assert!(!body.to_string().contains("backend exploded"));

    // Only the user message was recorded
    assert_eq!(app.sessions.history("widget-3").len(), 1);
}

#[tokio::test]
async fn test_validation_errors() {
    let server = MockServer::start().await;
    let app = app(&server);

    let cases = [
        r#"{"sessionId": "widget-4"}"#,
        r#"{"message": 42, "sessionId": "widget-4"}"#,
        r#"{"message": "", "sessionId": "widget-4"}"#,
        r#"{"message": "hello"}"#,
        r#"{"message": "hello", "sessionId": ""}"#,
        r#"{not json"#,
    ];

    for case in cases {
        let (status, body) = post_chat(&app.router, case).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case: {}", case);
        assert!(body["error"].is_string(), "case: {}", case);
    }

    assert!(app.sessions.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_whitespace_message_reaches_provider() {
    let server = MockServer::start().await;
    mount_embeddings_unavailable(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "What can I do for you?" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server);

    let (status, body) = post_chat(&app.router, r#"{"message": "   ", "sessionId": "widget-5"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "What can I do for you?");
    assert_eq!(body["usedFAQ"], false);
    assert_eq!(app.sessions.history("widget-5").len(), 2);
}
