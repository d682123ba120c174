//! Router behaviour, end to end through axum

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use common::{scripted_service, ScriptedProvider, Step};
use serde_json::Value;
use std::sync::Arc;
use tangkhul_proxy::{router, PromptBook, ProviderKind};
use tower::ServiceExt;

async fn call(app: axum::Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn providers(
    primary: Vec<Step>,
    secondary: Vec<Step>,
) -> (axum::Router, Arc<ScriptedProvider>, Arc<ScriptedProvider>) {
    let primary = ScriptedProvider::new(ProviderKind::Primary, primary);
    let secondary = ScriptedProvider::new(ProviderKind::Secondary, secondary);
    let service = scripted_service(primary.clone(), secondary.clone());
    (router(Arc::new(service)), primary, secondary)
}

#[tokio::test]
async fn acknowledgement_is_answered_without_providers() {
    let (app, primary, secondary) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);

    let (status, body) = call(app, Method::POST, "/api/ai-proxy", r#"{"message":"okay"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], PromptBook::default().acknowledgement());
    assert_eq!(body["provider"], "local");
    assert_eq!(body["usedFallback"], false);
    assert!(body["conversationId"].is_string());
    assert_eq!(primary.call_count() + secondary.call_count(), 0);
}

#[tokio::test]
async fn history_request_is_answered_by_preferred_provider() {
    let (app, primary, secondary) = providers(
        vec![Step::Reply("unused")],
        vec![Step::Reply("<think>they greeted</think>Lovely! How do you say 'water'?")],
    );

    let body = r#"{
        "messages": [
            {"role": "assistant", "content": "Welcome!"},
            {"role": "user", "content": "Hello, I am here to teach"}
        ],
        "apiProvider": "perplexity"
    }"#;
    let (status, json) = call(app, Method::POST, "/", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Lovely!\n\nHow do you say 'water'?");
    assert_eq!(json["provider"], "secondary");
    assert_eq!(json["usedFallback"], false);
    assert!(json.get("conversationId").is_none());
    assert_eq!(primary.call_count(), 0);

    // system prompt prepended and the leading assistant turn repaired
    let sent = &secondary.calls()[0];
    assert!(sent[0].is_system());
    assert_eq!(sent[1].content, "Hi");
    assert_eq!(sent.last().unwrap().content, "Hello, I am here to teach");
}

#[tokio::test]
async fn both_providers_failing_still_returns_200() {
    let (app, primary, secondary) = providers(vec![Step::Status(500)], vec![Step::Missing]);

    let (status, json) = call(
        app,
        Method::POST,
        "/api/ai-proxy",
        r#"{"message":"Hello!"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["provider"], "local");
    assert_eq!(json["usedFallback"], true);
    assert!(!json["response"].as_str().unwrap().is_empty());
    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 1);
}

#[tokio::test]
async fn handler_panic_is_answered_with_generic_fallback() {
    let (app, primary, _) = providers(vec![Step::Panic], vec![Step::Reply("unused")]);

    let (status, json) = call(
        app,
        Method::POST,
        "/api/ai-proxy",
        r#"{"message":"Tell me a word"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], PromptBook::default().generic());
    assert_eq!(json["provider"], "local");
    assert_eq!(json["usedFallback"], true);
    assert_eq!(primary.call_count(), 1);
}

#[tokio::test]
async fn empty_object_is_bad_request() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let (status, json) = call(app, Method::POST, "/api/ai-proxy", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No user message"));
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let (status, json) = call(app, Method::POST, "/api/ai-proxy", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn unknown_role_is_bad_request() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let body = r#"{"messages":[{"role":"narrator","content":"once upon a time"}]}"#;
    let (status, _) = call(app, Method::POST, "/api/ai-proxy", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn messages_without_user_turn_get_opening_prompt() {
    let (app, primary, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let body = r#"{"messages":[{"role":"system","content":"be nice"}]}"#;
    let (status, json) = call(app, Method::POST, "/api/ai-proxy", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], PromptBook::default().opening());
    assert_eq!(primary.call_count(), 0);
}

#[tokio::test]
async fn options_preflight_is_ok() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);

    let (status, _) = call(app.clone(), Method::OPTIONS, "/api/ai-proxy", "").await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ai-proxy")
        .header(header::ORIGIN, "https://trainer.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let (status, _) = call(app, Method::GET, "/api/ai-proxy", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn conversation_id_threads_history() {
    let (app, primary, _) = providers(
        vec![Step::Reply("How do you say 'rain'?"), Step::Reply("Thanks!")],
        vec![Step::Reply("unused")],
    );

    let (_, first) = call(
        app.clone(),
        Method::POST,
        "/api/ai-proxy",
        r#"{"message":"Teach me something","conversationId":"conv-1"}"#,
    )
    .await;
    assert_eq!(first["conversationId"], "conv-1");

    call(
        app,
        Method::POST,
        "/api/ai-proxy",
        r#"{"message":"It is called ura","conversationId":"conv-1"}"#,
    )
    .await;

    let second = &primary.calls()[1];
    let contents: Vec<_> = second.iter().skip(1).map(|t| t.content.as_str()).collect();
    assert_eq!(
        contents,
        ["Teach me something", "How do you say 'rain'?", "It is called ura"]
    );
}

#[tokio::test]
async fn health_reports_provider_presence() {
    let (app, _, _) = providers(vec![Step::Reply("x")], vec![Step::Reply("y")]);
    let (status, json) = call(app, Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["primaryConfigured"], true);
    assert_eq!(json["secondaryConfigured"], true);
    assert_eq!(json["language"], "Tangkhul");
}
