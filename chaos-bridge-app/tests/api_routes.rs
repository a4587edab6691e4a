//! HTTP surface tests against the router with mock backends.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chaos_bridge_app::{build_router, AppState};
use chaos_bridge_core::{Dispatcher, DispatcherConfig, Preferences};
use chaos_bridge_policy::SafetyGate;
use chaos_bridge_providers::{
    CodeGenerator, ContentScanner, DisabledScanner, ProviderError, ScanOutcome,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const PLACEHOLDER: &str = "https://i.imgur.com/tRaI8JO.jpg";

// Mock implementations
struct SplitGenerator {
    fail: AtomicBool,
}

#[async_trait]
impl CodeGenerator for SplitGenerator {
    async fn generate(&self, instructions: &str, _: &str) -> Result<String, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Http("connection refused".to_string()));
        }
        if instructions.contains("AGGRESSIVE") {
            return Ok("RunConsoleCommand(\"sv_gravity\", \"600\")".to_string());
        }
        Ok("<code>---UNDO---<undo>".to_string())
    }

    fn name(&self) -> &str {
        "split"
    }
}

struct DomainScanner;

#[async_trait]
impl ContentScanner for DomainScanner {
    async fn scan(&self, text: &str) -> ScanOutcome {
        if text.contains("evil.example") {
            ScanOutcome {
                sanitized_text: text.replace("https://evil.example/x.png", PLACEHOLDER),
                extracted_context: String::new(),
                blocked: true,
            }
        } else if text.contains("imgur.com") {
            ScanOutcome {
                sanitized_text: text.to_string(),
                extracted_context: "Image shows: 'a cat'.".to_string(),
                blocked: false,
            }
        } else {
            ScanOutcome::passthrough(text)
        }
    }

    fn enabled(&self) -> bool {
        true
    }
}

struct Harness {
    app: Router,
    generator: Arc<SplitGenerator>,
}

fn harness_with(scanner: Arc<dyn ContentScanner>) -> Harness {
    let generator = Arc::new(SplitGenerator {
        fail: AtomicBool::new(false),
    });
    let dispatcher = Dispatcher::new(
        SafetyGate::default(),
        scanner,
        generator.clone(),
        Preferences::default(),
        DispatcherConfig::default(),
    );
    let app = build_router(AppState::new(Arc::new(dispatcher), PLACEHOLDER));
    Harness { app, generator }
}

fn harness() -> Harness {
    harness_with(Arc::new(DisabledScanner))
}

async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, &body.to_string()).await
}

#[tokio::test]
async fn test_trigger_then_poll() {
    let h = harness();

    let (status, body) = post(&h.app, "/trigger", json!({"prompt": "make everyone tiny"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "queued",
            "code_preview": "<code>",
            "has_undo": true,
            "command_id": 1,
            "context_found": "",
            "was_blocked": false
        })
    );

    let (_, body) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(body, json!({"has_code": true, "code": "<code>"}));

    let (_, body) = send(&h.app, "POST", "/poll", "").await;
    assert_eq!(body, json!({"has_code": false}));
}

#[tokio::test]
async fn test_trigger_without_prompt_is_client_error() {
    let h = harness();

    for body in ["", "{}", "not json", r#"{"prompt": ""}"#, r#"{"prompt": 5}"#] {
        let (status, value) = send(&h.app, "POST", "/trigger", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(value["error"].is_string());
    }
}

#[tokio::test]
async fn test_map_change_is_ignored() {
    let h = harness();

    let (status, body) = post(
        &h.app,
        "/trigger",
        json!({"prompt": "change the map to gm_flatgrass"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert!(body["message"].is_string());

    let (_, body) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(body["has_code"], false);
}

#[tokio::test]
async fn test_history_lists_commands_and_preferences() {
    let h = harness();
    post(&h.app, "/trigger", json!({"prompt": "make everyone tiny"})).await;

    let (status, body) = send(&h.app, "GET", "/history", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"][0]["id"], 1);
    assert_eq!(body["history"][0]["userPrompt"], "make everyone tiny");
    assert_eq!(body["history"][0]["executionCode"], "<code>");
    assert_eq!(body["history"][0]["undoCode"], "<undo>");
    assert_eq!(body["history"][0]["status"], "executed");
    assert_eq!(
        body["preferences"],
        json!({"includeHistoryInAI": true, "historyEnabled": true, "maxHistoryLength": 50})
    );
}

#[tokio::test]
async fn test_repeat_and_undo() {
    let h = harness();
    post(&h.app, "/trigger", json!({"prompt": "make everyone tiny"})).await;
    post(&h.app, "/poll", json!({})).await;

    let (_, body) = post(&h.app, "/repeat", json!({"command_id": 1})).await;
    assert_eq!(body["status"], "success");
    let (_, body) = post(&h.app, "/undo", json!({"command_id": 1})).await;
    assert_eq!(body["status"], "success");

    let (_, first) = post(&h.app, "/poll", json!({})).await;
    let (_, second) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(first["code"], "<code>");
    assert_eq!(second["code"], "<undo>");
}

#[tokio::test]
async fn test_unknown_command_id_reports_error_status() {
    let h = harness();

    for uri in ["/repeat", "/undo", "/force_undo"] {
        let (status, body) = post(&h.app, uri, json!({"command_id": 99})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error", "{}", uri);
        assert!(body["message"].as_str().unwrap().contains("99"));
    }

    let (_, body) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(body["has_code"], false);
}

#[tokio::test]
async fn test_missing_command_id_is_client_error() {
    let h = harness();
    for uri in ["/repeat", "/undo", "/force_undo"] {
        let (status, _) = send(&h.app, "POST", uri, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_force_undo_success_and_failure() {
    let h = harness();
    post(&h.app, "/trigger", json!({"prompt": "turn off gravity"})).await;
    post(&h.app, "/poll", json!({})).await;

    let (_, body) = post(&h.app, "/force_undo", json!({"command_id": 1})).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["force_undo_code"], "RunConsoleCommand(\"sv_gravity\", \"600\")");
    let (_, polled) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(polled["code"], body["force_undo_code"]);

    h.generator.fail.store(true, Ordering::SeqCst);
    let (status, body) = post(&h.app, "/force_undo", json!({"command_id": 1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body.get("force_undo_code").is_none());
    assert!(body["message"].as_str().unwrap().contains("connection refused"));

    let (_, history) = send(&h.app, "GET", "/history", "").await;
    assert_eq!(history["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_preferences_update_and_history_toggle() {
    let h = harness();

    let (_, body) = post(&h.app, "/preferences", json!({"historyEnabled": false})).await;
    assert_eq!(body["preferences"]["historyEnabled"], false);
    assert_eq!(body["preferences"]["maxHistoryLength"], 50);

    let (_, body) = post(&h.app, "/trigger", json!({"prompt": "spawn a crow"})).await;
    assert_eq!(body["status"], "queued");
    assert_eq!(body["command_id"], Value::Null);

    let (_, history) = send(&h.app, "GET", "/history", "").await;
    assert!(history["history"].as_array().unwrap().is_empty());
    let (_, polled) = post(&h.app, "/poll", json!({})).await;
    assert_eq!(polled["has_code"], true);

    // Malformed bodies change nothing.
    let (status, body) = send(&h.app, "POST", "/preferences", "{{{").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["historyEnabled"], false);
}

#[tokio::test]
async fn test_clear_history() {
    let h = harness();
    post(&h.app, "/trigger", json!({"prompt": "a"})).await;
    post(&h.app, "/trigger", json!({"prompt": "b"})).await;

    let (_, body) = send(&h.app, "POST", "/clear_history", "").await;
    assert_eq!(body["status"], "success");

    let (_, history) = send(&h.app, "GET", "/history", "").await;
    assert!(history["history"].as_array().unwrap().is_empty());

    let (_, body) = post(&h.app, "/trigger", json!({"prompt": "c"})).await;
    assert_eq!(body["command_id"], 3);
}

#[tokio::test]
async fn test_scan_test_disabled_is_client_error() {
    let h = harness();
    let (status, body) = post(&h.app, "/scan_test", json!({"url": "https://imgur.com/a.png"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn test_scan_test_reports_verdict() {
    let h = harness_with(Arc::new(DomainScanner));

    let (status, _) = post(&h.app, "/scan_test", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = post(
        &h.app,
        "/scan_test",
        json!({"url": "https://evil.example/x.png"}),
    )
    .await;
    assert_eq!(
        body,
        json!({
            "original_url": "https://evil.example/x.png",
            "blocked": true,
            "replaced_url": PLACEHOLDER,
            "ai_context_extracted": ""
        })
    );

    let (_, body) = post(&h.app, "/scan_test", json!({"url": "https://i.imgur.com/cat.png"})).await;
    assert_eq!(body["blocked"], false);
    assert_eq!(body["replaced_url"], "https://i.imgur.com/cat.png");
    assert_eq!(body["ai_context_extracted"], "Image shows: 'a cat'.");
}

#[tokio::test]
async fn test_blocked_image_request_is_ignored() {
    let h = harness_with(Arc::new(DomainScanner));

    let (_, body) = post(
        &h.app,
        "/trigger",
        json!({"prompt": "show https://evil.example/x.png"}),
    )
    .await;
    assert_eq!(
        body,
        json!({"status": "ignored", "message": "Safety protocols blocked this request."})
    );

    let (_, body) = post(
        &h.app,
        "/trigger",
        json!({"prompt": "spawn this https://i.imgur.com/cat.png"}),
    )
    .await;
    assert_eq!(body["status"], "queued");
    assert_eq!(body["context_found"], "Image shows: 'a cat'.");
}

#[tokio::test]
async fn test_stats_and_index() {
    let h = harness();
    post(&h.app, "/trigger", json!({"prompt": "make everyone tiny"})).await;
    post(&h.app, "/trigger", json!({"prompt": "changelevel now"})).await;

    let (status, body) = send(&h.app, "GET", "/stats", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests_received"], 2);
    assert_eq!(body["requests_accepted"], 1);
    assert_eq!(body["requests_ignored"], 1);
    assert_eq!(body["acceptance_rate"], 0.5);
    assert_eq!(body["pending_scripts"], 1);
    assert_eq!(body["history_length"], 1);
    assert_eq!(body["scanner_enabled"], false);

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/trigger"));
}
