//! End-to-end tests for the relay HTTP API with a stubbed completion gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chat_relay::config::RelayConfig;
use chat_relay::conversation::{Role, Turn};
use chat_relay::llm::{CompletionGateway, GatewayError, GatewayFuture, GatewayResult};
use chat_relay::server::{AppState, build_app};
use tower::ServiceExt;

/// Scripted gateway behaviour.
enum Script {
    Reply(&'static str),
    EchoAfter(Duration),
    Fail,
    Unconfigured,
}

struct StubGateway {
    script: Script,
    calls: AtomicUsize,
}

impl StubGateway {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

impl CompletionGateway for StubGateway {
    fn is_configured(&self) -> bool {
        !matches!(self.script, Script::Unconfigured)
    }

    fn complete(&self, turns: Vec<Turn>) -> GatewayFuture<'_, GatewayResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match &self.script {
                Script::Reply(text) => Ok((*text).to_string()),
                Script::EchoAfter(delay) => {
                    tokio::time::sleep(*delay).await;
                    let last = turns.last().map(Turn::content).unwrap_or_default();
                    Ok(format!("re:{last}"))
                }
                Script::Fail => Err(GatewayError::Call("upstream exploded".to_string())),
                Script::Unconfigured => Err(GatewayError::Unavailable),
            }
        })
    }
}

fn app_with(gateway: Arc<StubGateway>, config: &RelayConfig) -> (Router, Arc<AppState>) {
    let state = AppState::with_gateway(config, gateway);
    (build_app(Arc::clone(&state)), state)
}

async fn post(app: &Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn chat_body(message: &str, conversation_id: &str) -> String {
    serde_json::json!({"message": message, "conversation_id": conversation_id}).to_string()
}

#[tokio::test]
async fn test_reset_yields_single_system_turn() {
    let (app, state) = app_with(StubGateway::new(Script::Reply("x")), &RelayConfig::default());

    let (status, json) = post(&app, "/api/reset", r#"{"conversation_id":"t1"}"#.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"success": true}));
    let turns = state.store().snapshot("t1").await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role(), Role::System);
}

#[tokio::test]
async fn test_reset_twice_matches_reset_once() {
    let (app, state) = app_with(StubGateway::new(Script::Reply("x")), &RelayConfig::default());
    post(&app, "/api/chat", chat_body("hello", "t1")).await;

    post(&app, "/api/reset", r#"{"conversation_id":"t1"}"#.to_string()).await;
    let once: Vec<(Role, String)> = state
        .store()
        .snapshot("t1")
        .await
        .unwrap()
        .iter()
        .map(|t| (t.role(), t.content().to_string()))
        .collect();

    post(&app, "/api/reset", r#"{"conversation_id":"t1"}"#.to_string()).await;
    let twice: Vec<(Role, String)> = state
        .store()
        .snapshot("t1")
        .await
        .unwrap()
        .iter()
        .map(|t| (t.role(), t.content().to_string()))
        .collect();

    assert_eq!(once, twice);
    assert_eq!(once.len(), 1);
}

#[tokio::test]
async fn test_chat_with_stub_reply() {
    let (app, state) = app_with(
        StubGateway::new(Script::Reply("randomReply")),
        &RelayConfig::default(),
    );

    let (status, json) = post(&app, "/api/chat", chat_body("bonjour", "t1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"success": true, "message": "randomReply"}));

    let turns = state.store().snapshot("t1").await.unwrap();
    let view: Vec<(Role, &str)> = turns.iter().map(|t| (t.role(), t.content())).collect();
    assert_eq!(view.len(), 3);
    assert_eq!(view[0].0, Role::System);
    assert_eq!(view[1], (Role::User, "bonjour"));
    assert_eq!(view[2], (Role::Assistant, "randomReply"));
}

#[tokio::test]
async fn test_empty_message_never_creates_conversation() {
    let gateway = StubGateway::new(Script::Reply("x"));
    let (app, state) = app_with(Arc::clone(&gateway), &RelayConfig::default());

    let (status, json) = post(&app, "/api/chat", chat_body("", "t2")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(!state.store().contains("t2"));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_message_length_bounds() {
    let (app, _state) = app_with(StubGateway::new(Script::Reply("ok")), &RelayConfig::default());

    let (status, _) = post(&app, "/api/chat", serde_json::json!({"message": "a".repeat(1001)}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for len in [1, 500, 1000] {
        let (status, _) = post(&app, "/api/chat", chat_body(&"a".repeat(len), "bounds")).await;
        assert_eq!(status, StatusCode::OK, "length {len} should be accepted");
    }
}

#[tokio::test]
async fn test_concurrent_conversations_stay_separate() {
    let (app, state) = app_with(
        StubGateway::new(Script::EchoAfter(Duration::from_millis(20))),
        &RelayConfig::default(),
    );

    let mut requests = Vec::new();
    for i in 0..3 {
        for id in ["a", "b"] {
            let app = app.clone();
            requests.push(async move {
                post(&app, "/api/chat", chat_body(&format!("{id}{i}"), id)).await
            });
        }
    }
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    for id in ["a", "b"] {
        let turns = state.store().snapshot(id).await.unwrap();
        assert_eq!(turns.len(), 7, "conversation {id}");
        assert_eq!(turns[0].role(), Role::System);
        for pair in turns[1..].chunks(2) {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[1].role(), Role::Assistant);
            assert!(pair[0].content().starts_with(id));
            assert_eq!(pair[1].content(), format!("re:{}", pair[0].content()));
        }
    }
}

#[tokio::test]
async fn test_gateway_failure_leaves_unanswered_user_turn() {
    let (app, state) = app_with(StubGateway::new(Script::Fail), &RelayConfig::default());

    let (status, json) = post(&app, "/api/chat", chat_body("x", "t3")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap_or_default().contains("exploded"));

    let turns = state.store().snapshot("t3").await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role(), Role::User);
    assert_eq!(turns[1].content(), "x");
}

#[tokio::test]
async fn test_unconfigured_gateway_is_503_without_state_change() {
    let gateway = StubGateway::new(Script::Unconfigured);
    let (app, state) = app_with(Arc::clone(&gateway), &RelayConfig::default());

    let (status, json) = post(&app, "/api/chat", chat_body("hello", "t4")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
    assert!(!state.store().contains("t4"));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_history_bounded_by_window() {
    let config = RelayConfig::default().with_history_window(6);
    let (app, state) = app_with(StubGateway::new(Script::Reply("r")), &config);

    for i in 0..25 {
        let (status, _) = post(&app, "/api/chat", chat_body(&format!("m{i}"), "long")).await;
        assert_eq!(status, StatusCode::OK);

        let turns = state.store().snapshot("long").await.unwrap();
        assert!(turns.len() - 1 <= 2 * 6);
        assert_eq!(turns[0].role(), Role::System);
    }

    let turns = state.store().snapshot("long").await.unwrap();
    assert_eq!(turns.len(), 7);
    assert_eq!(turns[1].content(), "m22");
    assert_eq!(turns[5].content(), "m24");
}
