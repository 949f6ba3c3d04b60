//! TelegramSink against a local stub of the Bot API.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use weatherbell_notifier::{DeliveryError, DeliverySink, Message, TelegramSink};

const BLOCKED_CHAT: i64 = 2;
const THROTTLED_CHAT: i64 = 3;

#[derive(Clone, Default)]
struct Stub {
    calls: Arc<Mutex<Vec<(String, i64)>>>,
}

impl Stub {
    fn record(&self, method: &str, body: &Value) -> i64 {
        let chat_id = body["chat_id"].as_i64().unwrap_or_default();
        self.calls.lock().unwrap().push((method.to_string(), chat_id));
        chat_id
    }

    fn calls(&self) -> Vec<(String, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn send_message(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match stub.record("sendMessage", &body) {
        BLOCKED_CHAT => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })),
        ),
        THROTTLED_CHAT => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 3"
            })),
        ),
        _ => (StatusCode::OK, Json(json!({ "ok": true, "result": {} }))),
    }
}

async fn send_sticker(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.record("sendSticker", &body);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "description": "Bad Request: wrong file identifier" })),
    )
}

async fn spawn_stub() -> (TelegramSink, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/botTEST/sendMessage", post(send_message))
        .route("/botTEST/sendSticker", post(send_sticker))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let sink = TelegramSink::new("TEST")
        .unwrap()
        .with_base_url(format!("http://{}", addr));
    (sink, stub)
}

#[tokio::test]
async fn test_delivers_text() {
    let (sink, stub) = spawn_stub().await;
    sink.deliver(&Message::text(1, "<b>hello</b>")).await.unwrap();
    assert_eq!(stub.calls(), vec![("sendMessage".to_string(), 1)]);
}

#[tokio::test]
async fn test_failed_sticker_does_not_fail_delivery() {
    let (sink, stub) = spawn_stub().await;
    let message = Message::text(1, "hello").with_sticker(Some("bogus"));

    sink.deliver(&message).await.unwrap();
    assert_eq!(
        stub.calls(),
        vec![("sendMessage".to_string(), 1), ("sendSticker".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_blocked_chat_is_unreachable() {
    let (sink, stub) = spawn_stub().await;
    let message = Message::text(BLOCKED_CHAT, "hello").with_sticker(Some("s"));

    let err = sink.deliver(&message).await.unwrap_err();
    assert!(err.is_recipient_unreachable());
    // No sticker after a failed text.
    assert_eq!(stub.calls().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let (sink, _stub) = spawn_stub().await;
    let err = sink
        .deliver(&Message::text(THROTTLED_CHAT, "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Transient(d) if d.contains("Too Many Requests")));
}
