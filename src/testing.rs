//! Test helpers: a local stand-in for the Gemini `generateContent` endpoint.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Router};
use tokio::net::TcpListener;

use crate::gemini::Gemini;

#[derive(Clone)]
pub enum MockReply {
    /// 200 with a single candidate carrying this text.
    Text(String),
    /// Given status with the given body.
    Status(u16, String),
    /// 200 with this exact JSON body.
    Raw(String),
}

#[derive(Clone)]
struct MockState {
    reply: MockReply,
    hits: Arc<AtomicUsize>,
}

async fn generate_content(State(mock): State<MockState>) -> impl IntoResponse {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    let (status, body) = match mock.reply {
        MockReply::Text(text) => (
            200,
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" }, "finishReason": "STOP" }],
                "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 20, "totalTokenCount": 30 }
            })
            .to_string(),
        ),
        MockReply::Status(code, body) => (code, body),
        MockReply::Raw(body) => (200, body),
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [("content-type", "application/json")], body)
}

/// Spawn a mock server and return a client pointed at it, plus its hit counter.
pub async fn spawn_mock_gemini_counted(reply: MockReply) -> (Gemini, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .fallback(generate_content)
        .with_state(MockState { reply, hits: hits.clone() });
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let gemini = Gemini::new("test-key", format!("http://{addr}/v1beta"), "gemini-test").expect("client");
    (gemini, hits)
}

pub async fn spawn_mock_gemini(reply: MockReply) -> Gemini {
    spawn_mock_gemini_counted(reply).await.0
}
