// ABOUTME: In-process fake HTTP services shared by the integration tests.
// ABOUTME: FakeSlack records Web API calls and replies with scripted or default JSON envelopes.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const DEFAULT_TS: &str = "1700000000.000100";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub http_method: String,
    pub authorization: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct FakeSlack {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    scripted: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
}

impl FakeSlack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response body for the next call to `method`
    pub fn respond(&self, method: &str, body: Value) -> &Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(body);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    /// Serve on an ephemeral port; returns the Web API base URL
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/api/{method}", any(handle_call))
            .with_state(self.clone());
        let addr = spawn(app).await;
        format!("http://{}/api", addr)
    }
}

async fn handle_call(
    State(fake): State<FakeSlack>,
    Path(method): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    http_method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let call = RecordedCall {
        method: method.clone(),
        http_method: http_method.to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    fake.calls.lock().unwrap().push(call);

    let scripted = fake
        .scripted
        .lock()
        .unwrap()
        .get_mut(&method)
        .and_then(VecDeque::pop_front);
    Json(scripted.unwrap_or_else(|| default_response(&method)))
}

/// Smallest envelope each typed response in the Slack client will decode
fn default_response(method: &str) -> Value {
    match method {
        "chat.postMessage" => json!({
            "ok": true,
            "channel": "C0",
            "ts": DEFAULT_TS,
            "message": {"ts": DEFAULT_TS, "text": ""}
        }),
        "chat.startStream" | "chat.appendStream" | "chat.stopStream" => {
            json!({"ok": true, "channel": "C0", "ts": DEFAULT_TS})
        }
        "auth.test" => json!({
            "ok": true,
            "user_id": "UBOT",
            "team_id": "T1",
            "team": "Test Team",
            "url": "https://test.slack.com/"
        }),
        "conversations.join" => json!({"ok": true, "channel": {"id": "C0", "created": 0}}),
        "conversations.replies" | "conversations.history" => {
            json!({"ok": true, "messages": []})
        }
        _ => json!({"ok": true}),
    }
}

/// Bind 127.0.0.1:0 and serve `app` in the background
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Fake OpenAI Responses endpoint
// =============================================================================

#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: Value,
}

/// Serves one canned reply for every POST /v1/responses
#[derive(Clone)]
pub struct FakeOpenAi {
    requests: Arc<Mutex<Vec<RecordedCompletion>>>,
    status: axum::http::StatusCode,
    content_type: &'static str,
    body: String,
}

impl FakeOpenAi {
    /// Reply with an SSE stream built from `(event, data)` pairs
    pub fn streaming(events: &[(&str, Value)]) -> Self {
        let body = events
            .iter()
            .map(|(event, data)| format!("event: {}\ndata: {}\n\n", event, data))
            .collect::<String>();
        Self {
            requests: Arc::default(),
            status: axum::http::StatusCode::OK,
            content_type: "text/event-stream",
            body,
        }
    }

    pub fn failing(status: u16, body: Value) -> Self {
        Self {
            requests: Arc::default(),
            status: axum::http::StatusCode::from_u16(status).unwrap(),
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn requests(&self) -> Vec<RecordedCompletion> {
        self.requests.lock().unwrap().clone()
    }

    /// Serve on an ephemeral port; returns the API base URL (ending in /v1)
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/v1/responses", axum::routing::post(handle_completion))
            .with_state(self.clone());
        let addr = spawn(app).await;
        format!("http://{}/v1", addr)
    }
}

async fn handle_completion(
    State(fake): State<FakeOpenAi>,
    headers: HeaderMap,
    body: Bytes,
) -> impl axum::response::IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    fake.requests.lock().unwrap().push(RecordedCompletion {
        authorization: header("authorization"),
        accept: header("accept"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    (
        fake.status,
        [(axum::http::header::CONTENT_TYPE, fake.content_type)],
        fake.body.clone(),
    )
}
