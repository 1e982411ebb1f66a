//! In-process stub of the identity provider and GraphQL API.
//!
//! Every route answers from a per-path queue of scripted responses, falling
//! back to a fixed default once the queue is empty. All requests are
//! recorded so tests can assert on headers and bodies.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use sessionkit_core::auth::unix_now;
use sessionkit_core::{AppContext, Config, Credentials, KeyValueStore, MemoryStore};

pub const CLIENT_ID: &str = "test-client";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
pub struct Stub {
    scripts: Mutex<HashMap<String, VecDeque<(u16, Value)>>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl Stub {
    /// Queue a one-shot response for `path`.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body));
    }

    pub fn requests(&self, path: &str) -> Vec<Recorded> {
        self.recorded
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn next(&self, path: &str) -> (u16, Value) {
        if let Some(scripted) = self
            .scripts
            .lock()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }
        match path {
            "/oauth/token" => (400, json!({ "error": "invalid_grant" })),
            "/graphql" => (200, json!({ "data": { "me": user_json(1, "Ada") } })),
            "/oauth/revoke" | "/users.json" | "/users/password.json" | "/api/auth/send_otp" => {
                (200, json!({}))
            }
            _ => (404, json!({ "error": "not found" })),
        }
    }
}

async fn handle(
    State(stub): State<Arc<Stub>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    stub.recorded.lock().push(Recorded {
        path: path.clone(),
        headers,
        body,
    });

    let (status, body) = stub.next(&path);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

pub struct StubServer {
    pub base_url: String,
    pub stub: Arc<Stub>,
}

impl StubServer {
    pub async fn start() -> Self {
        let stub = Arc::new(Stub::default());
        let app = Router::new().fallback(handle).with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{}", addr),
            stub,
        }
    }

    pub fn config(&self) -> Config {
        Config::new(
            self.base_url.clone(),
            format!("{}/graphql", self.base_url),
            CLIENT_ID,
        )
    }

    /// Context backed by a fresh in-memory store.
    pub async fn context(&self) -> (AppContext, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let context = self.context_with(store.clone()).await;
        (context, store)
    }

    pub async fn context_with(&self, store: Arc<dyn KeyValueStore>) -> AppContext {
        AppContext::connect(self.config(), store).await.unwrap()
    }
}

pub fn user_json(id: i64, name: &str) -> Value {
    json!({
        "__typename": "User",
        "id": id.to_string(),
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
    })
}

/// Token endpoint body as the identity provider sends it (snake_case).
pub fn token_json(access: &str, refresh: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
        "created_at": unix_now(),
        "refresh_token": refresh,
        "scope": "",
    })
}

pub fn credentials(access: &str, refresh: &str, created_at: i64, expires_in: i64) -> Credentials {
    Credentials {
        access_token: access.to_string(),
        token_type: "Bearer".to_string(),
        expires_in,
        created_at,
        refresh_token: refresh.to_string(),
        scope: String::new(),
    }
}

/// A record that expired an hour ago.
pub fn expired(access: &str, refresh: &str) -> Credentials {
    credentials(access, refresh, unix_now() - 7200, 3600)
}

pub fn unauthenticated_error() -> Value {
    json!({
        "data": null,
        "errors": [{ "message": "Not authenticated", "extensions": { "code": "UNAUTHENTICATED" } }]
    })
}
