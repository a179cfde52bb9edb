//! Mock scoring service for async tests, bound to an ephemeral local port.

use std::sync::{Arc, Mutex};

use axum::{
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub struct MockScoringService {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockScoringService {
    /// Serves `POST /score` with a fixed status and raw body, and `GET /health`.
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let body = body.to_string();

        let seen = requests.clone();
        let app = Router::new()
            .route(
                "/score",
                post(move |Json(payload): Json<Value>| {
                    let seen = seen.clone();
                    let body = body.clone();
                    async move {
                        seen.lock().unwrap().push(payload);
                        (status, [(header::CONTENT_TYPE, "application/json")], body)
                    }
                }),
            )
            .route("/health", get(|| async { Json(json!({ "ok": true })) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn score_url(&self) -> String {
        format!("{}/score", self.base_url)
    }

    /// JSON bodies received on `/score`, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/score")
}
