#![allow(dead_code)] // Test helpers appear unused when compiled independently

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

const WAIT_ATTEMPTS: usize = 50;
const WAIT_DELAY: Duration = Duration::from_millis(100);

/// One request received by the mock `/write` endpoint
#[derive(Debug, Clone)]
pub struct ReceivedWrite {
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
struct InfluxState {
    writes: Arc<Mutex<Vec<ReceivedWrite>>>,
    fail_remaining: Arc<AtomicUsize>,
    fail_status: Arc<AtomicUsize>,
}

pub struct MockInflux {
    state: InfluxState,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockInflux {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }

    pub async fn writes(&self) -> Vec<ReceivedWrite> {
        self.state.writes.lock().await.clone()
    }

    /// Every line received so far, across requests
    pub async fn lines(&self) -> Vec<String> {
        self.writes()
            .await
            .iter()
            .flat_map(|w| w.body.lines().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    /// Answer the next `count` writes with `status`
    pub fn fail_next(&self, count: usize, status: u16) {
        self.state
            .fail_status
            .store(status as usize, Ordering::SeqCst);
        self.state.fail_remaining.store(count, Ordering::SeqCst);
    }
}

/// Find an available TCP port
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Spawn a mock InfluxDB, return (handle, base URL)
pub async fn spawn_mock_influx(port: u16) -> (MockInflux, String) {
    let state = InfluxState::default();

    let app = Router::new()
        .route("/write", post(write))
        .route("/health", get(health))
        .with_state(state.clone());

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("failed to bind mock influx listener");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            eprintln!("mock influx server error: {}", err);
        }
    });

    (
        MockInflux {
            state,
            shutdown_tx,
            handle,
        },
        format!("http://127.0.0.1:{}", port),
    )
}

/// Serve a router on a fresh loopback port, return its base URL
pub async fn spawn_app(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

/// Wait for a server to respond to /health
pub async fn wait_for_health(client: &Client, base_url: &str) {
    poll_until(|| async {
        client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .ok()
            .map(|_| ())
    })
    .await
    .unwrap_or_else(|| panic!("timed out waiting for {} to be healthy", base_url));
}

async fn poll_until<T, F, Fut>(mut f: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..WAIT_ATTEMPTS {
        if let Some(result) = f().await {
            return Some(result);
        }
        tokio::time::sleep(WAIT_DELAY).await;
    }
    None
}

async fn write(
    State(state): State<InfluxState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let failing = state
        .fail_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        let status = state.fail_status.load(Ordering::SeqCst) as u16;
        return StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }

    state.writes.lock().await.push(ReceivedWrite {
        query: query.unwrap_or_default(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    StatusCode::NO_CONTENT
}

async fn health() -> &'static str {
    "ok"
}

/// A complete build record as the CI host would post it
pub fn sample_record() -> serde_json::Value {
    serde_json::json!({
        "job_name": "platform/api",
        "build_number": 42,
        "job_url": "http://ci/job/foo/",
        "start_time_ms": 1_700_000_000_000i64,
        "duration_ms": 90_000,
        "queuing_duration_ms": 1_500,
        "result": "SUCCESS",
        "status_message": "back to normal",
        "owner": "dev@example.com",
        "health_score": 100,
        "parameters": [
            { "parameters": [
                { "name": "branch", "value": "main" },
                { "name": "domain", "value": "x" }
            ]}
        ]
    })
}
