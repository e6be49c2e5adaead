//! Mock signal server REST endpoints for integration tests.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

/// Server-side state behind `/snapshot` and `/toggle_mode`.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub mode: String,
    pub last_update: String,
    pub signals: Vec<Value>,
    pub fail_toggle: bool,
    pub snapshot_hits: u32,
    pub toggle_hits: u32,
}

impl ServerState {
    pub fn new(mode: &str, signals: Vec<Value>) -> Self {
        Self {
            mode: mode.to_string(),
            last_update: "2024-05-01 10:00:00".to_string(),
            signals,
            fail_toggle: false,
            snapshot_hits: 0,
            toggle_hits: 0,
        }
    }
}

type SharedState = Arc<Mutex<ServerState>>;

/// A mock REST server.
pub struct MockRestServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: oneshot::Sender<()>,
}

impl MockRestServer {
    pub async fn start(initial: ServerState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state: SharedState = Arc::new(Mutex::new(initial));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/snapshot", get(snapshot))
            .route("/toggle_mode", post(toggle_mode))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Mutate server state.
    pub async fn update(&self, f: impl FnOnce(&mut ServerState)) {
        f(&mut *self.state.lock().await);
    }

    pub async fn state(&self) -> ServerState {
        self.state.lock().await.clone()
    }

    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn snapshot(State(state): State<SharedState>) -> Json<Value> {
    let mut state = state.lock().await;
    state.snapshot_hits += 1;
    Json(json!({
        "mode": state.mode,
        "lastUpdate": state.last_update,
        "signals": state.signals,
    }))
}

async fn toggle_mode(State(state): State<SharedState>) -> Result<Json<Value>, StatusCode> {
    let mut state = state.lock().await;
    state.toggle_hits += 1;
    if state.fail_toggle {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.mode = if state.mode == "LIVE" { "TEST" } else { "LIVE" }.to_string();
    Ok(Json(json!({ "mode": state.mode })))
}
