// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::metrics_store::HistoryQuerier;
use crate::models::LiveUpdate;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) live_tx: broadcast::Sender<LiveUpdate>,
    pub(crate) latest_rx: watch::Receiver<LiveUpdate>,
    pub(crate) ws_clients: Arc<AtomicUsize>,
    /// `None` when the metrics store is disabled.
    pub(crate) history: Option<Arc<HistoryQuerier>>,
    pub(crate) uplinks: Arc<HashSet<String>>,
}

pub fn app(
    live_tx: broadcast::Sender<LiveUpdate>,
    latest_rx: watch::Receiver<LiveUpdate>,
    ws_clients: Arc<AtomicUsize>,
    history: Option<HistoryQuerier>,
    config: &AppConfig,
) -> Router {
    let state = AppState {
        live_tx,
        latest_rx,
        ws_clients,
        history: history.map(Arc::new),
        uplinks: Arc::new(config.monitoring.uplink_interfaces.iter().cloned().collect()),
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/current", get(http::current_handler)) // GET /api/current
        .route("/api/history", get(http::history_handler)) // GET /api/history
        .route("/api/realtime", get(ws::ws_realtime)) // WS /api/realtime
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
