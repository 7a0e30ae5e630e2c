// WebSocket handler: realtime rate stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::LiveUpdate;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the realtime connection count on drop (connect = +1, drop = -1).
struct WsClientGuard(Arc<AtomicUsize>);

impl Drop for WsClientGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Sends one text frame; `false` if the client is gone or too slow.
async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    matches!(
        timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await,
        Ok(Ok(()))
    )
}

pub(super) async fn ws_realtime(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.live_tx.clone();
    let latest_rx = state.latest_rx.clone();
    let conn_count = state.ws_clients.clone();
    ws.on_upgrade(move |socket| async move {
        // Subscribe before reading the latest value so no update falls in between.
        let mut rx = tx.subscribe();
        let latest = latest_rx.borrow().clone();
        if let Err(e) = stream_realtime(socket, &mut rx, latest, conn_count).await {
            tracing::info!("Realtime stream error: {}", e);
        }
    })
}

async fn stream_realtime(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<LiveUpdate>,
    latest: LiveUpdate,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let _guard = WsClientGuard(conn_count);
    tracing::info!("Client connected to realtime stream");

    if !latest.interfaces.is_empty() && !send_text(&mut socket, serde_json::to_string(&latest)?).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        let json = serde_json::to_string(&update)?;
                        if !send_text(&mut socket, json).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Realtime client lagged, skipped {} updates", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::debug!("Client disconnected from realtime stream");
    Ok(())
}
