// Dedicated export task: completed windows arrive over a bounded channel so a slow
// or unreachable metrics store never delays the poll tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::metrics_store::MetricsStoreClient;
use crate::models::AggregationWindow;

/// Counters shared with the worker's "app stats" log line.
#[derive(Debug, Default)]
pub struct ExportCounters {
    pub windows_exported: AtomicU64,
    pub windows_failed: AtomicU64,
    pub windows_dropped: AtomicU64,
}

/// Hands a window to the exporter without waiting. A full or closed queue drops it.
pub fn enqueue(
    tx: &mpsc::Sender<AggregationWindow>,
    window: AggregationWindow,
    counters: &ExportCounters,
) {
    if let Err(e) = tx.try_send(window) {
        counters.windows_dropped.fetch_add(1, Ordering::Relaxed);
        let (reason, window) = match e {
            mpsc::error::TrySendError::Full(w) => ("queue full", w),
            mpsc::error::TrySendError::Closed(w) => ("exporter stopped", w),
        };
        tracing::warn!(
            operation = "enqueue_window",
            reason,
            interval = %window.interval_label(),
            end_ms = window.end_ms,
            "dropping completed window"
        );
    }
}

/// Spawns the task that pushes windows to the store one at a time, in arrival order.
/// Exits once every sender is dropped and the queue is drained.
pub fn spawn_exporter(
    mut rx: mpsc::Receiver<AggregationWindow>,
    store: MetricsStoreClient,
    counters: Arc<ExportCounters>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(window) = rx.recv().await {
            match store.push_window(&window).await {
                Ok(()) => {
                    counters.windows_exported.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        operation = "push_window",
                        interval = %window.interval_label(),
                        interfaces = window.interfaces.len(),
                        "window exported"
                    );
                }
                Err(e) => {
                    counters.windows_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        error = %e,
                        operation = "push_window",
                        interval = %window.interval_label(),
                        end_ms = window.end_ms,
                        "metrics export failed"
                    );
                }
            }
        }
        tracing::debug!("Exporter shutting down");
    })
}
