// Poll worker: one periodic tick drives poll -> rates -> aggregate -> {live push, export queue}.
// It is the only writer of rate state and aggregation windows.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

use crate::config::AppConfig;
use crate::exporter::{self, ExportCounters};
use crate::models::{AggregationWindow, LiveUpdate};
use crate::pipeline::Pipeline;
use crate::protocol::DeviceClient;

/// Rate limit for "no receivers" log (avoid logging every tick when no one is on /api/realtime)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Device session, channels, and shutdown for the worker.
pub struct WorkerDeps<S = TcpStream> {
    pub client: DeviceClient<S>,
    pub live_tx: broadcast::Sender<LiveUpdate>,
    /// Always holds the most recent update (served by GET /api/current and sent on WS connect).
    pub latest_tx: watch::Sender<LiveUpdate>,
    /// `None` when export is disabled.
    pub export_tx: Option<mpsc::Sender<AggregationWindow>>,
    pub ws_clients: Arc<AtomicUsize>,
    pub export_counters: Arc<ExportCounters>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing and pipeline config.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interfaces to poll; empty polls all.
    pub interfaces: Vec<String>,
    pub uplink_interfaces: Vec<String>,
    pub sample_interval_ms: u64,
    pub stats_window_size: usize,
    pub stale_after: Option<Duration>,
    /// Aggregation granularities; empty disables aggregation.
    pub intervals: Vec<Duration>,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let m = &config.monitoring;
        Self {
            interfaces: m.interfaces.clone(),
            uplink_interfaces: m.uplink_interfaces.clone(),
            sample_interval_ms: m.sample_interval_ms,
            stats_window_size: m.stats_window_size,
            stale_after: m.stale_after_secs.map(Duration::from_secs),
            intervals: if config.metrics_store.enabled {
                config.metrics_store.intervals()
            } else {
                Vec::new()
            },
            stats_log_interval_secs: m.stats_log_interval_secs,
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Spawns the poll loop. The task ends with `Ok` on shutdown and with `Err` when the
/// device connection is lost; any other poll error is logged and retried on the next tick.
pub fn spawn<S>(
    deps: WorkerDeps<S>,
    config: WorkerConfig,
) -> tokio::task::JoinHandle<anyhow::Result<()>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let WorkerDeps {
        mut client,
        live_tx,
        latest_tx,
        export_tx,
        ws_clients,
        export_counters,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interfaces,
        uplink_interfaces,
        sample_interval_ms,
        stats_window_size,
        stale_after,
        intervals,
        stats_log_interval_secs,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_ms);
    let task = async move {
        let mut pipeline = Pipeline::new(
            stats_window_size,
            stale_after,
            &intervals,
            &uplink_interfaces,
        );

        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut polls_total: u64 = 0;
        let mut poll_errors_total: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let snapshots = match client.interface_stats(&interfaces).await {
                        Ok(s) => s,
                        Err(e) if e.is_connection_lost() => {
                            tracing::error!(
                                error = %e,
                                operation = "interface_stats",
                                "device connection lost, stopping worker"
                            );
                            if let Err(close_err) = client.close().await {
                                tracing::debug!(
                                    error = %close_err,
                                    operation = "close",
                                    "device close failed"
                                );
                            }
                            return Err(anyhow::Error::new(e));
                        }
                        Err(e) => {
                            poll_errors_total += 1;
                            tracing::warn!(
                                error = %e,
                                operation = "interface_stats",
                                "poll failed, retrying next tick"
                            );
                            continue;
                        }
                    };
                    polls_total += 1;

                    let output = pipeline.process(&snapshots, now_millis());

                    if let Some(live) = output.live {
                        latest_tx.send_replace(live.clone());
                        if live_tx.send(live).is_err() {
                            let should_warn = last_no_receivers_warn
                                .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                            if should_warn {
                                tracing::debug!(
                                    operation = "broadcast_live",
                                    "No active realtime clients; broadcast channel has no receivers"
                                );
                                last_no_receivers_warn = Some(Instant::now());
                            }
                        }
                    }

                    if let Some(tx) = export_tx.as_ref() {
                        for window in output.completed {
                            exporter::enqueue(tx, window, &export_counters);
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_clients = ws_clients.load(Ordering::Relaxed),
                        interfaces_tracked = pipeline.rates().tracked(),
                        polls_total,
                        poll_errors_total,
                        windows_exported = export_counters.windows_exported.load(Ordering::Relaxed),
                        windows_failed = export_counters.windows_failed.load(Ordering::Relaxed),
                        windows_dropped = export_counters.windows_dropped.load(Ordering::Relaxed),
                        "app stats"
                    );
                }
            }
        }

        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, operation = "close", "device close failed");
        }
        Ok(())
    };
    tokio::spawn(task.instrument(worker_span))
}
