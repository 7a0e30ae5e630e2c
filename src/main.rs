use anyhow::Result;
use mikrotik_traffic::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    // Connection or login failure is fatal at startup; no internal retry.
    let client = protocol::DeviceClient::connect(&app_config.device).await?;

    let (live_tx, _) =
        broadcast::channel::<models::LiveUpdate>(app_config.server.broadcast_capacity);
    let (latest_tx, latest_rx) = watch::channel(models::LiveUpdate::default());
    let ws_clients = Arc::new(AtomicUsize::new(0));
    let export_counters = Arc::new(exporter::ExportCounters::default());

    let (export_tx, exporter_handle, history) = if app_config.metrics_store.enabled {
        let store = metrics_store::MetricsStoreClient::new(&app_config.metrics_store)?;
        tracing::info!(url = store.base_url(), "metrics store export enabled");
        let (tx, rx) = mpsc::channel(app_config.metrics_store.queue_capacity);
        let handle = exporter::spawn_exporter(rx, store.clone(), export_counters.clone());
        let history =
            metrics_store::HistoryQuerier::new(store, app_config.metrics_store.intervals());
        (Some(tx), Some(handle), Some(history))
    } else {
        tracing::info!("metrics store disabled; history queries unavailable");
        (None, None, None)
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut worker_handle = worker::spawn(
        worker::WorkerDeps {
            client,
            live_tx: live_tx.clone(),
            latest_tx,
            export_tx,
            ws_clients: ws_clients.clone(),
            export_counters,
            shutdown_rx,
        },
        worker::WorkerConfig::from_app_config(&app_config),
    );

    let server = async {
        if !app_config.server.enabled {
            std::future::pending::<()>().await;
            return Ok(());
        }
        let app = routes::app(live_tx, latest_rx, ws_clients, history, &app_config);
        let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", addr);
        axum::serve(listener, app).await?;
        anyhow::Ok(())
    };

    let outcome = tokio::select! {
        result = server => result,
        result = &mut worker_handle => {
            // Worker only stops on its own when the device connection is lost.
            result.map_err(anyhow::Error::from).and_then(|r| r)
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            match worker_handle.await {
                Ok(r) => r,
                Err(e) => Err(e.into()),
            }
        }
    };

    // Worker is gone, so its export sender is dropped: let the exporter drain and exit.
    if let Some(handle) = exporter_handle
        && let Err(e) = handle.await
    {
        tracing::warn!(error = %e, "exporter task failed");
    }

    outcome
}
