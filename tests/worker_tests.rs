// Worker integration tests: poll a fake device, publish live updates, hand windows to the
// exporter, stop on shutdown or connection loss.

mod common;

use common::*;
use mikrotik_traffic::config::MetricsStoreConfig;
use mikrotik_traffic::exporter::{ExportCounters, enqueue, spawn_exporter};
use mikrotik_traffic::metrics_store::MetricsStoreClient;
use mikrotik_traffic::models::{AggregationWindow, LiveUpdate, WindowStats};
use mikrotik_traffic::protocol::codec;
use mikrotik_traffic::worker::{WorkerConfig, WorkerDeps, spawn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn worker_config(intervals: Vec<Duration>) -> WorkerConfig {
    WorkerConfig {
        interfaces: vec!["ether1".into()],
        uplink_interfaces: vec!["ether1".into()],
        sample_interval_ms: 50,
        stats_window_size: 5,
        stale_after: None,
        intervals,
        stats_log_interval_secs: 60,
    }
}

/// Answers every poll with counters that grow by 1000 bytes per poll.
/// Stops after `max_polls` (dropping the connection) or when the client hangs up.
async fn serve_counters(mut device: DuplexStream, max_polls: usize) {
    let mut rx = 0;
    for _ in 0..max_polls {
        if codec::read_sentence(&mut device, WAIT).await.is_err() {
            return;
        }
        rx += 1000;
        reply_counters(&mut device, "ether1", rx, rx / 2).await;
        reply(&mut device, &["!done"]).await;
    }
}

#[tokio::test]
async fn worker_publishes_live_updates_and_queues_windows() {
    let (client, device) = mock_device();
    let device_task = tokio::spawn(serve_counters(device, usize::MAX));

    let (live_tx, mut live_rx) = broadcast::channel(16);
    let (latest_tx, latest_rx) = watch::channel(LiveUpdate::default());
    let (export_tx, mut export_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = spawn(
        WorkerDeps {
            client,
            live_tx,
            latest_tx,
            export_tx: Some(export_tx),
            ws_clients: Arc::new(AtomicUsize::new(0)),
            export_counters: Arc::new(ExportCounters::default()),
            shutdown_rx,
        },
        worker_config(vec![Duration::from_secs(1)]),
    );

    let update = tokio::time::timeout(WAIT, live_rx.recv())
        .await
        .expect("live update in time")
        .expect("broadcast open");
    let rates = &update.interfaces["ether1"];
    assert!(rates.upload_rate > 0.0);
    assert!(rates.download_rate > rates.upload_rate);
    assert!(!latest_rx.borrow().interfaces.is_empty());

    let window = tokio::time::timeout(WAIT, export_rx.recv())
        .await
        .expect("completed window in time")
        .expect("export channel open");
    assert_eq!(window.interval, Duration::from_secs(1));
    assert_eq!(window.start_ms % 1000, 0);
    assert!(window.interfaces["ether1"].count > 0);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    device_task.await.unwrap();
}

#[tokio::test]
async fn worker_stops_with_error_on_connection_loss() {
    let (client, device) = mock_device();
    let device_task = tokio::spawn(serve_counters(device, 2));

    let (live_tx, _live_rx) = broadcast::channel(16);
    let (latest_tx, _latest_rx) = watch::channel(LiveUpdate::default());
    let (_shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = spawn(
        WorkerDeps {
            client,
            live_tx,
            latest_tx,
            export_tx: None,
            ws_clients: Arc::new(AtomicUsize::new(0)),
            export_counters: Arc::new(ExportCounters::default()),
            shutdown_rx,
        },
        worker_config(Vec::new()),
    );

    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_err());
    device_task.await.unwrap();
}

#[tokio::test]
async fn worker_hangs_up_on_device_after_read_timeout() {
    let (client, mut device) = mock_device_with_timeout(Duration::from_millis(100));
    let device_task = tokio::spawn(async move {
        // Take the poll but never answer it.
        read_command(&mut device).await;
        let mut buf = [0u8; 16];
        tokio::time::timeout(WAIT, device.read(&mut buf))
            .await
            .expect("client hangs up in time")
            .expect("read after hang-up")
    });

    let (live_tx, _live_rx) = broadcast::channel(16);
    let (latest_tx, _latest_rx) = watch::channel(LiveUpdate::default());
    let (_shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = spawn(
        WorkerDeps {
            client,
            live_tx,
            latest_tx,
            export_tx: None,
            ws_clients: Arc::new(AtomicUsize::new(0)),
            export_counters: Arc::new(ExportCounters::default()),
            shutdown_rx,
        },
        worker_config(Vec::new()),
    );

    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_err());
    assert_eq!(device_task.await.unwrap(), 0, "device sees end of stream");
}

#[tokio::test]
async fn worker_keeps_polling_after_device_trap() {
    let (client, mut device) = mock_device();
    let device_task = tokio::spawn(async move {
        read_command(&mut device).await;
        reply(&mut device, &["!trap", "=message=no such item"]).await;
        reply(&mut device, &["!done"]).await;
        serve_counters(device, usize::MAX).await;
    });

    let (live_tx, mut live_rx) = broadcast::channel(16);
    let (latest_tx, _latest_rx) = watch::channel(LiveUpdate::default());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = spawn(
        WorkerDeps {
            client,
            live_tx,
            latest_tx,
            export_tx: None,
            ws_clients: Arc::new(AtomicUsize::new(0)),
            export_counters: Arc::new(ExportCounters::default()),
            shutdown_rx,
        },
        worker_config(Vec::new()),
    );

    tokio::time::timeout(WAIT, live_rx.recv())
        .await
        .expect("worker recovered after trap")
        .expect("broadcast open");

    shutdown_tx.send(()).unwrap();
    assert!(tokio::time::timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
    device_task.await.unwrap();
}

fn window_with_samples() -> AggregationWindow {
    let mut window = AggregationWindow::containing(10_000, Duration::from_secs(10));
    let mut stats = WindowStats::seeded(1.0, 1.0);
    stats.add(1.0, 1.0);
    window.interfaces.insert("ether1".into(), stats);
    window
}

#[tokio::test]
async fn enqueue_drops_when_queue_full() {
    let counters = ExportCounters::default();
    let (tx, _rx) = mpsc::channel(1);
    enqueue(&tx, window_with_samples(), &counters);
    enqueue(&tx, window_with_samples(), &counters);
    assert_eq!(counters.windows_dropped.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn exporter_drains_queue_and_counts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import/prometheus"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;
    let store = MetricsStoreClient::new(&MetricsStoreConfig {
        enabled: true,
        url: server.uri(),
        retry_count: 0,
        ..Default::default()
    })
    .unwrap();

    let counters = Arc::new(ExportCounters::default());
    let (tx, rx) = mpsc::channel(4);
    let handle = spawn_exporter(rx, store, counters.clone());
    enqueue(&tx, window_with_samples(), &counters);
    enqueue(&tx, window_with_samples(), &counters);
    drop(tx);

    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert_eq!(counters.windows_exported.load(Ordering::Relaxed), 2);
    assert_eq!(counters.windows_failed.load(Ordering::Relaxed), 0);
}
