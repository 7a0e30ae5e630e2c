// Model conversions and JSON shapes

use chrono::DateTime;
use mikrotik_traffic::error::ProtocolError;
use mikrotik_traffic::models::*;
use mikrotik_traffic::protocol::Record;

#[test]
fn test_counter_snapshot_from_record() {
    let record: Record = [("name", "ether1"), ("rx-byte", "123"), ("tx-byte", "456")]
        .into_iter()
        .collect();
    let snap = CounterSnapshot::from_record(&record).unwrap().unwrap();
    assert_eq!(snap.name, "ether1");
    assert_eq!(snap.rx_bytes, 123);
    assert_eq!(snap.tx_bytes, 456);
}

#[test]
fn test_record_without_name_is_skipped() {
    let record: Record = [("rx-byte", "1"), ("tx-byte", "2")].into_iter().collect();
    assert_eq!(CounterSnapshot::from_record(&record).unwrap(), None);
    let record: Record = [("name", ""), ("rx-byte", "1")].into_iter().collect();
    assert_eq!(CounterSnapshot::from_record(&record).unwrap(), None);
}

#[test]
fn test_negative_counter_rejected() {
    let record: Record = [("name", "ether1"), ("rx-byte", "-5"), ("tx-byte", "0")]
        .into_iter()
        .collect();
    let err = CounterSnapshot::from_record(&record).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidField { field: "rx-byte", .. }));
}

#[test]
fn test_live_update_json_shape() {
    let sample = RateSample {
        name: "ether1".into(),
        rx_rate: 1.0,
        tx_rate: 2.0,
        rx_avg: 3.0,
        tx_avg: 4.0,
        rx_peak: 5.0,
        tx_peak: 6.0,
    };
    let mut update = LiveUpdate {
        timestamp: "2024-01-01T00:00:00Z".into(),
        ..Default::default()
    };
    update
        .interfaces
        .insert("ether1".into(), LiveRates::from_sample(&sample, true));
    let json = serde_json::to_value(&update).unwrap();
    let rates = &json["interfaces"]["ether1"];
    assert_eq!(rates["upload_rate"], 2.0);
    assert_eq!(rates["download_rate"], 1.0);
    assert_eq!(rates["upload_avg"], 4.0);
    assert_eq!(rates["download_peak"], 5.0);
    assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
}

fn history() -> HistoryResult {
    HistoryResult {
        interface: "ether2".into(),
        interval: "10s".into(),
        start: "2023-11-14T22:13:20+00:00".into(),
        end: "2023-11-14T23:13:20+00:00".into(),
        data_points: vec![HistoryPoint {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            upload_avg: 1.0,
            download_avg: 2.0,
            upload_peak: 3.0,
            download_peak: 4.0,
        }],
        stats: Some(OverallStats {
            upload_avg: 10.0,
            download_avg: 20.0,
            upload_peak: 30.0,
            download_peak: 40.0,
        }),
    }
}

#[test]
fn test_history_for_display_swaps_lan_directions() {
    let lan = history().for_display(false);
    let p = &lan.data_points[0];
    assert_eq!((p.upload_avg, p.download_avg), (2.0, 1.0));
    assert_eq!((p.upload_peak, p.download_peak), (4.0, 3.0));
    let s = lan.stats.unwrap();
    assert_eq!((s.upload_avg, s.download_avg), (20.0, 10.0));
    assert_eq!((s.upload_peak, s.download_peak), (40.0, 30.0));

    assert_eq!(history().for_display(true), history());
}

#[test]
fn test_history_json_uses_datapoints_key() {
    let json = serde_json::to_value(history()).unwrap();
    assert!(json.get("datapoints").is_some());
    assert!(json.get("data_points").is_none());

    let mut without_stats = history();
    without_stats.stats = None;
    let json = serde_json::to_value(without_stats).unwrap();
    assert!(json.get("stats").is_none());
}

#[test]
fn test_window_containing_truncates() {
    let w = AggregationWindow::containing(29_999, std::time::Duration::from_secs(10));
    assert_eq!((w.start_ms, w.end_ms), (20_000, 30_000));
    assert_eq!(w.interval_label(), "10s");
}

#[test]
fn test_window_stats_empty_has_no_average() {
    let stats = WindowStats::seeded(5.0, 5.0);
    assert_eq!(stats.rx_avg(), None);
    assert_eq!(stats.tx_avg(), None);
}
