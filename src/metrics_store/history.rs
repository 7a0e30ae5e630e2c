// Historical query engine: picks interval and step, runs the per-metric range queries
// concurrently, merges them by timestamp and adds a whole-range summary.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::warn;

use super::{METRIC_PREFIX, MetricsStoreClient, escape_label_value};
use crate::error::QueryError;
use crate::models::{HistoryPoint, HistoryQuery, HistoryResult, IntervalSpec, OverallStats};

const HOUR: Duration = Duration::from_secs(3600);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// The four series a history record is built from. Stored directions use the uplink
/// view: upload is tx, download is rx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMetric {
    UploadAvg,
    DownloadAvg,
    UploadPeak,
    DownloadPeak,
}

impl HistoryMetric {
    pub const ALL: [HistoryMetric; 4] = [
        HistoryMetric::UploadAvg,
        HistoryMetric::DownloadAvg,
        HistoryMetric::UploadPeak,
        HistoryMetric::DownloadPeak,
    ];

    fn series_suffix(self) -> &'static str {
        match self {
            HistoryMetric::UploadAvg => "tx_rate_avg",
            HistoryMetric::DownloadAvg => "rx_rate_avg",
            HistoryMetric::UploadPeak => "tx_rate_peak",
            HistoryMetric::DownloadPeak => "rx_rate_peak",
        }
    }

    /// Range function used for the overall summary.
    fn over_time(self) -> &'static str {
        match self {
            HistoryMetric::UploadAvg | HistoryMetric::DownloadAvg => "avg_over_time",
            HistoryMetric::UploadPeak | HistoryMetric::DownloadPeak => "max_over_time",
        }
    }

    pub fn selector(self, interface: &str, interval_label: &str) -> String {
        format!(
            "{METRIC_PREFIX}_{}{{interface=\"{}\",interval=\"{}\"}}",
            self.series_suffix(),
            escape_label_value(interface),
            escape_label_value(interval_label)
        )
    }

    fn point_slot(self, p: &mut HistoryPoint) -> &mut f64 {
        match self {
            HistoryMetric::UploadAvg => &mut p.upload_avg,
            HistoryMetric::DownloadAvg => &mut p.download_avg,
            HistoryMetric::UploadPeak => &mut p.upload_peak,
            HistoryMetric::DownloadPeak => &mut p.download_peak,
        }
    }

    fn stats_slot(self, s: &mut OverallStats) -> &mut f64 {
        match self {
            HistoryMetric::UploadAvg => &mut s.upload_avg,
            HistoryMetric::DownloadAvg => &mut s.download_avg,
            HistoryMetric::UploadPeak => &mut s.upload_peak,
            HistoryMetric::DownloadPeak => &mut s.download_peak,
        }
    }
}

/// Short ranges (up to an hour) use the finest aggregated interval, longer ones the coarsest.
/// `intervals` must be ascending.
pub fn auto_interval(range: Duration, intervals: &[Duration]) -> Duration {
    let pick = if range <= HOUR {
        intervals.first()
    } else {
        intervals.last()
    };
    pick.copied().unwrap_or(DEFAULT_INTERVAL)
}

/// Query step for a range, coarser as the range grows to bound the point count.
pub fn step_for(range: Duration) -> Duration {
    let secs = match range {
        r if r <= HOUR => 10,
        r if r <= 6 * HOUR => 30,
        r if r <= 24 * HOUR => 60,
        r if r <= 7 * 24 * HOUR => 300,
        _ => 3600,
    };
    Duration::from_secs(secs)
}

/// Merges per-metric series into one record per distinct timestamp, ascending.
/// Metrics without a point at a timestamp stay zero.
pub fn merge_series(series: &[(HistoryMetric, Vec<(DateTime<Utc>, f64)>)]) -> Vec<HistoryPoint> {
    let mut by_ts: BTreeMap<DateTime<Utc>, HistoryPoint> = BTreeMap::new();
    for (metric, points) in series {
        for &(timestamp, value) in points {
            let point = by_ts.entry(timestamp).or_insert_with(|| HistoryPoint {
                timestamp,
                ..Default::default()
            });
            *metric.point_slot(point) = value;
        }
    }
    by_ts.into_values().collect()
}

#[derive(Debug, Clone)]
pub struct HistoryQuerier {
    store: MetricsStoreClient,
    intervals: Vec<Duration>,
}

impl HistoryQuerier {
    /// `intervals` are the exported granularities, ascending.
    pub fn new(store: MetricsStoreClient, intervals: Vec<Duration>) -> Self {
        Self { store, intervals }
    }

    pub fn resolve_interval(&self, spec: IntervalSpec, range: Duration) -> Duration {
        match spec {
            IntervalSpec::Auto => auto_interval(range, &self.intervals),
            IntervalSpec::Fixed(d) => d,
        }
    }

    /// Runs the history query. Individual metric failures are logged and leave that
    /// metric out; only an inverted range is an error.
    pub async fn query_history(&self, q: &HistoryQuery) -> Result<HistoryResult, QueryError> {
        if q.start > q.end {
            return Err(QueryError::InvalidRange {
                start: q.start.to_rfc3339(),
                end: q.end.to_rfc3339(),
            });
        }
        let range = (q.end - q.start).to_std().unwrap_or_default();
        let interval = self.resolve_interval(q.interval, range);
        let label = format!("{}s", interval.as_secs());
        let step = step_for(range);

        let queries = HistoryMetric::ALL.map(|metric| {
            let selector = metric.selector(&q.interface, &label);
            async move {
                let result = self.store.query_range(&selector, q.start, q.end, step).await;
                (metric, result)
            }
        });
        let mut series = Vec::with_capacity(HistoryMetric::ALL.len());
        for (metric, result) in join_all(queries).await {
            match result {
                Ok(points) => series.push((metric, points)),
                Err(e) => warn!(
                    error = %e,
                    interface = %q.interface,
                    metric = metric.series_suffix(),
                    operation = "query_range",
                    "history metric query failed, omitting"
                ),
            }
        }

        let stats = self.overall_stats(&q.interface, &label, q.end, range).await;

        Ok(HistoryResult {
            interface: q.interface.clone(),
            interval: label,
            start: q.start.to_rfc3339(),
            end: q.end.to_rfc3339(),
            data_points: merge_series(&series),
            stats: Some(stats),
        })
    }

    /// Average-of-averages and max-of-peaks over the whole range, evaluated at `end`.
    async fn overall_stats(
        &self,
        interface: &str,
        label: &str,
        end: DateTime<Utc>,
        range: Duration,
    ) -> OverallStats {
        let window_secs = range.as_secs().max(1);
        let queries = HistoryMetric::ALL.map(|metric| {
            let query = format!(
                "{}({}[{}s])",
                metric.over_time(),
                metric.selector(interface, label),
                window_secs
            );
            async move { (metric, self.store.query_instant(&query, end).await) }
        });

        let mut stats = OverallStats::default();
        for (metric, result) in join_all(queries).await {
            match result {
                Ok(value) => *metric.stats_slot(&mut stats) = value.unwrap_or(0.0),
                Err(e) => warn!(
                    error = %e,
                    interface,
                    metric = metric.series_suffix(),
                    operation = "query_instant",
                    "overall stats query failed, reporting 0"
                ),
            }
        }
        stats
    }
}
