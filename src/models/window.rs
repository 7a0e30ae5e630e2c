// Aggregation window: one fixed, interval-aligned bucket for one granularity.

use std::collections::BTreeMap;
use std::time::Duration;

/// Per-interface accumulator inside a window. Min and max are seeded from the first sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub rx_sum: f64,
    pub tx_sum: f64,
    pub rx_max: f64,
    pub tx_max: f64,
    pub rx_min: f64,
    pub tx_min: f64,
    pub count: u64,
}

impl WindowStats {
    pub fn seeded(rx_rate: f64, tx_rate: f64) -> Self {
        Self {
            rx_sum: 0.0,
            tx_sum: 0.0,
            rx_max: rx_rate,
            tx_max: tx_rate,
            rx_min: rx_rate,
            tx_min: tx_rate,
            count: 0,
        }
    }

    pub fn add(&mut self, rx_rate: f64, tx_rate: f64) {
        self.rx_sum += rx_rate;
        self.tx_sum += tx_rate;
        self.count += 1;
        if rx_rate > self.rx_max {
            self.rx_max = rx_rate;
        }
        if tx_rate > self.tx_max {
            self.tx_max = tx_rate;
        }
        if rx_rate < self.rx_min {
            self.rx_min = rx_rate;
        }
        if tx_rate < self.tx_min {
            self.tx_min = tx_rate;
        }
    }

    /// Mean receive rate; `None` when no samples were folded in.
    pub fn rx_avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.rx_sum / self.count as f64)
    }

    pub fn tx_avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.tx_sum / self.count as f64)
    }
}

/// `[start_ms, end_ms)` with `start_ms` a multiple of `interval` since the epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow {
    pub start_ms: u64,
    pub end_ms: u64,
    pub interval: Duration,
    pub interfaces: BTreeMap<String, WindowStats>,
}

impl AggregationWindow {
    /// The window of `interval` containing `timestamp_ms` (truncation, not rounding).
    pub fn containing(timestamp_ms: u64, interval: Duration) -> Self {
        let interval_ms = (interval.as_millis() as u64).max(1);
        let start_ms = timestamp_ms - timestamp_ms % interval_ms;
        Self {
            start_ms,
            end_ms: start_ms + interval_ms,
            interval,
            interfaces: BTreeMap::new(),
        }
    }

    /// Interval label used on exported series, e.g. `"10s"`.
    pub fn interval_label(&self) -> String {
        format!("{}s", self.interval.as_secs())
    }
}
