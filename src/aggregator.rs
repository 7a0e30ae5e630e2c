// Time-window aggregator: folds rate samples into fixed, interval-aligned windows,
// one open window per granularity, all granularities fed from the same stream.
//
// Owned by the poll worker (single writer), so no locking here.

use std::time::Duration;

use crate::models::{AggregationWindow, WindowStats};

#[derive(Debug)]
struct Granularity {
    interval: Duration,
    current: Option<AggregationWindow>,
}

#[derive(Debug)]
pub struct TimeWindowAggregator {
    granularities: Vec<Granularity>,
    completed: Vec<AggregationWindow>,
}

impl TimeWindowAggregator {
    pub fn new(intervals: &[Duration]) -> Self {
        for interval in intervals {
            tracing::info!(interval_secs = interval.as_secs(), "aggregation window enabled");
        }
        Self {
            granularities: intervals
                .iter()
                .map(|&interval| Granularity {
                    interval,
                    current: None,
                })
                .collect(),
            completed: Vec::new(),
        }
    }

    /// Adds one sample to every granularity. Timestamps must be non-decreasing.
    /// A sample at or past the open window's end closes it; a late sample for an
    /// already-closed boundary lands in whatever window is open.
    pub fn add_sample(&mut self, timestamp_ms: u64, interface: &str, rx_rate: f64, tx_rate: f64) {
        for g in &mut self.granularities {
            let needs_new = g
                .current
                .as_ref()
                .is_none_or(|w| timestamp_ms >= w.end_ms);
            if needs_new {
                let next = AggregationWindow::containing(timestamp_ms, g.interval);
                if let Some(done) = g.current.replace(next) {
                    self.completed.push(done);
                }
            }
            let Some(window) = g.current.as_mut() else {
                continue;
            };
            window
                .interfaces
                .entry(interface.to_string())
                .or_insert_with(|| WindowStats::seeded(rx_rate, tx_rate))
                .add(rx_rate, tx_rate);
        }
    }

    /// Returns and clears the windows closed so far.
    pub fn take_completed(&mut self) -> Vec<AggregationWindow> {
        std::mem::take(&mut self.completed)
    }

    /// The open window for `interval`, if any sample has arrived.
    pub fn current_window(&self, interval: Duration) -> Option<&AggregationWindow> {
        self.granularities
            .iter()
            .find(|g| g.interval == interval)
            .and_then(|g| g.current.as_ref())
    }
}
