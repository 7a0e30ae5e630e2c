// One poll cycle: counter snapshots -> rates -> {live update, aggregation windows}.
// Kept free of I/O so the whole path can be driven from tests.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::aggregator::TimeWindowAggregator;
use crate::models::{AggregationWindow, CounterSnapshot, LiveRates, LiveUpdate, RateSample};
use crate::rates::RateEngine;

/// Output of one cycle.
#[derive(Debug, Default)]
pub struct CycleOutput {
    pub samples: Vec<RateSample>,
    /// `None` when no interface produced a rate this cycle.
    pub live: Option<LiveUpdate>,
    pub completed: Vec<AggregationWindow>,
}

pub struct Pipeline {
    rates: RateEngine,
    aggregator: Option<TimeWindowAggregator>,
    uplinks: HashSet<String>,
}

impl Pipeline {
    /// `intervals` empty disables aggregation.
    pub fn new(
        stats_window_size: usize,
        stale_after: Option<Duration>,
        intervals: &[Duration],
        uplink_interfaces: &[String],
    ) -> Self {
        Self {
            rates: RateEngine::new(stats_window_size, stale_after),
            aggregator: (!intervals.is_empty()).then(|| TimeWindowAggregator::new(intervals)),
            uplinks: uplink_interfaces.iter().cloned().collect(),
        }
    }

    pub fn process(&mut self, snapshots: &[CounterSnapshot], now_ms: u64) -> CycleOutput {
        let samples = self.rates.observe(snapshots, now_ms);
        if samples.is_empty() {
            return CycleOutput::default();
        }

        let interfaces: BTreeMap<String, LiveRates> = samples
            .iter()
            .map(|s| {
                let rates = LiveRates::from_sample(s, self.uplinks.contains(&s.name));
                (s.name.clone(), rates)
            })
            .collect();
        let live = LiveUpdate {
            timestamp: rfc3339_from_millis(now_ms),
            interfaces,
        };

        let completed = match self.aggregator.as_mut() {
            Some(agg) => {
                for s in &samples {
                    agg.add_sample(now_ms, &s.name, s.rx_rate, s.tx_rate);
                }
                agg.take_completed()
            }
            None => Vec::new(),
        };

        CycleOutput {
            samples,
            live: Some(live),
            completed,
        }
    }

    pub fn rates(&self) -> &RateEngine {
        &self.rates
    }

    pub fn aggregator(&self) -> Option<&TimeWindowAggregator> {
        self.aggregator.as_ref()
    }
}

pub fn rfc3339_from_millis(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
