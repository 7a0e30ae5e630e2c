// Rate & statistics engine: successive counter snapshots -> instantaneous rates,
// plus a bounded rolling window of average/peak per interface.

use std::collections::HashMap;
use std::time::Duration;

use crate::models::{CounterSnapshot, RateSample};

/// Per-interface tracking state. The history buffers never grow: writes wrap at `capacity`.
#[derive(Debug, Clone)]
pub struct RateState {
    last_rx_bytes: u64,
    last_tx_bytes: u64,
    last_sample_ms: u64,
    rx_history: Box<[f64]>,
    tx_history: Box<[f64]>,
    cursor: usize,
    valid: usize,
}

impl RateState {
    fn new(snapshot: &CounterSnapshot, now_ms: u64, capacity: usize) -> Self {
        Self {
            last_rx_bytes: snapshot.rx_bytes,
            last_tx_bytes: snapshot.tx_bytes,
            last_sample_ms: now_ms,
            rx_history: vec![0.0; capacity].into_boxed_slice(),
            tx_history: vec![0.0; capacity].into_boxed_slice(),
            cursor: 0,
            valid: 0,
        }
    }

    fn push(&mut self, rx_rate: f64, tx_rate: f64) {
        let capacity = self.rx_history.len();
        self.rx_history[self.cursor] = rx_rate;
        self.tx_history[self.cursor] = tx_rate;
        self.cursor = (self.cursor + 1) % capacity;
        if self.valid < capacity {
            self.valid += 1;
        }
    }

    /// Number of rates currently held (capped at the window size).
    pub fn valid_samples(&self) -> usize {
        self.valid
    }
}

/// Average and peak over the first `valid` slots only, so zero-filled slots
/// are not counted during warm-up.
fn avg_peak(history: &[f64], valid: usize) -> (f64, f64) {
    let slots = &history[..valid.min(history.len())];
    let Some(&first) = slots.first() else {
        return (0.0, 0.0);
    };
    let (sum, peak) = slots
        .iter()
        .fold((0.0, first), |(sum, peak), &v| (sum + v, if v > peak { v } else { peak }));
    (sum / slots.len() as f64, peak)
}

pub struct RateEngine {
    window_size: usize,
    stale_after: Option<Duration>,
    states: HashMap<String, RateState>,
}

impl RateEngine {
    /// `window_size` is clamped to at least 1.
    pub fn new(window_size: usize, stale_after: Option<Duration>) -> Self {
        Self {
            window_size: window_size.max(1),
            stale_after,
            states: HashMap::new(),
        }
    }

    /// Folds one poll's snapshots (all taken at `now_ms`) into the per-interface state.
    /// Interfaces seen for the first time, or whose clock did not advance, produce no sample.
    pub fn observe(&mut self, snapshots: &[CounterSnapshot], now_ms: u64) -> Vec<RateSample> {
        let mut samples = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let Some(state) = self.states.get_mut(&snapshot.name) else {
                self.states.insert(
                    snapshot.name.clone(),
                    RateState::new(snapshot, now_ms, self.window_size),
                );
                continue;
            };

            if now_ms <= state.last_sample_ms {
                continue;
            }
            let elapsed = (now_ms - state.last_sample_ms) as f64 / 1000.0;

            // A counter reset or rollover shows up as a huge rate; no correction is attempted.
            let rx_rate = snapshot.rx_bytes.wrapping_sub(state.last_rx_bytes) as f64 / elapsed;
            let tx_rate = snapshot.tx_bytes.wrapping_sub(state.last_tx_bytes) as f64 / elapsed;

            state.push(rx_rate, tx_rate);
            let (rx_avg, rx_peak) = avg_peak(&state.rx_history, state.valid);
            let (tx_avg, tx_peak) = avg_peak(&state.tx_history, state.valid);

            state.last_rx_bytes = snapshot.rx_bytes;
            state.last_tx_bytes = snapshot.tx_bytes;
            state.last_sample_ms = now_ms;

            samples.push(RateSample {
                name: snapshot.name.clone(),
                rx_rate,
                tx_rate,
                rx_avg,
                tx_avg,
                rx_peak,
                tx_peak,
            });
        }

        if let Some(ttl) = self.stale_after {
            let ttl_ms = ttl.as_millis() as u64;
            let before = self.states.len();
            self.states
                .retain(|_, s| now_ms.saturating_sub(s.last_sample_ms) <= ttl_ms);
            let evicted = before - self.states.len();
            if evicted > 0 {
                tracing::debug!(evicted, "dropped stale interface rate state");
            }
        }

        samples
    }

    pub fn state(&self, name: &str) -> Option<&RateState> {
        self.states.get(name)
    }

    pub fn tracked(&self) -> usize {
        self.states.len()
    }
}
