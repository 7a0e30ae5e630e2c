// Domain models

mod counters;
mod history;
mod live;
mod window;

pub use counters::{CounterSnapshot, RateSample};
pub use history::{HistoryPoint, HistoryQuery, HistoryResult, IntervalSpec, OverallStats};
pub use live::{LiveRates, LiveUpdate, upload_download};
pub use window::{AggregationWindow, WindowStats};
