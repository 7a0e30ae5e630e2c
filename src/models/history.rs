// Historical query request/response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::QueryError;

/// Requested granularity: `auto` or a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSpec {
    Auto,
    Fixed(Duration),
}

impl IntervalSpec {
    /// Accepts `""`, `auto`, `<n>`, `<n>s`, `<n>m` and `<n>h`.
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            return Ok(IntervalSpec::Auto);
        }
        let invalid = || QueryError::InvalidInterval(s.to_string());
        let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((i, _)) => s.split_at(i),
            None => (s, "s"),
        };
        let n: u64 = digits.parse().map_err(|_| invalid())?;
        let secs = match unit {
            "s" => Some(n),
            "m" => n.checked_mul(60),
            "h" => n.checked_mul(3600),
            _ => None,
        }
        .ok_or_else(invalid)?;
        if secs == 0 {
            return Err(invalid());
        }
        Ok(IntervalSpec::Fixed(Duration::from_secs(secs)))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub interface: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: IntervalSpec,
}

/// One merged point. Upload is the tx series, download the rx series, as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub upload_avg: f64,
    pub download_avg: f64,
    pub upload_peak: f64,
    pub download_peak: f64,
}

/// Whole-range summary: average of averages and max of peaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub upload_avg: f64,
    pub download_avg: f64,
    pub upload_peak: f64,
    pub download_peak: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResult {
    pub interface: String,
    pub interval: String,
    pub start: String,
    pub end: String,
    #[serde(rename = "datapoints")]
    pub data_points: Vec<HistoryPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<OverallStats>,
}

impl HistoryResult {
    /// Re-labels directions for presentation. Stored series use the uplink view
    /// (upload = tx); on any other port the two directions trade places.
    pub fn for_display(mut self, is_uplink: bool) -> Self {
        if is_uplink {
            return self;
        }
        for p in &mut self.data_points {
            std::mem::swap(&mut p.upload_avg, &mut p.download_avg);
            std::mem::swap(&mut p.upload_peak, &mut p.download_peak);
        }
        if let Some(s) = self.stats.as_mut() {
            std::mem::swap(&mut s.upload_avg, &mut s.download_avg);
            std::mem::swap(&mut s.upload_peak, &mut s.download_peak);
        }
        self
    }
}
