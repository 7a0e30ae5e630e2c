// Prometheus-compatible query API response bodies.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::QueryError;

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData {
    #[serde(default)]
    pub result: Vec<Series>,
}

/// A range query fills `values`, an instant query fills `value`.
/// Each point is `[unix_seconds, "value"]`.
#[derive(Debug, Deserialize)]
pub(crate) struct Series {
    #[serde(default)]
    pub values: Vec<(f64, String)>,
    #[serde(default)]
    pub value: Option<(f64, String)>,
}

impl QueryResponse {
    /// First series of a successful response; `None` if the result is empty.
    pub fn into_first_series(self) -> Result<Option<Series>, QueryError> {
        if self.status != "success" {
            return Err(QueryError::Failed(
                self.error.unwrap_or_else(|| format!("status {}", self.status)),
            ));
        }
        Ok(self.data.and_then(|d| d.result.into_iter().next()))
    }
}

pub(crate) fn parse_point((ts, raw): &(f64, String)) -> Result<(DateTime<Utc>, f64), QueryError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| QueryError::Failed(format!("non-numeric sample value {raw:?}")))?;
    let timestamp = DateTime::from_timestamp_millis((ts * 1000.0).round() as i64)
        .ok_or_else(|| QueryError::Failed(format!("timestamp out of range: {ts}")))?;
    Ok((timestamp, value))
}
