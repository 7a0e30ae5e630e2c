// HTTP client for a VictoriaMetrics-compatible store: exposition import with bounded
// retry, plus range/instant queries. Cheap to clone (shares the reqwest pool).

mod exposition;
mod history;
mod response;

pub use exposition::{METRIC_PREFIX, escape_label_value, render_window};
pub use history::{HistoryMetric, HistoryQuerier, auto_interval, merge_series, step_for};

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::config::MetricsStoreConfig;
use crate::error::{ExportError, QueryError};
use crate::models::AggregationWindow;
use crate::version;
use response::{QueryResponse, parse_point};

const IMPORT_PATH: &str = "/api/v1/import/prometheus";
const QUERY_RANGE_PATH: &str = "/api/v1/query_range";
const QUERY_PATH: &str = "/api/v1/query";

#[derive(Debug, Clone)]
pub struct MetricsStoreClient {
    http: reqwest::Client,
    base_url: String,
    retry_count: u32,
    retry_backoff: Duration,
}

impl MetricsStoreClient {
    pub fn new(config: &MetricsStoreConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            retry_count: config.retry_count,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Renders and imports one completed window. Windows with no samples send nothing.
    #[instrument(skip_all, fields(interval = %window.interval_label(), end_ms = window.end_ms))]
    pub async fn push_window(&self, window: &AggregationWindow) -> Result<(), ExportError> {
        let body = render_window(window);
        if body.is_empty() {
            debug!("window has no samples, nothing to export");
            return Ok(());
        }
        self.push_text(Bytes::from(body)).await
    }

    /// POSTs exposition text, retrying `retry_count` times. Attempt `n` (1-based retry)
    /// sleeps `n * retry_backoff` first.
    pub async fn push_text(&self, body: Bytes) -> Result<(), ExportError> {
        let mut retry = 0u32;
        loop {
            match self.post_import(body.clone()).await {
                Ok(()) => {
                    if retry > 0 {
                        debug!(retries = retry, "metrics push succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) if retry < self.retry_count => {
                    retry += 1;
                    warn!(
                        error = %e,
                        retry,
                        max_retries = self.retry_count,
                        "metrics push failed, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff * retry).await;
                }
                Err(e) => {
                    return Err(ExportError::RetriesExhausted {
                        attempts: retry + 1,
                        last: Box::new(e),
                    });
                }
            }
        }
    }

    async fn post_import(&self, body: Bytes) -> Result<(), ExportError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, IMPORT_PATH))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if matches!(status.as_u16(), 200 | 204) {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ExportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Points of the first series matching `query`, in the order the store returns them.
    pub async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, QueryError> {
        let params = [
            ("query", query.to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("step", format!("{}s", step.as_secs().max(1))),
        ];
        let resp = self.get_query(QUERY_RANGE_PATH, &params).await?;
        match resp.into_first_series()? {
            Some(series) => series.values.iter().map(parse_point).collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Value of the first series matching `query` at `time`; `None` if nothing matched.
    pub async fn query_instant(
        &self,
        query: &str,
        time: DateTime<Utc>,
    ) -> Result<Option<f64>, QueryError> {
        let params = [
            ("query", query.to_string()),
            ("time", time.timestamp().to_string()),
        ];
        let resp = self.get_query(QUERY_PATH, &params).await?;
        let Some(series) = resp.into_first_series()? else {
            return Ok(None);
        };
        match series.value.as_ref() {
            Some(point) => Ok(Some(parse_point(point)?.1)),
            None => Ok(None),
        }
    }

    async fn get_query(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<QueryResponse, QueryError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}
