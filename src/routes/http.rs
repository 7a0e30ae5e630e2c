// GET handlers: version, current rates, history

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::AppState;
use crate::models::{HistoryQuery, IntervalSpec};
use crate::version::{NAME, VERSION};

const DEFAULT_HISTORY_HOURS: i64 = 24;

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/current: latest live update (empty before the first poll completes).
pub(super) async fn current_handler(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest_rx.borrow().clone();
    axum::Json(latest)
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryParams {
    interface: Option<String>,
    start: Option<String>,
    end: Option<String>,
    interval: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Unix seconds or RFC 3339.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return DateTime::from_timestamp(raw.parse().ok()?, 0);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// GET /api/history?interface=&start=&end=&interval=
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> axum::response::Response {
    let Some(querier) = state.history.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "metrics store is disabled");
    };
    let interface = match params.interface.as_deref().map(str::trim) {
        Some(i) if !i.is_empty() => i.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "interface is required"),
    };

    let end = match params.end.as_deref() {
        None | Some("") => Utc::now(),
        Some(raw) => match parse_time(raw) {
            Some(t) => t,
            None => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid end time {raw:?}"));
            }
        },
    };
    let start = match params.start.as_deref() {
        None | Some("") => end - Duration::hours(DEFAULT_HISTORY_HOURS),
        Some(raw) => match parse_time(raw) {
            Some(t) => t,
            None => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid start time {raw:?}"));
            }
        },
    };
    if start > end {
        return error_response(StatusCode::BAD_REQUEST, "start must not be after end");
    }
    let interval = match IntervalSpec::parse(params.interval.as_deref().unwrap_or("")) {
        Ok(i) => i,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let query = HistoryQuery {
        interface,
        start,
        end,
        interval,
    };
    match querier.query_history(&query).await {
        Ok(result) => {
            let is_uplink = state.uplinks.contains(&query.interface);
            Json(result.for_display(is_uplink)).into_response()
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "query_history",
                interface = %query.interface,
                "history query failed"
            );
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
