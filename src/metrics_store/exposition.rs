// Text exposition of completed windows: `name{labels} value timestamp_ms`.

use crate::models::AggregationWindow;

pub const METRIC_PREFIX: &str = "mikrotik_interface";

/// Escapes a label value (`\`, `"`, newline).
pub fn escape_label_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Renders every interface with at least one sample: avg/peak/min for each direction plus
/// the sample count, all stamped with the window's end time.
pub fn render_window(window: &AggregationWindow) -> String {
    let mut buf = String::new();
    let ts = window.end_ms;
    let interval = window.interval_label();

    for (name, stats) in &window.interfaces {
        let (Some(rx_avg), Some(tx_avg)) = (stats.rx_avg(), stats.tx_avg()) else {
            continue;
        };
        let labels = format!(
            "interface=\"{}\",interval=\"{}\"",
            escape_label_value(name),
            interval
        );
        let gauges = [
            ("rx_rate_avg", rx_avg),
            ("rx_rate_peak", stats.rx_max),
            ("rx_rate_min", stats.rx_min),
            ("tx_rate_avg", tx_avg),
            ("tx_rate_peak", stats.tx_max),
            ("tx_rate_min", stats.tx_min),
        ];
        for (metric, value) in gauges {
            buf.push_str(&format!(
                "{METRIC_PREFIX}_{metric}{{{labels}}} {value:.2} {ts}\n"
            ));
        }
        buf.push_str(&format!(
            "{METRIC_PREFIX}_sample_count{{{labels}}} {} {ts}\n",
            stats.count
        ));
    }
    buf
}
