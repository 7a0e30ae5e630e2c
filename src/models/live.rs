// Live push payload: one object per poll cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RateSample;

/// Maps rx/tx onto upload/download. On an uplink (WAN) port tx is upload;
/// on any other port the directions are swapped.
pub fn upload_download(is_uplink: bool, rx: f64, tx: f64) -> (f64, f64) {
    if is_uplink { (tx, rx) } else { (rx, tx) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveRates {
    pub upload_rate: f64,
    pub download_rate: f64,
    pub upload_avg: f64,
    pub download_avg: f64,
    pub upload_peak: f64,
    pub download_peak: f64,
}

impl LiveRates {
    pub fn from_sample(sample: &RateSample, is_uplink: bool) -> Self {
        let (upload_rate, download_rate) = upload_download(is_uplink, sample.rx_rate, sample.tx_rate);
        let (upload_avg, download_avg) = upload_download(is_uplink, sample.rx_avg, sample.tx_avg);
        let (upload_peak, download_peak) =
            upload_download(is_uplink, sample.rx_peak, sample.tx_peak);
        Self {
            upload_rate,
            download_rate,
            upload_avg,
            download_avg,
            upload_peak,
            download_peak,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
    /// RFC 3339.
    pub timestamp: String,
    pub interfaces: BTreeMap<String, LiveRates>,
}
