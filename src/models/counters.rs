// Raw counter snapshots and the rate samples derived from them

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::protocol::Record;

/// One poll of one interface's byte counters. Counters are monotonic; wraparound is not handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl CounterSnapshot {
    /// Extracts `name`, `rx-byte` and `tx-byte` from a reply record.
    /// Records without a name are not interfaces and yield `None`.
    pub fn from_record(record: &Record) -> Result<Option<Self>, ProtocolError> {
        let name = match record.get("name") {
            Some(n) if !n.is_empty() => n,
            _ => return Ok(None),
        };
        let counter = |field: &'static str| -> Result<u64, ProtocolError> {
            let raw = record.get(field).ok_or_else(|| ProtocolError::MissingField {
                field,
                interface: name.to_string(),
            })?;
            raw.parse().map_err(|source| ProtocolError::InvalidField {
                field,
                interface: name.to_string(),
                source,
            })
        };
        Ok(Some(Self {
            name: name.to_string(),
            rx_bytes: counter("rx-byte")?,
            tx_bytes: counter("tx-byte")?,
        }))
    }
}

/// Output of one rate computation for one interface (bytes/sec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub name: String,
    pub rx_rate: f64,
    pub tx_rate: f64,
    pub rx_avg: f64,
    pub tx_avg: f64,
    pub rx_peak: f64,
    pub tx_peak: f64,
}
