// Typed errors for the device protocol and the metrics store.
// Application seams (config, main, worker join) use anyhow.

use thiserror::Error;

/// Errors raised while talking to the device.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {addr}")]
    ConnectTimeout { addr: String },

    #[error("connection i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for a word from the device")]
    ReadTimeout,

    #[error("invalid word length prefix 0x{0:02x}")]
    InvalidLengthPrefix(u8),

    #[error("device returned {word}: {}", message.as_deref().unwrap_or("no message"))]
    Trap {
        word: String,
        message: Option<String>,
    },

    #[error("device returned {0}")]
    Fatal(String),

    #[error("login failed: {reason}")]
    Auth { reason: String },

    #[error("field {field} missing for interface {interface}")]
    MissingField {
        field: &'static str,
        interface: String,
    },

    #[error("failed to parse {field} for interface {interface}: {source}")]
    InvalidField {
        field: &'static str,
        interface: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

impl ProtocolError {
    /// True when the connection can no longer be used: the stream is closed,
    /// desynchronised mid-sentence, or the device declared a fatal error.
    /// Traps and bad field values only fail the current exchange.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            ProtocolError::Connect { .. }
            | ProtocolError::ConnectTimeout { .. }
            | ProtocolError::Io(_)
            | ProtocolError::ReadTimeout
            | ProtocolError::InvalidLengthPrefix(_)
            | ProtocolError::Fatal(_) => true,
            ProtocolError::Trap { .. }
            | ProtocolError::Auth { .. }
            | ProtocolError::MissingField { .. }
            | ProtocolError::InvalidField { .. } => false,
        }
    }
}

/// Errors pushing a completed window to the metrics store.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ExportError>,
    },
}

/// Errors running a query against the metrics store.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("query failed: {0}")]
    Failed(String),

    #[error("invalid interval {0:?}")]
    InvalidInterval(String),

    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
}
