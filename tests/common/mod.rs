// Shared test helpers: an in-memory device on the far end of a duplex pipe.

#![allow(dead_code)]

use std::time::Duration;

use mikrotik_traffic::models::CounterSnapshot;
use mikrotik_traffic::protocol::DeviceClient;
use mikrotik_traffic::protocol::codec;
use tokio::io::{AsyncWriteExt, DuplexStream};

pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Client wired to a fake device. Drive the device side with [`read_command`] and [`reply`].
pub fn mock_device() -> (DeviceClient<DuplexStream>, DuplexStream) {
    mock_device_with_timeout(READ_TIMEOUT)
}

pub fn mock_device_with_timeout(read_timeout: Duration) -> (DeviceClient<DuplexStream>, DuplexStream) {
    let (client_end, device_end) = tokio::io::duplex(64 * 1024);
    (DeviceClient::from_stream(client_end, read_timeout), device_end)
}

/// Reads one command sentence sent by the client.
pub async fn read_command(device: &mut DuplexStream) -> Vec<String> {
    codec::read_sentence(device, READ_TIMEOUT)
        .await
        .expect("device: read command")
}

/// Writes one reply sentence (terminator appended).
pub async fn reply(device: &mut DuplexStream, words: &[&str]) {
    device
        .write_all(&codec::encode_sentence(words))
        .await
        .expect("device: write reply");
}

/// `!re` sentence for one interface's counters.
pub async fn reply_counters(device: &mut DuplexStream, name: &str, rx: u64, tx: u64) {
    let name = format!("=name={name}");
    let rx = format!("=rx-byte={rx}");
    let tx = format!("=tx-byte={tx}");
    reply(device, &["!re", &name, &rx, &tx]).await;
}

pub fn counters(name: &str, rx_bytes: u64, tx_bytes: u64) -> CounterSnapshot {
    CounterSnapshot {
        name: name.into(),
        rx_bytes,
        tx_bytes,
    }
}

pub fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
