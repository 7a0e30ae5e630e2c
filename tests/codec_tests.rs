// Word framing: length prefix classes and sentence round trips through a duplex pipe.

use mikrotik_traffic::error::ProtocolError;
use mikrotik_traffic::protocol::codec;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const DEADLINE: Duration = Duration::from_secs(2);

fn prefix_len(len: usize) -> usize {
    let mut out = Vec::new();
    codec::encode_length(len, &mut out);
    out.len()
}

#[test]
fn test_prefix_width_at_class_boundaries() {
    assert_eq!(prefix_len(0x7F), 1);
    assert_eq!(prefix_len(0x80), 2);
    assert_eq!(prefix_len(0x3FFF), 2);
    assert_eq!(prefix_len(0x4000), 3);
    assert_eq!(prefix_len(0x1F_FFFF), 3);
    assert_eq!(prefix_len(0x20_0000), 4);
    assert_eq!(prefix_len(0x0FFF_FFFF), 4);
    assert_eq!(prefix_len(0x1000_0000), 5);
}

async fn read_one(bytes: Vec<u8>) -> Result<String, ProtocolError> {
    let (mut writer, mut reader) = tokio::io::duplex(1 << 16);
    tokio::spawn(async move {
        let _ = writer.write_all(&bytes).await;
    });
    codec::read_word(&mut reader, DEADLINE).await
}

#[tokio::test]
async fn test_hand_built_wide_prefixes_decode() {
    // Non-minimal 4- and 5-byte prefixes for a short word.
    let mut four = vec![0xE0, 0, 0, 5];
    four.extend_from_slice(b"hello");
    assert_eq!(read_one(four).await.unwrap(), "hello");

    let mut five = vec![0xF0, 0, 0, 0, 5];
    five.extend_from_slice(b"hello");
    assert_eq!(read_one(five).await.unwrap(), "hello");
}

#[tokio::test]
async fn test_reserved_prefix_bytes_rejected() {
    for first in [0xF8u8, 0xFC, 0xFF] {
        let err = read_one(vec![first, 0, 0, 0, 0]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidLengthPrefix(b) if b == first));
    }
}

#[tokio::test]
async fn test_words_across_prefix_classes_round_trip() {
    // 0x20_0000 is the first length that needs a 4-byte prefix.
    let words: Vec<String> = [0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000]
        .iter()
        .map(|&n| "x".repeat(n))
        .collect();
    let (mut writer, mut reader) = tokio::io::duplex(1 << 20);
    let bytes = codec::encode_sentence(&words);
    tokio::spawn(async move {
        writer.write_all(&bytes).await.unwrap();
    });
    let got = codec::read_sentence(&mut reader, DEADLINE).await.unwrap();
    assert_eq!(got.len(), words.len());
    for (got, want) in got.iter().zip(&words) {
        assert_eq!(got.len(), want.len());
        assert_eq!(got, want);
    }
}

#[tokio::test]
async fn test_huge_claimed_length_with_short_payload_is_io_error() {
    let err = read_one(vec![0xF0, 0xFF, 0xFF, 0xFF, 0xFF, b'a', b'b'])
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn test_short_read_is_io_error() {
    let (mut writer, mut reader) = tokio::io::duplex(64);
    // Prefix promises 5 bytes, only 2 arrive before EOF.
    writer.write_all(&[5, b'a', b'b']).await.unwrap();
    drop(writer);
    let err = codec::read_word(&mut reader, DEADLINE).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn test_read_word_times_out() {
    let (_writer, mut reader) = tokio::io::duplex(64);
    let err = codec::read_word(&mut reader, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::ReadTimeout));
}
