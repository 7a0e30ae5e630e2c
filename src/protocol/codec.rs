// Word framing: every word carries a variable-length size prefix, a sentence
// is a run of words closed by a zero-length word.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProtocolError;

const READ_CHUNK: usize = 64 * 1024;

/// Appends the size prefix for a word of `len` bytes.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    let len = len as u64;
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&[((len >> 8) as u8) | 0x80, len as u8]);
    } else if len < 0x20_0000 {
        out.extend_from_slice(&[((len >> 16) as u8) | 0xC0, (len >> 8) as u8, len as u8]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&[
            ((len >> 24) as u8) | 0xE0,
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
        ]);
    } else {
        out.extend_from_slice(&[
            0xF0,
            (len >> 24) as u8,
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
        ]);
    }
}

/// Number of prefix bytes that follow `first`, and the length bits `first` carries.
pub fn decode_length_header(first: u8) -> Result<(usize, usize), ProtocolError> {
    if first & 0x80 == 0 {
        Ok((0, first as usize))
    } else if first & 0xC0 == 0x80 {
        Ok((1, (first & 0x3F) as usize))
    } else if first & 0xE0 == 0xC0 {
        Ok((2, (first & 0x1F) as usize))
    } else if first & 0xF0 == 0xE0 {
        Ok((3, (first & 0x0F) as usize))
    } else if first & 0xF8 == 0xF0 {
        Ok((4, 0))
    } else {
        Err(ProtocolError::InvalidLengthPrefix(first))
    }
}

pub fn encode_word(word: &[u8], out: &mut Vec<u8>) {
    encode_length(word.len(), out);
    out.extend_from_slice(word);
}

/// Encodes a full sentence: each word followed by the empty terminator word.
pub fn encode_sentence<S: AsRef<str>>(words: &[S]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.iter().map(|w| w.as_ref().len() + 2).sum::<usize>() + 1);
    for w in words {
        encode_word(w.as_ref().as_bytes(), &mut out);
    }
    encode_word(&[], &mut out);
    out
}

/// Reads one word. Each word must arrive within `deadline`; a timeout or short read is an error.
pub async fn read_word<R>(reader: &mut R, deadline: Duration) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    tokio::time::timeout(deadline, read_word_inner(reader))
        .await
        .map_err(|_| ProtocolError::ReadTimeout)?
}

async fn read_word_inner<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 5];
    prefix[0] = reader.read_u8().await?;
    let (extra, bits) = decode_length_header(prefix[0])?;
    reader.read_exact(&mut prefix[1..=extra]).await?;
    let len = prefix[1..=extra]
        .iter()
        .fold(bits, |len, &b| (len << 8) | b as usize);
    if len == 0 {
        return Ok(String::new());
    }
    // Capacity follows received bytes, not the claimed length.
    let mut data = Vec::with_capacity(len.min(READ_CHUNK));
    (&mut *reader).take(len as u64).read_to_end(&mut data).await?;
    if data.len() < len {
        return Err(ProtocolError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    // Interface names are not guaranteed to be UTF-8.
    Ok(match String::from_utf8(data) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Reads words up to and excluding the terminating empty word.
pub async fn read_sentence<R>(reader: &mut R, deadline: Duration) -> Result<Vec<String>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let word = read_word(reader, deadline).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}
