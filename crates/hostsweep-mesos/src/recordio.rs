//! RecordIO framing used by the Mesos event stream.
//!
//! Each record is its length in bytes as ASCII decimal, a newline, then
//! the record itself: `<len>\n<bytes>`. Records may be split across, or
//! packed into, arbitrary HTTP chunks.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Longest length prefix accepted (digits of `u64::MAX`).
const MAX_HEADER_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordIoError {
    #[error("invalid record length header: {0:?}")]
    InvalidHeader(String),

    #[error("record of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// Incremental RecordIO decoder.
#[derive(Debug)]
pub struct RecordIoDecoder {
    buf: BytesMut,
    max_record_len: usize,
}

impl RecordIoDecoder {
    /// Default per-record limit (64 MiB).
    pub const DEFAULT_MAX_RECORD_LEN: usize = 64 * 1024 * 1024;

    pub fn new() -> Self {
        Self::with_max_record_len(Self::DEFAULT_MAX_RECORD_LEN)
    }

    pub fn with_max_record_len(max_record_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_record_len,
        }
    }

    /// Append a chunk read from the wire.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete record, or `None` if more bytes are needed.
    pub fn next_record(&mut self) -> Result<Option<Bytes>, RecordIoError> {
        let Some(newline) = self.buf.iter().position(|b| *b == b'\n') else {
            if self.buf.len() > MAX_HEADER_LEN {
                return Err(RecordIoError::InvalidHeader(
                    String::from_utf8_lossy(&self.buf[..MAX_HEADER_LEN]).into_owned(),
                ));
            }
            return Ok(None);
        };

        let header = &self.buf[..newline];
        let len = std::str::from_utf8(header)
            .ok()
            .map(str::trim)
            .and_then(|h| h.parse::<usize>().ok())
            .ok_or_else(|| {
                RecordIoError::InvalidHeader(String::from_utf8_lossy(header).into_owned())
            })?;

        if len > self.max_record_len {
            return Err(RecordIoError::TooLarge {
                len,
                max: self.max_record_len,
            });
        }

        if self.buf.len() < newline + 1 + len {
            return Ok(None);
        }

        self.buf.advance(newline + 1);
        Ok(Some(self.buf.split_to(len).freeze()))
    }

    /// Bytes buffered but not yet returned as a record.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for RecordIoDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame one record.
pub fn encode(record: &[u8]) -> Bytes {
    let header = format!("{}\n", record.len());
    let mut out = BytesMut::with_capacity(header.len() + record.len());
    out.put_slice(header.as_bytes());
    out.put_slice(record);
    out.freeze()
}
