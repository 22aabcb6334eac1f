//! Length-prefixed frame layer.
//!
//! Each frame on the wire is `u32_le length || length bytes of payload`.
//! Reads and writes are exact: the reader always pulls precisely the
//! advertised number of bytes, never less, never more.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::ProtoError;

/// Default ceiling on a single frame's payload size (16 MiB), defending
/// against a hostile or corrupted length prefix driving an unbounded
/// allocation.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Reads discrete length-prefixed frames off a TCP half.
pub struct FrameReader {
    reader: OwnedReadHalf,
    closed: AtomicBool,
}

impl FrameReader {
    /// Wrap the read half of a TCP stream.
    pub fn new(reader: OwnedReadHalf) -> Self {
        Self { reader, closed: AtomicBool::new(false) }
    }

    /// Read exactly one frame's payload.
    ///
    /// EOF while reading the length prefix or the payload is reported as
    /// [`ProtoError::StreamClosed`].
    pub async fn read(&mut self) -> Result<Vec<u8>, ProtoError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtoError::StreamClosed);
        }

        let mut len_buf = [0u8; 4];
        if let Err(e) = self.reader.read_exact(&mut len_buf).await {
            self.closed.store(true, Ordering::Release);
            return Err(map_read_error(e));
        }
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_FRAME_LEN {
            self.closed.store(true, Ordering::Release);
            return Err(ProtoError::Protocol(format!(
                "frame length {len} exceeds max {MAX_FRAME_LEN}"
            )));
        }

        let mut payload = vec![0u8; len as usize];
        if let Err(e) = self.reader.read_exact(&mut payload).await {
            self.closed.store(true, Ordering::Release);
            return Err(map_read_error(e));
        }
        Ok(payload)
    }

    /// True once this side has observed EOF or a protocol violation.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn map_read_error(e: std::io::Error) -> ProtoError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtoError::StreamClosed
    } else {
        e.into()
    }
}

/// Writes discrete length-prefixed frames to a TCP half.
///
/// Callers (the encrypted transport) are responsible for serializing
/// concurrent writers — this type has no internal lock.
pub struct FrameWriter {
    writer: OwnedWriteHalf,
    closed: bool,
}

impl FrameWriter {
    /// Wrap the write half of a TCP stream.
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer, closed: false }
    }

    /// Write one frame: 4-byte little-endian length, then the payload,
    /// then flush.
    pub async fn write(&mut self, frame: &[u8]) -> Result<(), ProtoError> {
        if self.closed {
            return Err(ProtoError::StreamClosed);
        }
        let len = u32::try_from(frame.len())
            .map_err(|_| ProtoError::Protocol("frame too large to prefix".into()))?;

        if let Err(e) = self.writer.write_all(&len.to_le_bytes()).await {
            self.closed = true;
            return Err(e.into());
        }
        if let Err(e) = self.writer.write_all(frame).await {
            self.closed = true;
            return Err(e.into());
        }
        if let Err(e) = self.writer.flush().await {
            self.closed = true;
            return Err(e.into());
        }
        Ok(())
    }

    /// Shut down the write half. Idempotent with respect to external
    /// callers raising [`ProtoError::StreamClosed`] on re-entry.
    pub async fn close(&mut self) -> Result<(), ProtoError> {
        if self.closed {
            return Err(ProtoError::StreamClosed);
        }
        self.closed = true;
        let _ = self.writer.shutdown().await;
        Ok(())
    }

    /// True if this side has been closed (locally, or after a failed write).
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
