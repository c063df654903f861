//! Receive buffer for fragmented bulk reads
//!
//! USB reads do not respect frame boundaries: one read may carry half a
//! header, several frames, or stale bytes from an abandoned transfer.
//! [`ReceiveBuffer`] accumulates raw chunks and hands out complete frames,
//! resynchronising on the sync marker when the stream is misaligned.

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::packet::{Decode, Packet};

/// Byte accumulator that yields complete frames
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    buf: BytesMut,
    discarded: u64,
}

impl ReceiveBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk read from the IN endpoint
    pub fn extend(&mut self, chunk: &[u8]) {
        trace!(
            "Buffered {} bytes ({} pending): {:02X?}",
            chunk.len(),
            self.buf.len() + chunk.len(),
            &chunk[..chunk.len().min(16)]
        );
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete frame, if one is buffered
    ///
    /// Garbage in front of the sync marker is dropped and logged.
    pub fn next_packet(&mut self) -> Option<Packet> {
        match Packet::try_decode(&self.buf) {
            Decode::Frame { packet, skipped, consumed } => {
                self.discard(skipped);
                self.buf.advance(consumed - skipped);
                Some(packet)
            }
            Decode::NeedMoreData { skipped } => {
                self.discard(skipped);
                None
            }
        }
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        if !self.buf.is_empty() {
            trace!("Clearing {} buffered bytes", self.buf.len());
        }
        self.buf.clear();
    }

    /// Number of bytes waiting for a complete frame
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Total bytes dropped while resynchronising
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn discard(&mut self, count: usize) {
        if count == 0 {
            return;
        }

        warn!(
            "Out of sync, discarding {} bytes: {:02X?}",
            count,
            &self.buf[..count.min(32)]
        );
        self.buf.advance(count);
        self.discarded += count as u64;
    }
}
