//! Streaming file transfers
//!
//! TRANSFER_FILE and GET_FILE_BLOCK answer one request with a run of
//! frames. The first carries the request's sequence id; the rest are
//! matched on command id alone.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use jensen_core::{Command, Expectation};
use jensen_transport::Transport;

use crate::error::{Error, Result};
use crate::link::Link;

/// How a transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// All expected bytes were delivered
    Ok,

    /// The cancel token was set
    Cancelled,

    /// Timed out, unexpected frame, or the sink refused a chunk
    Fail,

    /// The device went away; the handle has been torn down
    Disconnected,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Cancelled => "cancelled",
            Self::Fail => "fail",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Result of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub status: TransferStatus,

    /// Body bytes handed to the sink
    pub received: u64,

    /// Length the caller asked for
    pub expected: u64,
}

impl TransferReport {
    pub fn is_complete(&self) -> bool {
        self.status == TransferStatus::Ok
    }

    /// Byte count on success, otherwise the matching error
    pub fn into_result(self) -> Result<u64> {
        match self.status {
            TransferStatus::Ok => Ok(self.received),
            TransferStatus::Cancelled => Err(Error::Cancelled),
            TransferStatus::Disconnected => Err(Error::Disconnected),
            TransferStatus::Fail => Err(Error::Incomplete {
                received: self.received,
                expected: self.expected,
            }),
        }
    }
}

/// Shared cancellation flag
///
/// Clones observe the same flag, so one can be handed to another task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receiver of transfer data
pub trait TransferSink: Send {
    /// Consume one chunk; an error aborts the transfer with `Fail`
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Called after each chunk with the running total
    fn on_progress(&mut self, _received: u64, _expected: u64) {}
}

impl TransferSink for Vec<u8> {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Sink writing into any [`Write`]r, e.g. a file
#[derive(Debug)]
pub struct WriteSink<W>(pub W);

impl<W: Write + Send> TransferSink for WriteSink<W> {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.0.write_all(chunk)
    }
}

/// Sink built from a pair of closures
pub struct Callbacks<C, P> {
    on_chunk: C,
    on_progress: P,
}

/// Build a sink from `on_chunk` and `on_progress` closures
pub fn callbacks<C, P>(on_chunk: C, on_progress: P) -> Callbacks<C, P>
where
    C: FnMut(&[u8]) -> io::Result<()> + Send,
    P: FnMut(u64, u64) + Send,
{
    Callbacks { on_chunk, on_progress }
}

impl<C, P> TransferSink for Callbacks<C, P>
where
    C: FnMut(&[u8]) -> io::Result<()> + Send,
    P: FnMut(u64, u64) + Send,
{
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (self.on_chunk)(chunk)
    }

    fn on_progress(&mut self, received: u64, expected: u64) {
        (self.on_progress)(received, expected)
    }
}

/// One streaming request
pub(crate) struct TransferRequest {
    pub command: Command,
    pub body: Bytes,
    pub expected: u64,
    pub timeout: Duration,
}

impl<T: Transport> Link<T> {
    /// Run a streaming request to completion, cancellation or failure
    ///
    /// Whatever the outcome, buffered bytes are dropped afterwards, and the
    /// endpoint is flushed unless the transfer completed. If the future is
    /// dropped first, the link stays marked and the next request drains it.
    pub async fn stream<S: TransferSink>(
        &mut self,
        request: TransferRequest,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> TransferReport {
        self.recover().await;
        self.clear_rx();
        self.set_abandoned(true);

        let mut received = 0u64;
        let status = self.pump(&request, sink, cancel, &mut received).await;

        self.clear_rx();
        let drained = status == TransferStatus::Ok && request.expected > 0;
        if !drained && status != TransferStatus::Disconnected {
            self.flush().await;
        }
        self.set_abandoned(false);

        TransferReport {
            status,
            received,
            expected: request.expected,
        }
    }

    async fn pump<S: TransferSink>(
        &mut self,
        request: &TransferRequest,
        sink: &mut S,
        cancel: &CancelToken,
        received: &mut u64,
    ) -> TransferStatus {
        let command = request.command;

        let sequence_id = match self.send(command, request.body.clone()).await {
            Ok(sequence_id) => sequence_id,
            Err(e) => return status_for(command, &e),
        };

        let mut expect = Expectation::reply(sequence_id);

        loop {
            if *received >= request.expected {
                debug!("{} complete: {} bytes", command, received);
                return TransferStatus::Ok;
            }

            if cancel.is_cancelled() {
                info!("{} cancelled after {} bytes", command, received);
                return TransferStatus::Cancelled;
            }

            let packet = match self.receive(command, expect, request.timeout).await {
                Ok(packet) => packet,
                Err(e) => return status_for(command, &e),
            };
            expect = Expectation::stream(sequence_id, command);

            if packet.command_id != u16::from(command) {
                if *received == 0 {
                    warn!("Unexpected {} in reply to {}", packet, command);
                    return TransferStatus::Fail;
                }
                debug!("Skipping {} during {}", packet, command);
                continue;
            }

            if packet.body.is_empty() {
                continue;
            }

            if let Err(e) = sink.on_chunk(&packet.body) {
                warn!("Sink rejected chunk of {}: {}", command, e);
                return TransferStatus::Fail;
            }

            *received += packet.body.len() as u64;
            sink.on_progress(*received, request.expected);
        }
    }
}

fn status_for(command: Command, error: &Error) -> TransferStatus {
    if error.requires_reconnect() {
        warn!("{} aborted: {}", command, error);
        TransferStatus::Disconnected
    } else {
        warn!("{} failed: {}", command, error);
        TransferStatus::Fail
    }
}
