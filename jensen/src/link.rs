//! One claimed bus: framing on the way out, reassembly on the way in
//!
//! Everything here runs under the device's bus lock, so at most one request
//! is outstanding at a time.

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use jensen_core::{Command, Expectation, Packet, ReceiveBuffer, Session};
use jensen_transport::{OpenedDevice, Transport};
use jensen_types::{AudioProfile, DeviceModel, FileList, FileListParser};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};

/// State that exists only while the interface is claimed
#[derive(Debug)]
pub(crate) struct ConnectionSession {
    pub opened: OpenedDevice,
    pub model: DeviceModel,
    pub rx: ReceiveBuffer,

    /// A streaming request was dropped before its frames were drained
    pub abandoned: bool,
}

impl ConnectionSession {
    pub fn new(opened: OpenedDevice) -> Self {
        Self {
            model: DeviceModel::from_product_id(opened.product_id),
            opened,
            rx: ReceiveBuffer::new(),
            abandoned: false,
        }
    }
}

pub(crate) struct Link<T> {
    pub transport: T,
    pub conn: Option<ConnectionSession>,
    config: DeviceConfig,
    session: Session,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T, config: DeviceConfig, session: Session) -> Self {
        Self {
            transport,
            conn: None,
            config,
            session,
        }
    }

    fn rx(&mut self) -> Result<&mut ReceiveBuffer> {
        self.conn
            .as_mut()
            .map(|conn| &mut conn.rx)
            .ok_or(Error::NotConnected)
    }

    /// Drop buffered bytes left over from earlier traffic
    pub fn clear_rx(&mut self) {
        if let Some(conn) = self.conn.as_mut() {
            if !conn.rx.is_empty() {
                debug!("Dropping {} stale buffered bytes", conn.rx.len());
            }
            conn.rx.clear();
        }
    }

    /// Drain frames left behind by a transfer that was dropped mid-stream
    pub async fn recover(&mut self) {
        let abandoned = self.conn.as_ref().is_some_and(|conn| conn.abandoned);
        if abandoned {
            debug!("Draining frames of an abandoned transfer");
            self.flush().await;
            self.set_abandoned(false);
        }
    }

    pub fn set_abandoned(&mut self, abandoned: bool) {
        if let Some(conn) = self.conn.as_mut() {
            conn.abandoned = abandoned;
        }
    }

    /// Frame and write one request, returning its sequence id
    pub async fn send(&mut self, command: Command, body: Bytes) -> Result<u32> {
        if self.conn.is_none() {
            return Err(Error::NotConnected);
        }

        let sequence_id = self.session.next_sequence_id();
        let packet = Packet::with_body(command, sequence_id, body);
        trace!("Sending: {:?}", packet);

        let frame = packet.encode()?.freeze();
        let len = frame.len();
        let written = self.transport.write(frame, self.config.write_timeout).await?;

        if written != len {
            warn!("Short write for {}: {} of {} bytes", command, written, len);
            return Err(Error::Timeout(command));
        }

        Ok(sequence_id)
    }

    /// Wait for the next frame matching `expect`
    ///
    /// Reads are short so the overall `timeout` is honoured closely. Stalls
    /// are cleared in place; any other transport failure is returned as is
    /// and leaves teardown to the caller.
    pub async fn receive(
        &mut self,
        command: Command,
        expect: Expectation,
        timeout: std::time::Duration,
    ) -> Result<Packet> {
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(packet) = self.rx()?.next_packet() {
                if expect.matches(&packet) {
                    trace!("Received: {:?}", packet);
                    return Ok(packet);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout(command));
            }

            let read_timeout = self.config.read_timeout.min(deadline - now);
            match self.transport.read(self.config.read_chunk_size, read_timeout).await {
                Ok(chunk) => self.rx()?.extend(&chunk),
                Err(e) if e.is_timeout() => {}
                Err(e) if e.is_stall() => {
                    warn!("IN endpoint stalled while waiting for {}, clearing", command);
                    self.transport.clear_halt_in().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send a request and wait for the frame with its sequence id
    pub async fn transact(&mut self, command: Command, body: Bytes) -> Result<Packet> {
        self.recover().await;
        self.clear_rx();

        let sequence_id = self.send(command, body).await?;
        self.receive(command, Expectation::reply(sequence_id), self.config.command_timeout)
            .await
    }

    /// Collect GET_FILE_LIST frames until `expected` entries have arrived
    ///
    /// The device may split the list over several frames. An empty frame or
    /// a timeout after data has arrived also ends the list.
    pub async fn collect_file_list(&mut self, expected: u32, audio: AudioProfile) -> Result<FileList> {
        self.recover().await;
        self.clear_rx();

        let command = Command::GetFileList;
        let sequence_id = self.send(command, Bytes::new()).await?;
        let expect = Expectation::stream(sequence_id, command);
        let mut body = BytesMut::new();

        loop {
            match self.receive(command, expect, self.config.command_timeout).await {
                Ok(packet) if packet.body.is_empty() => break,
                Ok(packet) => {
                    body.extend_from_slice(&packet.body);

                    let parser = FileListParser::new(&body, Some(expected), audio);
                    let announced = parser.header_hint().unwrap_or(expected);
                    if parser.count() as u32 >= announced {
                        break;
                    }
                }
                Err(Error::Timeout(_)) if !body.is_empty() => {
                    debug!("File list ended by timeout after {} bytes", body.len());
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(FileList::parse(&body, Some(expected), audio))
    }

    /// Drain whatever the device is still sending
    ///
    /// Best effort: a handful of short reads, stopping at the first quiet one.
    pub async fn flush(&mut self) {
        let mut drained = 0usize;

        for _ in 0..self.config.flush_attempts {
            match self
                .transport
                .read(self.config.read_chunk_size, self.config.flush_read_timeout)
                .await
            {
                Ok(chunk) if !chunk.is_empty() => drained += chunk.len(),
                Ok(_) => break,
                Err(e) if e.is_stall() => {
                    if let Err(e) = self.transport.clear_halt_in().await {
                        warn!("Failed to clear stall during flush: {}", e);
                    }
                    break;
                }
                Err(_) => break,
            }
        }

        self.clear_rx();

        if drained > 0 {
            debug!("Flushed {} bytes from IN endpoint", drained);
        }
    }
}
