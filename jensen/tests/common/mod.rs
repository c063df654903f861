//! Scripted in-memory transport for driving `Device` without hardware

// Shared across test files; not every helper is used by each one
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;

use jensen::{Device, DeviceConfig};
use jensen_core::{Command, Decode, Packet};
use jensen_transport::{Error as TransportError, OpenedDevice, Transport, UsbTarget};

/// One item handed out by `read`
#[derive(Debug)]
pub enum Step {
    Data(Bytes),
    Fail(TransportError),
}

/// Reply to `request` with the same command and sequence id
pub fn reply(request: &Packet, body: impl Into<Bytes>) -> Step {
    frame(request.command_id, request.sequence_id, body)
}

/// A raw frame with arbitrary ids
pub fn frame(command_id: u16, sequence_id: u32, body: impl Into<Bytes>) -> Step {
    Step::Data(encode(command_id, sequence_id, body))
}

pub fn encode(command_id: u16, sequence_id: u32, body: impl Into<Bytes>) -> Bytes {
    let packet = Packet {
        command_id,
        sequence_id,
        body: body.into(),
        checksum: Bytes::new(),
    };
    packet.encode().unwrap().freeze()
}

/// Split a frame into header and body reads
pub fn split(step: Step) -> Vec<Step> {
    match step {
        Step::Data(bytes) if bytes.len() > Packet::HEADER_SIZE => vec![
            Step::Data(bytes.slice(..Packet::HEADER_SIZE)),
            Step::Data(bytes.slice(Packet::HEADER_SIZE..)),
        ],
        other => vec![other],
    }
}

pub type Responder = Box<dyn FnMut(&Packet) -> Vec<Step> + Send>;

pub struct Script {
    pub inbound: VecDeque<Step>,
    pub requests: Vec<Packet>,
    pub responder: Responder,
    pub chunk_delay: Duration,
    pub opens: usize,
    pub closes: usize,
    pub halts_cleared: usize,
}

/// Test-side view of the fake device
#[derive(Clone)]
pub struct FakeHandle(pub Arc<Mutex<Script>>);

impl FakeHandle {
    pub fn requests(&self) -> Vec<Packet> {
        self.0.lock().requests.clone()
    }

    pub fn last_request(&self) -> Packet {
        self.0.lock().requests.last().cloned().expect("no request sent")
    }

    pub fn pending(&self) -> usize {
        self.0.lock().inbound.len()
    }

    pub fn closes(&self) -> usize {
        self.0.lock().closes
    }

    pub fn halts_cleared(&self) -> usize {
        self.0.lock().halts_cleared
    }

    pub fn set_chunk_delay(&self, delay: Duration) {
        self.0.lock().chunk_delay = delay;
    }
}

pub struct FakeTransport {
    script: Arc<Mutex<Script>>,
    product_id: u16,
    open: bool,
}

pub fn fake<F>(product_id: u16, responder: F) -> (FakeTransport, FakeHandle)
where
    F: FnMut(&Packet) -> Vec<Step> + Send + 'static,
{
    let script = Arc::new(Mutex::new(Script {
        inbound: VecDeque::new(),
        requests: Vec::new(),
        responder: Box::new(responder),
        chunk_delay: Duration::ZERO,
        opens: 0,
        closes: 0,
        halts_cleared: 0,
    }));

    let transport = FakeTransport {
        script: script.clone(),
        product_id,
        open: false,
    };
    (transport, FakeHandle(script))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&mut self, target: UsbTarget) -> jensen_transport::Result<OpenedDevice> {
        self.script.lock().opens += 1;
        self.open = true;

        Ok(OpenedDevice {
            vendor_id: target.vendor_id,
            product_id: self.product_id,
            endpoint_out: target.endpoint_out,
            endpoint_in: target.endpoint_in,
        })
    }

    async fn close(&mut self) -> jensen_transport::Result<()> {
        self.script.lock().closes += 1;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write(&mut self, data: Bytes, _timeout: Duration) -> jensen_transport::Result<usize> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }

        let packet = match Packet::try_decode(&data) {
            Decode::Frame { packet, .. } => packet,
            Decode::NeedMoreData { .. } => panic!("client wrote a partial frame"),
        };

        let mut script = self.script.lock();
        let steps = (script.responder)(&packet);
        script.requests.push(packet);
        script.inbound.extend(steps);

        Ok(data.len())
    }

    async fn read(&mut self, _max_len: usize, timeout: Duration) -> jensen_transport::Result<Bytes> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }

        let (step, delay) = {
            let mut script = self.script.lock();
            (script.inbound.pop_front(), script.chunk_delay)
        };

        match step {
            Some(Step::Data(bytes)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(bytes)
            }
            Some(Step::Fail(e)) => Err(e),
            None => {
                tokio::time::sleep(timeout.min(Duration::from_millis(2))).await;
                Err(TransportError::Timeout)
            }
        }
    }

    async fn clear_halt_in(&mut self) -> jensen_transport::Result<()> {
        self.script.lock().halts_cleared += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("fake:{:04x}", self.product_id)
    }
}

/// Short timeouts so failure paths finish quickly
pub fn test_config() -> DeviceConfig {
    let mut config = DeviceConfig::default()
        .with_read_timeout(Duration::from_millis(5))
        .with_command_timeout(Duration::from_millis(300))
        .with_transfer_timeout(Duration::from_millis(300));
    config.flush_read_timeout = Duration::from_millis(2);
    config
}

/// A connected H1E backed by `responder`
pub async fn connected<F>(responder: F) -> (Device<FakeTransport>, FakeHandle)
where
    F: FnMut(&Packet) -> Vec<Step> + Send + 'static,
{
    connected_with(test_config(), responder).await
}

pub async fn connected_with<F>(config: DeviceConfig, responder: F) -> (Device<FakeTransport>, FakeHandle)
where
    F: FnMut(&Packet) -> Vec<Step> + Send + 'static,
{
    let (transport, handle) = fake(0xB00D, responder);
    let device = Device::with_transport(transport, config);
    device.connect().await.unwrap();
    (device, handle)
}

/// Check the typed command of a request
pub fn is(request: &Packet, command: Command) -> bool {
    request.command_id == u16::from(command)
}

/// One GET_FILE_LIST entry
pub fn list_entry(version: u8, name: &str, length: u32) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(version);
    buf.put_uint(name.len() as u64, 3);
    buf.put_slice(name.as_bytes());
    buf.put_u32(length);
    buf.put_bytes(0, 6);
    buf.put_slice(&[0xAB; 16]);
    buf.to_vec()
}

pub fn card_info_body(used_mb: u32, capacity_mb: u32) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32(used_mb);
    buf.put_u32(capacity_mb);
    buf.put_u32(0);
    buf.to_vec()
}
