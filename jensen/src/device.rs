//! High-level device interface

use std::sync::atomic::{AtomicBool, Ordering};

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Local, NaiveDateTime};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use jensen_core::constants::FORMAT_CONFIRMATION;
use jensen_core::{Command, ConnectionState, Packet, Session};
use jensen_transport::{OpenedDevice, Transport, UsbTransport};
use jensen_types::{
    clock, encode_name, CardInfo, DeleteOutcome, DeviceInfo, DeviceModel, DeviceSettings,
    FileEntry, FileList, RecordingFile, Setting,
};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::link::{ConnectionSession, Link};
use crate::transfer::{CancelToken, TransferReport, TransferRequest, TransferSink, TransferStatus};

/// What is known about the connected recorder
#[derive(Debug, Clone)]
struct Metadata {
    model: DeviceModel,
    opened: OpenedDevice,
    info: Option<DeviceInfo>,
}

/// HiDock recorder
///
/// All methods take `&self`; share the device between tasks with an `Arc`.
/// Commands are serialised on an internal bus lock, so a caller never sees
/// another caller's reply.
///
/// # Examples
///
/// ```no_run
/// use jensen::Device;
///
/// #[tokio::main]
/// async fn main() -> jensen::Result<()> {
///     let device = Device::new();
///
///     let model = device.connect().await?;
///     println!("Connected to {}", model);
///
///     for file in device.list_files().await? {
///         println!("{}", file);
///     }
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device<T: Transport = UsbTransport> {
    config: DeviceConfig,
    session: Session,
    link: Mutex<Link<T>>,
    metadata: RwLock<Option<Metadata>>,
    transferring: AtomicBool,
}

impl Device<UsbTransport> {
    /// Create a device for the first recorder found, with default settings
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default())
    }

    pub fn with_config(config: DeviceConfig) -> Self {
        Self::with_transport(UsbTransport::new(), config)
    }
}

impl Default for Device<UsbTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Device<T> {
    /// Create a device over a custom transport
    pub fn with_transport(transport: T, config: DeviceConfig) -> Self {
        let session = Session::new();

        Self {
            link: Mutex::new(Link::new(transport, config.clone(), session.clone())),
            config,
            session,
            metadata: RwLock::new(None),
            transferring: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.session.is_ready() && self.metadata.read().is_some()
    }

    /// Model of the connected recorder
    pub fn model(&self) -> Option<DeviceModel> {
        self.metadata.read().as_ref().map(|m| m.model)
    }

    /// Identity and endpoints of the connected recorder
    pub fn opened_device(&self) -> Option<OpenedDevice> {
        self.metadata.read().as_ref().map(|m| m.opened)
    }

    /// Device info from the last `get_device_info` on this connection
    pub fn cached_info(&self) -> Option<DeviceInfo> {
        self.metadata.read().as_ref().and_then(|m| m.info.clone())
    }

    /// Check if a file transfer is holding the bus
    pub fn is_transferring(&self) -> bool {
        self.transferring.load(Ordering::Acquire)
    }

    /// Connect to the recorder
    ///
    /// An existing connection is released first. On failure nothing stays
    /// claimed and the state is back to `Disconnected`.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceNotFound`] if no device matches the configured ids
    /// - [`Error::PermissionDenied`] if the device cannot be opened
    /// - [`Error::InterfaceBusy`] if another process holds the interface
    /// - [`Error::EndpointsNotFound`] if the interface has no bulk pair
    pub async fn connect(&self) -> Result<DeviceModel> {
        let mut link = self.link.lock().await;

        if link.conn.is_some() || self.session.state() != ConnectionState::Disconnected {
            debug!("Releasing previous connection");
            self.teardown(&mut link).await;
        }

        let target = self.config.target;
        info!(
            "Connecting to {:04x}:{}...",
            target.vendor_id,
            target
                .product_id
                .map(|pid| format!("{:04x}", pid))
                .unwrap_or_else(|| "*".into())
        );

        self.session.begin_connect()?;

        match self.establish(&mut link).await {
            Ok(model) => Ok(model),
            Err(e) => {
                warn!("Connect failed: {}", e);
                self.teardown(&mut link).await;
                Err(e)
            }
        }
    }

    /// Release the interface and close the device
    ///
    /// Safe to call any number of times.
    pub async fn disconnect(&self) -> Result<()> {
        let mut link = self.link.lock().await;

        if link.conn.is_none() && self.session.state() == ConnectionState::Disconnected {
            return Ok(());
        }

        info!("Disconnecting from {}...", link.transport.describe());
        self.teardown(&mut link).await;
        info!("Disconnected");

        Ok(())
    }

    /// Get firmware version and serial number
    pub async fn get_device_info(&self) -> Result<DeviceInfo> {
        debug!("Getting device info...");

        let response = self.exchange(Command::GetDeviceInfo, Bytes::new()).await?;
        let info = DeviceInfo::from_body(&response.body)?;

        if let Some(metadata) = self.metadata.write().as_mut() {
            metadata.info = Some(info.clone());
        }

        debug!("Device info: {}", info);
        Ok(info)
    }

    /// Read the recorder's clock
    pub async fn get_device_time(&self) -> Result<NaiveDateTime> {
        let response = self.exchange(Command::GetDeviceTime, Bytes::new()).await?;
        Ok(clock::decode(&response.body)?)
    }

    /// Set the recorder's clock
    pub async fn set_device_time(&self, time: NaiveDateTime) -> Result<()> {
        let body = clock::encode(&time)?;

        let response = self
            .exchange(Command::SetDeviceTime, Bytes::copy_from_slice(&body))
            .await?;
        expect_accepted(Command::SetDeviceTime, &response)?;

        debug!("Device time set to {}", time);
        Ok(())
    }

    /// Set the recorder's clock to local time, returning the time sent
    pub async fn sync_time(&self) -> Result<NaiveDateTime> {
        let now = Local::now().naive_local();
        self.set_device_time(now).await?;
        Ok(now)
    }

    /// Number of files on the recorder
    pub async fn get_file_count(&self) -> Result<u32> {
        let response = self.exchange(Command::GetFileCount, Bytes::new()).await?;
        parse_file_count(&response)
    }

    /// List recordings
    ///
    /// Files without a timestamp in their name are left out unless
    /// [`DeviceConfig::include_untimestamped`] is set.
    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let list = self.list_files_raw().await?;

        let entries = if self.config.include_untimestamped {
            list.entries
        } else {
            list.into_timestamped()
        };

        debug!("Listed {} files", entries.len());
        Ok(entries)
    }

    /// List every entry the recorder reports, unfiltered
    pub async fn list_files_raw(&self) -> Result<FileList> {
        let mut link = self.link.lock().await;
        self.ensure_connected(&link)?;

        let result = self.fetch_file_list(&mut link).await;
        self.settle(&mut link, result).await
    }

    /// Delete one file
    pub async fn delete_file(&self, name: &str) -> Result<DeleteOutcome> {
        let body = encode_name(name)?;
        let response = self.exchange(Command::DeleteFile, Bytes::from(body)).await?;

        let code = *response
            .body
            .first()
            .ok_or_else(|| Error::InvalidResponse("empty DELETE_FILE reply".into()))?;
        let outcome = DeleteOutcome::from_code(code);

        if !outcome.is_deleted() {
            warn!("Delete of {} not performed: {:?}", name, outcome);
        }
        Ok(outcome)
    }

    /// Erase all recordings
    pub async fn format_storage(&self) -> Result<()> {
        let response = self
            .exchange(Command::FormatCard, Bytes::from_static(&FORMAT_CONFIRMATION))
            .await?;
        expect_accepted(Command::FormatCard, &response)
    }

    /// Storage usage
    pub async fn get_card_info(&self) -> Result<CardInfo> {
        let response = self.exchange(Command::GetCardInfo, Bytes::new()).await?;
        Ok(CardInfo::from_body(&response.body)?)
    }

    pub async fn get_device_settings(&self) -> Result<DeviceSettings> {
        let response = self.exchange(Command::GetSettings, Bytes::new()).await?;
        Ok(DeviceSettings::from_body(&response.body))
    }

    /// Turn one setting on or off
    pub async fn set_device_setting(&self, setting: Setting, enabled: bool) -> Result<()> {
        debug!("Setting {:?} = {}", setting, enabled);

        let body = setting.request_body(enabled);
        let response = self
            .exchange(Command::SetSettings, Bytes::copy_from_slice(&body))
            .await?;
        expect_accepted(Command::SetSettings, &response)
    }

    /// The file being recorded right now, if any
    ///
    /// Waits for the bus if a transfer is running.
    pub async fn get_recording_file(&self) -> Result<Option<RecordingFile>> {
        let response = self.exchange(Command::GetRecordingFile, Bytes::new()).await?;
        Ok(RecordingFile::from_body(&response.body))
    }

    /// Like [`get_recording_file`](Self::get_recording_file), but returns
    /// [`Error::Busy`] at once instead of waiting for the bus
    ///
    /// Meant for pollers that should never queue behind a download.
    pub async fn try_get_recording_file(&self) -> Result<Option<RecordingFile>> {
        let mut link = self.link.try_lock().map_err(|_| Error::Busy)?;

        let response = self
            .run(&mut link, Command::GetRecordingFile, Bytes::new())
            .await?;
        Ok(RecordingFile::from_body(&response.body))
    }

    /// Download a whole file
    ///
    /// Holds the bus until the transfer ends. `expected_length` is the
    /// `length` from the file listing.
    pub async fn stream_file<S: TransferSink>(
        &self,
        name: &str,
        expected_length: u64,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> TransferReport {
        info!("Downloading {} ({} bytes)", name, expected_length);

        match encode_name(name) {
            Ok(body) => {
                self.transfer(Command::TransferFile, body.into(), expected_length, sink, cancel)
                    .await
            }
            Err(e) => {
                warn!("Cannot request {}: {}", name, e);
                rejected(expected_length)
            }
        }
    }

    /// Read the first `length` bytes of a file
    pub async fn read_file_block<S: TransferSink>(
        &self,
        name: &str,
        length: u32,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> TransferReport {
        let name_bytes = match encode_name(name) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot request {}: {}", name, e);
                return rejected(u64::from(length));
            }
        };

        let mut body = BytesMut::with_capacity(4 + name_bytes.len());
        body.put_u32(length);
        body.put_slice(&name_bytes);

        self.transfer(Command::GetFileBlock, body.freeze(), u64::from(length), sink, cancel)
            .await
    }

    // Helper methods

    async fn establish(&self, link: &mut Link<T>) -> Result<DeviceModel> {
        let opened = link.transport.open(self.config.target).await?;
        self.session.interface_claimed()?;

        let conn = ConnectionSession::new(opened);
        let model = conn.model;
        link.conn = Some(conn);
        self.session.mark_ready()?;

        *self.metadata.write() = Some(Metadata {
            model,
            opened,
            info: None,
        });

        if !model.is_known() {
            warn!("Unrecognised product id 0x{:04x}", opened.product_id);
        }
        info!("Connected to {} at {}", model, link.transport.describe());

        Ok(model)
    }

    /// Drop all per-connection state; never fails
    async fn teardown(&self, link: &mut Link<T>) {
        link.conn = None;

        if let Err(e) = link.transport.close().await {
            warn!("Error while closing device: {}", e);
        }

        self.session.close();
        *self.metadata.write() = None;
    }

    fn ensure_connected(&self, link: &Link<T>) -> Result<()> {
        if !self.session.is_ready() || link.conn.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Tear down after errors that leave the handle unusable
    async fn settle<R>(&self, link: &mut Link<T>, result: Result<R>) -> Result<R> {
        match result {
            Err(Error::NotConnected) => Err(Error::NotConnected),
            Err(e) if e.requires_reconnect() => {
                warn!("Closing connection after fatal error: {}", e);
                self.teardown(link).await;
                Err(Error::Disconnected)
            }
            other => other,
        }
    }

    async fn exchange(&self, command: Command, body: Bytes) -> Result<Packet> {
        let mut link = self.link.lock().await;
        self.run(&mut link, command, body).await
    }

    async fn run(&self, link: &mut Link<T>, command: Command, body: Bytes) -> Result<Packet> {
        self.ensure_connected(link)?;

        if command.is_destructive() {
            warn!("Sending destructive {}", command);
        }

        let result = link.transact(command, body).await;
        self.settle(link, result).await
    }

    async fn fetch_file_list(&self, link: &mut Link<T>) -> Result<FileList> {
        let response = link.transact(Command::GetFileCount, Bytes::new()).await?;
        let count = parse_file_count(&response)?;

        if count == 0 {
            return Ok(FileList::default());
        }

        link.collect_file_list(count, self.config.audio).await
    }

    async fn transfer<S: TransferSink>(
        &self,
        command: Command,
        body: Bytes,
        expected: u64,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> TransferReport {
        let mut link = self.link.lock().await;

        if self.ensure_connected(&link).is_err() {
            return TransferReport {
                status: TransferStatus::Disconnected,
                received: 0,
                expected,
            };
        }

        let _flag = TransferFlag::raise(&self.transferring);

        let request = TransferRequest {
            command,
            body,
            expected,
            timeout: self.config.transfer_timeout,
        };
        let report = link.stream(request, sink, cancel).await;

        if report.status == TransferStatus::Disconnected {
            self.teardown(&mut link).await;
        }

        info!(
            "{} finished: {} ({}/{} bytes)",
            command, report.status, report.received, report.expected
        );
        report
    }
}

/// Holds `is_transferring` up until dropped, including when the transfer
/// future itself is dropped
struct TransferFlag<'a>(&'a AtomicBool);

impl<'a> TransferFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for TransferFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn parse_file_count(response: &Packet) -> Result<u32> {
    match response.body.len() {
        0 => Ok(0),
        n if n >= 4 => Ok(BigEndian::read_u32(&response.body[..4])),
        n => Err(Error::InvalidResponse(format!(
            "GET_FILE_COUNT body too short: {} bytes",
            n
        ))),
    }
}

/// An empty body or a leading zero byte means the request was accepted
fn expect_accepted(command: Command, response: &Packet) -> Result<()> {
    match response.body.first() {
        None | Some(0) => Ok(()),
        Some(code) => Err(Error::InvalidResponse(format!(
            "{} rejected with code {}",
            command, code
        ))),
    }
}

fn rejected(expected: u64) -> TransferReport {
    TransferReport {
        status: TransferStatus::Fail,
        received: 0,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_create() {
        let device = Device::new();
        assert!(!device.is_connected());
        assert_eq!(device.state(), ConnectionState::Disconnected);
        assert_eq!(device.model(), None);
    }

    #[test]
    fn test_transfer_flag_lowered_on_drop() {
        let flag = AtomicBool::new(false);

        let raised = TransferFlag::raise(&flag);
        assert!(flag.load(Ordering::Acquire));

        drop(raised);
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_parse_file_count() {
        let empty = Packet::new(Command::GetFileCount, 1);
        assert_eq!(parse_file_count(&empty).unwrap(), 0);

        let three = Packet::with_body(Command::GetFileCount, 1, vec![0, 0, 0, 3]);
        assert_eq!(parse_file_count(&three).unwrap(), 3);

        let short = Packet::with_body(Command::GetFileCount, 1, vec![0, 3]);
        assert!(parse_file_count(&short).is_err());
    }

    #[test]
    fn test_expect_accepted() {
        let ok = Packet::with_body(Command::SetSettings, 1, vec![0]);
        let refused = Packet::with_body(Command::SetSettings, 1, vec![1]);

        assert!(expect_accepted(Command::SetSettings, &ok).is_ok());
        assert!(expect_accepted(Command::SetSettings, &Packet::new(Command::SetSettings, 1)).is_ok());
        assert!(expect_accepted(Command::SetSettings, &refused).is_err());
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let device = Device::new();

        assert!(matches!(device.get_card_info().await, Err(Error::NotConnected)));
        assert!(device.disconnect().await.is_ok());

        let report = device
            .stream_file("a.wav", 10, &mut Vec::<u8>::new(), &CancelToken::new())
            .await;
        assert_eq!(report.status, TransferStatus::Disconnected);
    }
}
