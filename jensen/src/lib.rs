//! # jensen
//!
//! Host-side client for the Jensen USB protocol spoken by HiDock recorders.
//!
//! ## Features
//!
//! - Async API on Tokio, safe to share between tasks
//! - Frame reassembly with resynchronisation on corrupt input
//! - Streaming downloads with progress reporting and cancellation
//! - Typed errors for every way opening a USB device can fail
//!
//! ## Quick Start
//!
//! ```no_run
//! use jensen::{CancelToken, Device};
//!
//! #[tokio::main]
//! async fn main() -> jensen::Result<()> {
//!     let device = Device::new();
//!     device.connect().await?;
//!
//!     let info = device.get_device_info().await?;
//!     println!("{}", info);
//!
//!     if let Some(file) = device.list_files().await?.into_iter().next() {
//!         let mut data: Vec<u8> = Vec::new();
//!         let report = device
//!             .stream_file(&file.name, file.length.into(), &mut data, &CancelToken::new())
//!             .await;
//!         println!("{}: {} ({} bytes)", file.name, report.status, data.len());
//!     }
//!
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
mod link;
pub mod transfer;

// Re-exports
pub use config::DeviceConfig;
pub use device::Device;
pub use error::{Error, Result};
pub use transfer::{
    callbacks, CancelToken, TransferReport, TransferSink, TransferStatus, WriteSink,
};

// Re-export lower layers
pub use jensen_core::{Command, ConnectionState, Packet};
pub use jensen_transport::{list_devices, OpenedDevice, Transport, UsbDeviceSummary, UsbTarget, UsbTransport};
pub use jensen_types::{
    AudioProfile, CardInfo, DeleteOutcome, DeviceInfo, DeviceModel, DeviceSettings, FileEntry,
    FileList, RecordingFile, Setting,
};
