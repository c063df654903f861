//! Transport layer for the Jensen protocol
//!
//! Provides bulk-endpoint communication with recorders over USB.

pub mod error;
pub mod usb;

pub use error::{Error, Result};
pub use usb::{list_devices, UsbDeviceSummary, UsbTransport};

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use jensen_core::constants::{
    DEFAULT_CONFIGURATION, DEFAULT_ENDPOINT_IN, DEFAULT_ENDPOINT_OUT, DEFAULT_INTERFACE,
    DEFAULT_VENDOR_ID,
};

/// Which device to open and how to address it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbTarget {
    pub vendor_id: u16,

    /// `None` opens the first device with a matching vendor id
    pub product_id: Option<u16>,

    pub interface: u8,
    pub configuration: u8,

    /// Preferred endpoint addresses; the first bulk endpoint of each
    /// direction is used when these are absent
    pub endpoint_out: u8,
    pub endpoint_in: u8,
}

impl Default for UsbTarget {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: None,
            interface: DEFAULT_INTERFACE,
            configuration: DEFAULT_CONFIGURATION,
            endpoint_out: DEFAULT_ENDPOINT_OUT,
            endpoint_in: DEFAULT_ENDPOINT_IN,
        }
    }
}

/// What [`Transport::open`] ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub endpoint_out: u8,
    pub endpoint_in: u8,
}

/// Transport trait for a bulk IN/OUT endpoint pair
#[async_trait]
pub trait Transport: Send + Sync {
    /// Locate, configure and claim the device
    ///
    /// On failure nothing stays claimed.
    async fn open(&mut self, target: UsbTarget) -> Result<OpenedDevice>;

    /// Release the interface and close the device (best effort)
    async fn close(&mut self) -> Result<()>;

    /// Check if a device is open
    fn is_open(&self) -> bool;

    /// Write to the OUT endpoint, returning the bytes sent
    async fn write(&mut self, data: Bytes, timeout: Duration) -> Result<usize>;

    /// One read from the IN endpoint (`Error::Timeout` if nothing arrives)
    async fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes>;

    /// Clear a stall on the IN endpoint
    async fn clear_halt_in(&mut self) -> Result<()>;

    /// Human-readable device location
    fn describe(&self) -> String;
}
