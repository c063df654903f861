//! USB bulk transport for Jensen recorders
//!
//! libusb calls block, so every transfer runs on tokio's blocking pool with
//! a shared handle. Only one transfer is in flight at a time; the caller
//! serialises access.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use tracing::{debug, info, trace, warn};

use crate::{error::*, OpenedDevice, Transport, UsbTarget};

/// An attached device matching a vendor id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbDeviceSummary {
    pub bus: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// List attached devices with the given vendor id
pub fn list_devices(vendor_id: u16) -> Result<Vec<UsbDeviceSummary>> {
    let context = Context::new()?;
    let mut found = Vec::new();

    for device in context.devices()?.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        if descriptor.vendor_id() != vendor_id {
            continue;
        }

        found.push(UsbDeviceSummary {
            bus: device.bus_number(),
            address: device.address(),
            vendor_id,
            product_id: descriptor.product_id(),
        });
    }

    Ok(found)
}

/// Claimed interface and what it takes to give it back
#[derive(Debug, Clone, Copy)]
struct Claim {
    interface: u8,
    endpoint_out: u8,
    endpoint_in: u8,
    kernel_driver_detached: bool,
}

/// USB transport over libusb
pub struct UsbTransport {
    handle: Option<Arc<DeviceHandle<Context>>>,
    claim: Option<Claim>,
    location: Option<String>,
}

impl UsbTransport {
    /// Create a closed transport
    pub fn new() -> Self {
        Self {
            handle: None,
            claim: None,
            location: None,
        }
    }

    fn session(&self) -> Result<(Arc<DeviceHandle<Context>>, Claim)> {
        match (&self.handle, self.claim) {
            (Some(handle), Some(claim)) => Ok((Arc::clone(handle), claim)),
            _ => Err(Error::NotConnected),
        }
    }
}

impl Default for UsbTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn find_device(context: &Context, target: &UsbTarget) -> Result<Device<Context>> {
    for device in context.devices()?.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };

        let pid_matches = target
            .product_id
            .is_none_or(|pid| pid == descriptor.product_id());
        if descriptor.vendor_id() == target.vendor_id && pid_matches {
            return Ok(device);
        }
    }

    Err(Error::DeviceNotFound(match target.product_id {
        Some(pid) => format!("{:04x}:{:04x}", target.vendor_id, pid),
        None => format!("{:04x}:*", target.vendor_id),
    }))
}

/// Pick the bulk endpoint at `preferred`, else the first bulk endpoint in `direction`
fn pick_endpoint(endpoints: &[(u8, Direction)], preferred: u8, direction: Direction) -> Option<u8> {
    endpoints
        .iter()
        .find(|(address, dir)| *address == preferred && *dir == direction)
        .or_else(|| endpoints.iter().find(|(_, dir)| *dir == direction))
        .map(|(address, _)| *address)
}

fn bulk_endpoints(device: &Device<Context>, interface: u8) -> Result<Vec<(u8, Direction)>> {
    let config = device.active_config_descriptor()?;
    let setting = config
        .interfaces()
        .find(|candidate| candidate.number() == interface)
        .and_then(|found| found.descriptors().next())
        .ok_or(Error::EndpointsNotFound { interface })?;

    Ok(setting
        .endpoint_descriptors()
        .filter(|endpoint| endpoint.transfer_type() == TransferType::Bulk)
        .map(|endpoint| (endpoint.address(), endpoint.direction()))
        .collect())
}

fn open_blocking(target: UsbTarget) -> Result<(DeviceHandle<Context>, Claim, OpenedDevice)> {
    let context = Context::new()?;
    let device = find_device(&context, &target)?;
    let descriptor = device.device_descriptor()?;
    let iface = target.interface;

    info!(
        "Found {:04x}:{:04x} on bus {:03} addr {:03}",
        descriptor.vendor_id(),
        descriptor.product_id(),
        device.bus_number(),
        device.address()
    );

    let handle = device.open()?;

    // Not every platform has kernel drivers to detach.
    let kernel_driver_detached = match handle.kernel_driver_active(iface) {
        Ok(true) => match handle.detach_kernel_driver(iface) {
            Ok(()) => {
                debug!("Detached kernel driver from interface {}", iface);
                true
            }
            Err(e) => {
                warn!("Could not detach kernel driver: {}", e);
                false
            }
        },
        Ok(false) => false,
        Err(e) => {
            debug!("Kernel driver query unsupported: {}", e);
            false
        }
    };

    let reattach = |handle: &DeviceHandle<Context>| {
        if kernel_driver_detached {
            if let Err(e) = handle.attach_kernel_driver(iface) {
                warn!("Could not reattach kernel driver: {}", e);
            }
        }
    };

    if handle.active_configuration().ok() != Some(target.configuration) {
        match handle.set_active_configuration(target.configuration) {
            Ok(()) => {}
            Err(rusb::Error::Busy) => debug!("Configuration busy, keeping the active one"),
            Err(e) => {
                reattach(&handle);
                return Err(e.into());
            }
        }
    }

    let endpoints = match bulk_endpoints(&device, iface) {
        Ok(endpoints) => endpoints,
        Err(e) => {
            reattach(&handle);
            return Err(e);
        }
    };

    if let Err(e) = handle.claim_interface(iface) {
        reattach(&handle);
        return Err(match e {
            rusb::Error::Busy => Error::InterfaceBusy { interface: iface },
            other => other.into(),
        });
    }
    debug!("Claimed interface {}", iface);

    let endpoint_out = pick_endpoint(&endpoints, target.endpoint_out, Direction::Out);
    let endpoint_in = pick_endpoint(&endpoints, target.endpoint_in, Direction::In);
    let (Some(endpoint_out), Some(endpoint_in)) = (endpoint_out, endpoint_in) else {
        let _ = handle.release_interface(iface);
        reattach(&handle);
        return Err(Error::EndpointsNotFound { interface: iface });
    };

    if endpoint_out != target.endpoint_out || endpoint_in != target.endpoint_in {
        warn!(
            "Expected endpoints 0x{:02X}/0x{:02X} not present, using 0x{:02X}/0x{:02X}",
            target.endpoint_out, target.endpoint_in, endpoint_out, endpoint_in
        );
    }

    let claim = Claim {
        interface: iface,
        endpoint_out,
        endpoint_in,
        kernel_driver_detached,
    };
    let opened = OpenedDevice {
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        endpoint_out,
        endpoint_in,
    };

    Ok((handle, claim, opened))
}

fn release_blocking(handle: &DeviceHandle<Context>, claim: Claim) {
    if let Err(e) = handle.release_interface(claim.interface) {
        warn!("Failed to release interface {}: {}", claim.interface, e);
    }

    if claim.kernel_driver_detached {
        if let Err(e) = handle.attach_kernel_driver(claim.interface) {
            warn!("Failed to reattach kernel driver: {}", e);
        }
    }
}

#[async_trait]
impl Transport for UsbTransport {
    async fn open(&mut self, target: UsbTarget) -> Result<OpenedDevice> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        let (handle, claim, opened) = tokio::task::spawn_blocking(move || open_blocking(target)).await??;

        self.location = Some(format!(
            "usb {:04x}:{:04x} if{}",
            opened.vendor_id, opened.product_id, claim.interface
        ));
        self.handle = Some(Arc::new(handle));
        self.claim = Some(claim);

        Ok(opened)
    }

    async fn close(&mut self) -> Result<()> {
        let (Some(handle), Some(claim)) = (self.handle.take(), self.claim.take()) else {
            return Ok(());
        };

        debug!("Closing {}...", self.describe());
        self.location = None;

        if Arc::strong_count(&handle) > 1 {
            warn!("Transfer still in flight, releasing interface {} under it", claim.interface);
        }
        tokio::task::spawn_blocking(move || release_blocking(&handle, claim)).await?;

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    async fn write(&mut self, data: Bytes, timeout: Duration) -> Result<usize> {
        let (handle, claim) = self.session()?;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        let sent = tokio::task::spawn_blocking(move || handle.write_bulk(claim.endpoint_out, &data, timeout))
            .await??;

        Ok(sent)
    }

    async fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes> {
        let (handle, claim) = self.session()?;

        let data = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; max_len];
            let n = handle.read_bulk(claim.endpoint_in, &mut buf, timeout)?;
            buf.truncate(n);
            Ok::<_, rusb::Error>(Bytes::from(buf))
        })
        .await??;

        trace!("Received {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        Ok(data)
    }

    async fn clear_halt_in(&mut self) -> Result<()> {
        let (handle, claim) = self.session()?;

        debug!("Clearing halt on endpoint 0x{:02X}", claim.endpoint_in);
        tokio::task::spawn_blocking(move || handle.clear_halt(claim.endpoint_in)).await??;
        Ok(())
    }

    fn describe(&self) -> String {
        self.location
            .clone()
            .unwrap_or_else(|| "usb (not open)".to_string())
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("USB transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_usb_transport_create() {
        let transport = UsbTransport::new();
        assert!(!transport.is_open());
        assert_eq!(transport.describe(), "usb (not open)");
    }

    #[tokio::test]
    async fn test_io_requires_open() {
        let mut transport = UsbTransport::new();

        let read = transport.read(64, Duration::from_millis(10)).await;
        assert!(matches!(read, Err(Error::NotConnected)));

        let write = transport.write(Bytes::from_static(&[1]), Duration::from_millis(10)).await;
        assert!(matches!(write, Err(Error::NotConnected)));

        assert!(matches!(transport.clear_halt_in().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_close_when_not_open() {
        let mut transport = UsbTransport::new();
        assert!(transport.close().await.is_ok());
    }

    #[test]
    fn test_pick_endpoint_prefers_configured_address() {
        let endpoints = [(0x02, Direction::Out), (0x01, Direction::Out), (0x82, Direction::In)];

        assert_eq!(pick_endpoint(&endpoints, 0x01, Direction::Out), Some(0x01));
        assert_eq!(pick_endpoint(&endpoints, 0x82, Direction::In), Some(0x82));
    }

    #[test]
    fn test_pick_endpoint_falls_back_to_first_bulk() {
        let endpoints = [(0x03, Direction::Out), (0x84, Direction::In), (0x85, Direction::In)];

        assert_eq!(pick_endpoint(&endpoints, 0x01, Direction::Out), Some(0x03));
        assert_eq!(pick_endpoint(&endpoints, 0x82, Direction::In), Some(0x84));
        assert_eq!(pick_endpoint(&[(0x84, Direction::In)], 0x01, Direction::Out), None);
    }
}
