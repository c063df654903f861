//! Client configuration

use std::time::Duration;

use jensen_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_READ_CHUNK_SIZE, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_WRITE_TIMEOUT_MS, FLUSH_READ_TIMEOUT_MS, MAX_FLUSH_ATTEMPTS,
};
use jensen_transport::UsbTarget;
use jensen_types::AudioProfile;

/// Everything the client needs to know up front
///
/// Passed into [`Device`](crate::Device) at construction; nothing is read
/// from the environment.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device selection and endpoint addresses
    pub target: UsbTarget,

    /// Timeout of a single bulk read attempt
    pub read_timeout: Duration,

    /// Timeout of a bulk write
    pub write_timeout: Duration,

    /// Budget for one request/response exchange
    pub command_timeout: Duration,

    /// Longest wait for the next frame of a file transfer
    pub transfer_timeout: Duration,

    /// Buffer size handed to each bulk read
    pub read_chunk_size: usize,

    /// Reads spent draining the IN endpoint after an abandoned transfer
    pub flush_attempts: usize,

    /// Timeout of a single flush read
    pub flush_read_timeout: Duration,

    /// Parameters of the duration formulas
    pub audio: AudioProfile,

    /// Return files whose name carries no timestamp from `list_files`
    ///
    /// Off by default, matching what the recorder itself shows.
    pub include_untimestamped: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            target: UsbTarget::default(),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            transfer_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            flush_attempts: MAX_FLUSH_ATTEMPTS,
            flush_read_timeout: Duration::from_millis(FLUSH_READ_TIMEOUT_MS),
            audio: AudioProfile::default(),
            include_untimestamped: false,
        }
    }
}

impl DeviceConfig {
    /// Open only this product id
    pub fn with_product_id(mut self, product_id: u16) -> Self {
        self.target.product_id = Some(product_id);
        self
    }

    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.target.vendor_id = vendor_id;
        self
    }

    pub fn with_interface(mut self, interface: u8) -> Self {
        self.target.interface = interface;
        self
    }

    /// Set preferred OUT/IN endpoint addresses
    pub fn with_endpoints(mut self, endpoint_out: u8, endpoint_in: u8) -> Self {
        self.target.endpoint_out = endpoint_out;
        self.target.endpoint_in = endpoint_in;
        self
    }

    /// Set per-read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set transfer inactivity timeout
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_audio_profile(mut self, audio: AudioProfile) -> Self {
        self.audio = audio;
        self
    }

    pub fn include_untimestamped_files(mut self, include: bool) -> Self {
        self.include_untimestamped = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();

        assert_eq!(config.target.vendor_id, 0x10D6);
        assert_eq!(config.target.product_id, None);
        assert_eq!(config.target.endpoint_out, 0x01);
        assert_eq!(config.target.endpoint_in, 0x82);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.audio.sample_rate, 48_000);
        assert!(!config.include_untimestamped);
    }

    #[test]
    fn test_builder() {
        let config = DeviceConfig::default()
            .with_product_id(0xB00D)
            .with_endpoints(0x02, 0x81)
            .with_command_timeout(Duration::from_secs(1));

        assert_eq!(config.target.product_id, Some(0xB00D));
        assert_eq!(config.target.endpoint_in, 0x81);
        assert_eq!(config.command_timeout, Duration::from_secs(1));
    }
}
