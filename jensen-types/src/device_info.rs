//! Device information structures

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version, dotted (`"6.2.5"`)
    pub firmware_version: String,

    /// Firmware version as sent (first four body bytes, big-endian)
    pub firmware_version_number: u32,

    /// Device serial number
    pub serial_number: String,
}

impl DeviceInfo {
    /// Serial number field width
    const SERIAL_LEN: usize = 16;

    pub fn new(firmware_version_number: u32, serial_number: String) -> Self {
        let [_, major, minor, patch] = firmware_version_number.to_be_bytes();

        Self {
            firmware_version: format!("{}.{}.{}", major, minor, patch),
            firmware_version_number,
            serial_number,
        }
    }

    /// Decode a GET_DEVICE_INFO response body
    ///
    /// The serial number is read as ASCII; if it contains anything else it
    /// is rendered as hex instead.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::short_body("device info", 4, body.len()));
        }

        let version = BigEndian::read_u32(&body[..4]);
        let serial_end = body.len().min(4 + Self::SERIAL_LEN);
        let serial = decode_serial(&body[4..serial_end]);

        Ok(Self::new(version, serial))
    }
}

fn decode_serial(raw: &[u8]) -> String {
    let trimmed = match raw.iter().rposition(|b| *b != 0) {
        Some(last) => &raw[..=last],
        None => return String::new(),
    };

    if trimmed.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        String::from_utf8_lossy(trimmed).into_owned()
    } else {
        hex::encode(trimmed)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[SN: {}, FW: {}]",
            self.serial_number, self.firmware_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_body() {
        let mut body = vec![0x00, 0x06, 0x02, 0x05];
        body.extend_from_slice(b"HD1E2430312345\0\0");

        let info = DeviceInfo::from_body(&body).unwrap();
        assert_eq!(info.firmware_version_number, 0x0006_0205);
        assert_eq!(info.firmware_version, "6.2.5");
        assert_eq!(info.serial_number, "HD1E2430312345");
    }

    #[test]
    fn test_serial_hex_fallback() {
        let body = [0, 1, 0, 0, 0xC3, 0x00, 0x7F];

        let info = DeviceInfo::from_body(&body).unwrap();
        assert_eq!(info.serial_number, "c3007f");
    }

    #[test]
    fn test_missing_serial() {
        let info = DeviceInfo::from_body(&[0, 1, 2, 3]).unwrap();
        assert_eq!(info.serial_number, "");
        assert_eq!(info.to_string(), "Device[SN: , FW: 1.2.3]");
    }

    #[test]
    fn test_short_body() {
        assert!(DeviceInfo::from_body(&[0, 1]).is_err());
    }
}
