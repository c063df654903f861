//! Device model table

use std::fmt;

/// Recorder model, derived from the USB product id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    H1,
    H1E,
    P1,
    /// Product id not in the table
    Unknown(u16),
}

impl DeviceModel {
    /// Product ids of every known model
    pub const KNOWN_PRODUCT_IDS: [u16; 6] = [0xAF0C, 0xAF0D, 0xAF0E, 0xB00C, 0xB00D, 0xB00E];

    pub fn from_product_id(product_id: u16) -> Self {
        match product_id {
            0xAF0C | 0xB00C => Self::H1,
            0xAF0D | 0xB00D => Self::H1E,
            0xAF0E | 0xB00E => Self::P1,
            other => Self::Unknown(other),
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H1 => f.write_str("hidock-h1"),
            Self::H1E => f.write_str("hidock-h1e"),
            Self::P1 => f.write_str("hidock-p1"),
            Self::Unknown(pid) => write!(f, "unknown (pid 0x{:04X})", pid),
        }
    }
}
