//! Storage card usage

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Storage usage reported by GET_CARD_INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    /// Used space in MiB
    pub used_mb: u32,

    /// Total capacity in MiB
    pub capacity_mb: u32,

    /// Opaque device status code
    pub status_raw: u32,
}

impl CardInfo {
    pub const BODY_LEN: usize = 12;

    /// Decode a GET_CARD_INFO response body
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.len() < Self::BODY_LEN {
            return Err(Error::short_body("card info", Self::BODY_LEN, body.len()));
        }

        Ok(Self {
            used_mb: BigEndian::read_u32(&body[0..4]),
            capacity_mb: BigEndian::read_u32(&body[4..8]),
            status_raw: BigEndian::read_u32(&body[8..12]),
        })
    }

    /// Free space in MiB
    pub fn free_mb(&self) -> u32 {
        self.capacity_mb.saturating_sub(self.used_mb)
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} MiB used (status 0x{:08X})",
            self.used_mb, self.capacity_mb, self.status_raw
        )
    }
}
