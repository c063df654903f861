//! Jensen frame structure and encoding/decoding

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    command::Command,
    constants::SYNC_MARKER,
    error::{Error, Result},
};

/// Jensen protocol frame
///
/// # Frame Structure
///
/// ```text
/// ┌─────────┬───────────┬────────────┬─────────────┬──────────┬──────────┐
/// │  Sync   │  Command  │  Sequence  │ LengthField │   Body   │ Checksum │
/// │ 2 bytes │  2 bytes  │  4 bytes   │   4 bytes   │  N bytes │  C bytes │
/// │ 12 34   │  (BE u16) │  (BE u32)  │  (BE u32)   │  (bytes) │  (bytes) │
/// └─────────┴───────────┴────────────┴─────────────┴──────────┴──────────┘
/// ```
///
/// The top byte of `LengthField` is the checksum length `C`, the low 24 bits
/// are the body length `N`. Devices currently always send `C = 0`.
///
/// # Examples
///
/// ```
/// use jensen_core::{Command, Decode, Packet};
///
/// let packet = Packet::with_body(Command::GetFileCount, 7, vec![]);
/// let encoded = packet.encode().unwrap();
///
/// match Packet::try_decode(&encoded) {
///     Decode::Frame { packet: decoded, consumed, .. } => {
///         assert_eq!(decoded, packet);
///         assert_eq!(consumed, encoded.len());
///     }
///     Decode::NeedMoreData { .. } => unreachable!(),
/// }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw command id (responses echo the request's id)
    pub command_id: u16,

    /// Sequence id of the request this frame belongs to
    pub sequence_id: u32,

    /// Frame body
    pub body: Bytes,

    /// Trailing checksum bytes, not verified
    pub checksum: Bytes,
}

/// Outcome of [`Packet::try_decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decode {
    /// A complete frame was found
    ///
    /// `skipped` bytes of garbage preceded it; `consumed` counts from the
    /// start of the buffer and includes them.
    Frame {
        packet: Packet,
        skipped: usize,
        consumed: usize,
    },

    /// No complete frame yet
    ///
    /// The first `skipped` bytes can never start a frame and may be dropped.
    NeedMoreData {
        skipped: usize,
    },
}

impl Packet {
    /// Frame header size in bytes
    pub const HEADER_SIZE: usize = crate::HEADER_SIZE;

    /// Maximum body size
    pub const MAX_BODY_SIZE: usize = crate::MAX_BODY_SIZE;

    /// Create a frame with an empty body
    pub fn new(command: Command, sequence_id: u32) -> Self {
        Self {
            command_id: command.into(),
            sequence_id,
            body: Bytes::new(),
            checksum: Bytes::new(),
        }
    }

    /// Create a frame with a body
    ///
    /// # Examples
    ///
    /// ```
    /// use jensen_core::{Packet, Command};
    ///
    /// let packet = Packet::with_body(Command::DeleteFile, 3, b"REC01.hda".to_vec());
    /// assert_eq!(packet.body.len(), 9);
    /// ```
    pub fn with_body(command: Command, sequence_id: u32, body: impl Into<Bytes>) -> Self {
        Self {
            command_id: command.into(),
            sequence_id,
            body: body.into(),
            checksum: Bytes::new(),
        }
    }

    /// Typed command of this frame
    pub fn command(&self) -> Result<Command> {
        Command::try_from(self.command_id)
    }

    /// Build the 32-bit length field: `(checksum_len << 24) | body_len`
    pub fn length_field(&self) -> Result<u32> {
        if self.body.len() > Self::MAX_BODY_SIZE {
            return Err(Error::BodyTooLarge {
                size: self.body.len(),
                max: Self::MAX_BODY_SIZE,
            });
        }

        let checksum_len = u8::try_from(self.checksum.len())
            .map_err(|_| Error::ChecksumTooLong(self.checksum.len()))?;

        Ok((u32::from(checksum_len) << 24) | self.body.len() as u32)
    }

    /// Split a length field into `(checksum_len, body_len)`
    pub fn split_length_field(field: u32) -> (usize, usize) {
        ((field >> 24) as usize, (field & 0x00FF_FFFF) as usize)
    }

    /// Encode frame to bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the body or checksum does not fit its length field.
    pub fn encode(&self) -> Result<BytesMut> {
        let length_field = self.length_field()?;
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&SYNC_MARKER);
        buf.put_u16(self.command_id);
        buf.put_u32(self.sequence_id);
        buf.put_u32(length_field);
        buf.put_slice(&self.body);
        buf.put_slice(&self.checksum);

        Ok(buf)
    }

    /// Try to decode one frame from the start of `buf`
    ///
    /// Leading bytes that do not start with the sync marker are reported as
    /// `skipped`. A trailing lone `0x12` is kept since the next read may
    /// complete the marker.
    pub fn try_decode(buf: &[u8]) -> Decode {
        let skipped = match buf.windows(2).position(|w| w == SYNC_MARKER) {
            Some(offset) => offset,
            None => {
                let keep = usize::from(buf.last() == Some(&SYNC_MARKER[0]));
                return Decode::NeedMoreData {
                    skipped: buf.len() - keep,
                };
            }
        };

        let frame = &buf[skipped..];
        if frame.len() < Self::HEADER_SIZE {
            return Decode::NeedMoreData { skipped };
        }

        let command_id = BigEndian::read_u16(&frame[2..4]);
        let sequence_id = BigEndian::read_u32(&frame[4..8]);
        let (checksum_len, body_len) = Self::split_length_field(BigEndian::read_u32(&frame[8..12]));

        let body_end = Self::HEADER_SIZE + body_len;
        let total = body_end + checksum_len;
        if frame.len() < total {
            return Decode::NeedMoreData { skipped };
        }

        let packet = Self {
            command_id,
            sequence_id,
            body: Bytes::copy_from_slice(&frame[Self::HEADER_SIZE..body_end]),
            checksum: Bytes::copy_from_slice(&frame[body_end..total]),
        };

        Decode::Frame {
            packet,
            skipped,
            consumed: skipped + total,
        }
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.body.len() + self.checksum.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command_id", &self.command_id)
            .field("sequence_id", &self.sequence_id)
            .field("body_len", &self.body.len())
            .field("body_head", &hex::encode(&self.body[..self.body.len().min(16)]))
            .field("checksum_len", &self.checksum.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command() {
            Ok(command) => write!(f, "Packet[{}]", command)?,
            Err(_) => write!(f, "Packet[UNKNOWN({})]", self.command_id)?,
        }
        write!(f, "(seq={}, len={})", self.sequence_id, self.body.len())
    }
}
