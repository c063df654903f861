//! Jensen protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// The numeric values are a stable contract with the device firmware.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    // Device information
    GetDeviceInfo = 1,
    GetDeviceTime = 2,
    SetDeviceTime = 3,

    // File operations
    GetFileList = 4,
    TransferFile = 5,
    GetFileCount = 6,
    DeleteFile = 7,

    // Settings
    GetSettings = 11,
    SetSettings = 12,

    // Partial reads
    GetFileBlock = 13,

    // Storage
    GetCardInfo = 16,
    FormatCard = 17,

    // Recorder status
    GetRecordingFile = 18,
}

impl Command {
    /// Check if the device answers this command with several frames
    ///
    /// Frames after the first carry their own sequence ids, so they are
    /// matched on command id instead.
    pub fn is_streaming(self) -> bool {
        matches!(
            self,
            Self::GetFileList | Self::TransferFile | Self::GetFileBlock
        )
    }

    /// Check if the command changes state on the device
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::DeleteFile | Self::FormatCard)
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::GetDeviceInfo => "GET_DEVICE_INFO",
            Self::GetDeviceTime => "GET_DEVICE_TIME",
            Self::SetDeviceTime => "SET_DEVICE_TIME",
            Self::GetFileList => "GET_FILE_LIST",
            Self::TransferFile => "TRANSFER_FILE",
            Self::GetFileCount => "GET_FILE_COUNT",
            Self::DeleteFile => "DELETE_FILE",
            Self::GetSettings => "GET_SETTINGS",
            Self::SetSettings => "SET_SETTINGS",
            Self::GetFileBlock => "GET_FILE_BLOCK",
            Self::GetCardInfo => "GET_CARD_INFO",
            Self::FormatCard => "FORMAT_CARD",
            Self::GetRecordingFile => "GET_RECORDING_FILE",
        }
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::GetDeviceInfo),
            2 => Ok(Self::GetDeviceTime),
            3 => Ok(Self::SetDeviceTime),
            4 => Ok(Self::GetFileList),
            5 => Ok(Self::TransferFile),
            6 => Ok(Self::GetFileCount),
            7 => Ok(Self::DeleteFile),
            11 => Ok(Self::GetSettings),
            12 => Ok(Self::SetSettings),
            13 => Ok(Self::GetFileBlock),
            16 => Ok(Self::GetCardInfo),
            17 => Ok(Self::FormatCard),
            18 => Ok(Self::GetRecordingFile),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}
