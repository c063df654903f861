//! Transport errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No bulk IN/OUT endpoint pair on interface {interface}")]
    EndpointsNotFound { interface: u8 },

    #[error("Interface {interface} is claimed by another process")]
    InterfaceBusy { interface: u8 },

    #[error("USB access denied: {0}")]
    PermissionDenied(String),

    #[error("USB transfer timed out")]
    Timeout,

    #[error("Endpoint stalled")]
    Stall,

    #[error("Device disconnected")]
    Disconnected,

    #[error("USB error: {0}")]
    Usb(#[source] rusb::Error),

    #[error("USB worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Stalls are cleared in place; the connection survives them
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stall)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Check if the device handle is no longer usable
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Stall | Self::Timeout)
    }
}

impl From<rusb::Error> for Error {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Timeout => Self::Timeout,
            rusb::Error::Pipe => Self::Stall,
            rusb::Error::NoDevice => Self::Disconnected,
            rusb::Error::Access => Self::PermissionDenied(error.to_string()),
            other => Self::Usb(other),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Worker(error.to_string())
    }
}
