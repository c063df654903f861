//! High-level error types

use jensen_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] jensen_core::Error),

    #[error("Transport error: {0}")]
    Transport(jensen_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] jensen_types::Error),

    #[error("No matching device: {0}")]
    DeviceNotFound(String),

    #[error("No bulk IN/OUT endpoint pair on interface {interface}")]
    EndpointsNotFound { interface: u8 },

    #[error("Interface {interface} is claimed by another process")]
    InterfaceBusy { interface: u8 },

    #[error("USB access denied: {0}")]
    PermissionDenied(String),

    #[error("No reply to {0} before the deadline")]
    Timeout(Command),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Cancelled")]
    Cancelled,

    #[error("Transfer incomplete: {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },

    #[error("Device not connected")]
    NotConnected,

    #[error("Bus busy with another command")]
    Busy,

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if the same call may succeed when retried on this connection
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Busy | Self::Cancelled)
    }

    /// Check if the handle was torn down and `connect` is needed again
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Disconnected | Self::NotConnected => true,
            Self::Transport(e) => e.is_fatal(),
            _ => false,
        }
    }
}

impl From<jensen_transport::Error> for Error {
    fn from(e: jensen_transport::Error) -> Self {
        use jensen_transport::Error as T;

        match e {
            T::DeviceNotFound(what) => Self::DeviceNotFound(what),
            T::EndpointsNotFound { interface } => Self::EndpointsNotFound { interface },
            T::InterfaceBusy { interface } => Self::InterfaceBusy { interface },
            T::PermissionDenied(what) => Self::PermissionDenied(what),
            T::Disconnected => Self::Disconnected,
            T::NotConnected => Self::NotConnected,
            other => Self::Transport(other),
        }
    }
}
