//! Error types for jensen-core

/// Result type alias for jensen-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown command code
    #[error("Unknown command code: {0}")]
    UnknownCommand(u16),

    /// Invalid session state transition
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Body does not fit the 24-bit length field
    #[error("Body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge {
        size: usize,
        max: usize,
    },

    /// Checksum does not fit the 8-bit checksum length field
    #[error("Checksum too long: {0} bytes (max: 255 bytes)")]
    ChecksumTooLong(usize),
}
