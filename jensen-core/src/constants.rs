//! Protocol constants

/// Two-byte marker that starts every frame
pub const SYNC_MARKER: [u8; 2] = [0x12, 0x34];

/// HiDock vendor id
pub const DEFAULT_VENDOR_ID: u16 = 0x10D6;

/// Interface carrying the Jensen bulk endpoints
pub const DEFAULT_INTERFACE: u8 = 0;

/// USB configuration value selected on connect
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Bulk OUT endpoint (host to device)
pub const DEFAULT_ENDPOINT_OUT: u8 = 0x01;

/// Bulk IN endpoint (device to host)
pub const DEFAULT_ENDPOINT_IN: u8 = 0x82;

/// Timeout of a single bulk read attempt (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Timeout of a bulk write (milliseconds)
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

/// Overall budget for a request/response exchange (milliseconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5_000;

/// Size of the buffer handed to each bulk read
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Read attempts spent draining the IN endpoint after an abandoned transfer
pub const MAX_FLUSH_ATTEMPTS: usize = 10;

/// Timeout of a single flush read (milliseconds)
pub const FLUSH_READ_TIMEOUT_MS: u64 = 20;

/// Marker preceding the file-count hint in a file-list body
pub const FILE_LIST_HEADER_MARKER: [u8; 2] = [0xFF, 0xFF];

/// Device setting indices (SET_SETTINGS body is `[index, value]`)
pub mod settings {
    /// Start recording automatically
    pub const AUTO_RECORD: u8 = 0;

    /// Play back automatically
    pub const AUTO_PLAY: u8 = 1;

    /// Bluetooth connection tone
    pub const BLUETOOTH_TONE: u8 = 2;

    /// Notification sound
    pub const NOTIFICATION_SOUND: u8 = 3;
}

/// DELETE_FILE result codes
pub mod delete_result {
    /// File removed
    pub const SUCCESS: u8 = 0;

    /// No such file
    pub const NOT_EXISTS: u8 = 1;

    /// Device could not remove the file
    pub const FAILED: u8 = 2;
}

/// Body sent with FORMAT_CARD
pub const FORMAT_CONFIRMATION: [u8; 4] = [1, 2, 3, 4];
