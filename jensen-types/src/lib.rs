//! Type definitions for jensen
//!
//! Plain data handed to callers, and the decoders that build it from
//! response bodies.

pub mod card_info;
pub mod clock;
pub mod device_info;
pub mod error;
pub mod file_entry;
pub mod file_list;
pub mod model;
pub mod settings;

pub use card_info::CardInfo;
pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use file_entry::{encode_name, AudioProfile, DeleteOutcome, FileEntry, RecordingFile};
pub use file_list::{FileList, FileListParser};
pub use model::DeviceModel;
pub use settings::{DeviceSettings, Setting};
