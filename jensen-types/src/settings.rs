//! Device settings bit set

use std::fmt;

use bitflags::bitflags;
use jensen_core::constants::settings as index;

bitflags! {
    /// Settings reported by GET_SETTINGS
    ///
    /// Bit positions follow the device's setting indices.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceSettings: u8 {
        const AUTO_RECORD = 1 << index::AUTO_RECORD;
        const AUTO_PLAY = 1 << index::AUTO_PLAY;
        const BLUETOOTH_TONE = 1 << index::BLUETOOTH_TONE;
        const NOTIFICATION_SOUND = 1 << index::NOTIFICATION_SOUND;
    }
}

/// A single setting, addressed by its device index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Setting {
    AutoRecord = index::AUTO_RECORD,
    AutoPlay = index::AUTO_PLAY,
    BluetoothTone = index::BLUETOOTH_TONE,
    NotificationSound = index::NOTIFICATION_SOUND,
}

impl Setting {
    pub const ALL: [Setting; 4] = [
        Self::AutoRecord,
        Self::AutoPlay,
        Self::BluetoothTone,
        Self::NotificationSound,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn flag(self) -> DeviceSettings {
        match self {
            Self::AutoRecord => DeviceSettings::AUTO_RECORD,
            Self::AutoPlay => DeviceSettings::AUTO_PLAY,
            Self::BluetoothTone => DeviceSettings::BLUETOOTH_TONE,
            Self::NotificationSound => DeviceSettings::NOTIFICATION_SOUND,
        }
    }

    /// SET_SETTINGS body: `[index, value]`
    pub fn request_body(self, enabled: bool) -> [u8; 2] {
        [self.index(), u8::from(enabled)]
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AutoRecord => "auto-record",
            Self::AutoPlay => "auto-play",
            Self::BluetoothTone => "bluetooth-tone",
            Self::NotificationSound => "notification-sound",
        };
        f.write_str(name)
    }
}

impl DeviceSettings {
    /// Bytes per setting slot in a GET_SETTINGS body
    const SLOT_LEN: usize = 4;

    /// Decode a GET_SETTINGS response body
    ///
    /// Each setting occupies a 4-byte slot at `index * 4`; the slot's last
    /// byte is 1 when the setting is on. Missing slots read as off.
    pub fn from_body(body: &[u8]) -> Self {
        Setting::ALL
            .into_iter()
            .filter(|setting| {
                let last = usize::from(setting.index()) * Self::SLOT_LEN + Self::SLOT_LEN - 1;
                body.get(last) == Some(&1)
            })
            .fold(Self::empty(), |acc, setting| acc | setting.flag())
    }

    pub fn is_enabled(&self, setting: Setting) -> bool {
        self.contains(setting.flag())
    }
}
