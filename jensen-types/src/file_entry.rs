//! Recording file records

use std::fmt;

use chrono::NaiveDateTime;
use jensen_core::constants::delete_result;

use crate::error::{Error, Result};

/// Size of the RIFF/WAVE header excluded from PCM durations
pub const WAV_HEADER_SIZE: u32 = 44;

/// Audio parameters behind the duration formulas
///
/// The formulas assume a fixed sample rate per device generation; a model
/// recording at another rate needs its own profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioProfile {
    pub sample_rate: u32,
}

impl Default for AudioProfile {
    fn default() -> Self {
        Self { sample_rate: 48_000 }
    }
}

impl AudioProfile {
    /// Recording length in seconds for a file of `length` bytes
    ///
    /// | version | formula |
    /// |---|---|
    /// | 1 | `length / 32 * 2` |
    /// | 2 | `(length - 44) / (rate * 2)` |
    /// | 3 | `(length - 44) / (rate * 2 * 2)` |
    /// | 5 | `length / 12000` |
    /// | other | `length / 32000` |
    pub fn duration_secs(&self, format_version: u8, length: u32) -> f64 {
        let bytes = f64::from(length);
        let pcm = f64::from(length.saturating_sub(WAV_HEADER_SIZE));
        let rate = f64::from(self.sample_rate);

        match format_version {
            1 => bytes / 32.0 * 2.0,
            2 => pcm / (rate * 2.0),
            3 => pcm / (rate * 2.0 * 2.0),
            5 => bytes / 12_000.0,
            _ => bytes / 32_000.0,
        }
    }
}

/// One file stored on the device
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,

    /// Selects the duration formula
    pub format_version: u8,

    /// File size in bytes
    pub length: u32,

    pub signature: [u8; 16],

    /// Timestamp taken from the file name
    pub created_at: Option<NaiveDateTime>,

    pub duration_secs: f64,
}

impl FileEntry {
    pub fn new(name: String, format_version: u8, length: u32, signature: [u8; 16], profile: &AudioProfile) -> Self {
        Self {
            created_at: parse_name_timestamp(&name),
            duration_secs: profile.duration_secs(format_version, length),
            name,
            format_version,
            length,
            signature,
        }
    }

    /// Signature as lowercase hex
    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature)
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes, {:.1}s", self.name, self.length, self.duration_secs)?;
        if let Some(created_at) = self.created_at {
            write!(f, ", {}", created_at)?;
        }
        f.write_str(")")
    }
}

/// The recording in progress, as reported by GET_RECORDING_FILE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFile {
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
}

impl RecordingFile {
    /// Decode a GET_RECORDING_FILE body; empty means nothing is recording
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let name = decode_name(body);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            created_at: parse_name_timestamp(&name),
            name,
        })
    }
}

/// Result of DELETE_FILE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Failed,
    Unknown(u8),
}

impl DeleteOutcome {
    pub fn from_code(code: u8) -> Self {
        match code {
            delete_result::SUCCESS => Self::Deleted,
            delete_result::NOT_EXISTS => Self::NotFound,
            delete_result::FAILED => Self::Failed,
            other => Self::Unknown(other),
        }
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Decode a device file name
///
/// Names carry no real text encoding: zero bytes are dropped and every
/// other byte is taken as the character with that code point.
pub fn decode_name(raw: &[u8]) -> String {
    raw.iter().filter(|b| **b != 0).map(|b| char::from(*b)).collect()
}

/// Encode a name for a request body, the inverse of [`decode_name`]
pub fn encode_name(name: &str) -> Result<Vec<u8>> {
    name.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                Error::Validation(format!("file name {:?} has a character outside Latin-1", name))
            })
        })
        .collect()
}

/// Extract the recording timestamp from a file name
///
/// Two conventions are understood:
/// - `YYYYMMDDHHMMSS...REC...(.wav|.hda)`, e.g. `20250512114141REC01.wav`
/// - `<date>-HHMMSS...` with `<date>` as `YYYYMonDD` or `YYMonDD`, e.g.
///   `2025May12-114141-Rec44.hda` (two-digit years are 20xx)
pub fn parse_name_timestamp(name: &str) -> Option<NaiveDateTime> {
    parse_compact(name).or_else(|| parse_month_name(name))
}

fn parse_compact(name: &str) -> Option<NaiveDateTime> {
    let stamp = name.get(..14)?;
    if !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let upper = name.to_ascii_uppercase();
    if !upper.contains("REC") || !(upper.ends_with(".WAV") || upper.ends_with(".HDA")) {
        return None;
    }

    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()
}

fn parse_month_name(name: &str) -> Option<NaiveDateTime> {
    let (date, rest) = name.split_once('-')?;
    let time = rest.get(..6)?;
    if !time.bytes().all(|b| b.is_ascii_digit()) || !date.is_ascii() {
        return None;
    }

    let (year, month_day) = match date.len() {
        9 => (date[..4].to_string(), &date[4..]),
        7 => (format!("20{}", &date[..2]), &date[2..]),
        _ => return None,
    };
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (month, day) = month_day.split_at(3);
    if !month.bytes().all(|b| b.is_ascii_alphabetic()) || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(&format!("{}{}{}{}", year, month, day, time), "%Y%b%d%H%M%S").ok()
}
