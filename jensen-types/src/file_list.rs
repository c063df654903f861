//! GET_FILE_LIST body decoding
//!
//! ```text
//! [FF FF count:u32]?                      optional header, count hint
//! { version:u8 name_len:u24 name:[u8; name_len]
//!   length:u32 reserved:[u8; 6] signature:[u8; 16] }*
//! ```
//!
//! All integers are big-endian. A trailing partial entry ends the list
//! without an error.

use byteorder::{BigEndian, ByteOrder};
use jensen_core::constants::FILE_LIST_HEADER_MARKER;
use tracing::{debug, trace};

use crate::file_entry::{decode_name, AudioProfile, FileEntry};

const HEADER_LEN: usize = 6;
const RESERVED_LEN: usize = 6;
const SIGNATURE_LEN: usize = 16;

/// Decoded file list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileList {
    /// Count announced by the body header, if present
    pub total_hint: Option<u32>,

    /// Entries in device order
    pub entries: Vec<FileEntry>,
}

impl FileList {
    /// Parse a complete (or truncated) list body
    ///
    /// `count_hint` comes from GET_FILE_COUNT and bounds the parse when the
    /// body carries no header of its own.
    pub fn parse(body: &[u8], count_hint: Option<u32>, profile: AudioProfile) -> Self {
        let mut parser = FileListParser::new(body, count_hint, profile);
        let entries = parser.by_ref().collect();

        Self {
            total_hint: parser.header_hint(),
            entries,
        }
    }

    /// Entries whose name carries a timestamp
    ///
    /// The device's own file browser hides files it cannot date; callers
    /// listing files get the same view.
    pub fn into_timestamped(self) -> Vec<FileEntry> {
        self.entries
            .into_iter()
            .filter(|entry| {
                if entry.created_at.is_none() {
                    debug!("Dropping {} (no timestamp in name)", entry.name);
                }
                entry.created_at.is_some()
            })
            .collect()
    }
}

/// Cursor over a file-list body, yielding one entry at a time
#[derive(Debug)]
pub struct FileListParser<'a> {
    buf: &'a [u8],
    pos: usize,
    header_hint: Option<u32>,
    limit: Option<u32>,
    parsed: u32,
    profile: AudioProfile,
}

impl<'a> FileListParser<'a> {
    pub fn new(buf: &'a [u8], count_hint: Option<u32>, profile: AudioProfile) -> Self {
        let header_hint = (buf.len() >= HEADER_LEN && buf[..2] == FILE_LIST_HEADER_MARKER)
            .then(|| BigEndian::read_u32(&buf[2..HEADER_LEN]));

        Self {
            buf,
            pos: if header_hint.is_some() { HEADER_LEN } else { 0 },
            header_hint,
            limit: header_hint.or(count_hint),
            parsed: 0,
            profile,
        }
    }

    /// Count announced by the body header
    pub fn header_hint(&self) -> Option<u32> {
        self.header_hint
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn parse_entry(&self) -> Option<(FileEntry, usize)> {
        let mut cursor = Cursor::new(&self.buf[self.pos..]);

        let format_version = cursor.take(1)?[0];
        let name_len = BigEndian::read_u24(cursor.take(3)?) as usize;
        let name = decode_name(cursor.take(name_len)?);
        let length = BigEndian::read_u32(cursor.take(4)?);
        cursor.take(RESERVED_LEN)?;

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(cursor.take(SIGNATURE_LEN)?);

        let entry = FileEntry::new(name, format_version, length, signature, &self.profile);
        Some((entry, cursor.pos))
    }
}

impl Iterator for FileListParser<'_> {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        if self.limit.is_some_and(|limit| self.parsed >= limit) {
            return None;
        }

        match self.parse_entry() {
            Some((entry, used)) => {
                trace!("Parsed file entry {}: {}", self.parsed, entry);
                self.pos += used;
                self.parsed += 1;
                Some(entry)
            }
            None => {
                if self.remaining() > 0 {
                    debug!("Ignoring {} trailing bytes of a partial entry", self.remaining());
                }
                self.pos = self.buf.len();
                None
            }
        }
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry_bytes(version: u8, name: &str, length: u32) -> Vec<u8> {
        let mut out = vec![version];
        out.extend_from_slice(&(name.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&[0u8; 6]);
        out.extend_from_slice(&[0xAB; 16]);
        out
    }

    fn with_header(count: u32, entries: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFF];
        out.extend_from_slice(&count.to_be_bytes());
        for entry in entries {
            out.extend_from_slice(entry);
        }
        out
    }

    #[test]
    fn test_header_hint_bounds_parse() {
        let entries = vec![
            entry_bytes(2, "20250512114141REC01.wav", 1044),
            entry_bytes(2, "20250512120000REC02.wav", 2088),
            entry_bytes(2, "20250512130000REC03.wav", 3132),
        ];
        let body = with_header(2, &entries);

        let list = FileList::parse(&body, None, AudioProfile::default());
        assert_eq!(list.total_hint, Some(2));
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[1].name, "20250512120000REC02.wav");
    }

    #[test]
    fn test_exact_hint_count() {
        let entries: Vec<_> = (0..5)
            .map(|i| entry_bytes(1, &format!("2025May0{}-101010-Rec.hda", i + 1), 32 * i))
            .collect();
        let body = with_header(5, &entries);

        let list = FileList::parse(&body, None, AudioProfile::default());
        assert_eq!(list.entries.len(), 5);
        assert!(list.entries.iter().all(|entry| entry.created_at.is_some()));
    }

    #[test]
    fn test_count_hint_without_header() {
        let mut body = entry_bytes(5, "a.hda", 12_000);
        body.extend(entry_bytes(5, "b.hda", 24_000));

        let list = FileList::parse(&body, Some(1), AudioProfile::default());
        assert_eq!(list.total_hint, None);
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].duration_secs, 1.0);
    }

    #[test]
    fn test_truncated_entry_returns_parsed_prefix() {
        let first = entry_bytes(2, "20250512114141REC01.wav", 1044);
        let second = entry_bytes(2, "20250512120000REC02.wav", 2088);

        for cut in 1..second.len() {
            let body = with_header(2, &[first.clone(), second[..cut].to_vec()]);
            let list = FileList::parse(&body, None, AudioProfile::default());
            assert_eq!(list.entries.len(), 1, "cut at {}", cut);
        }
    }

    #[test]
    fn test_entry_fields() {
        let body = entry_bytes(3, "20250512114141REC01.hda", 192_044);
        let list = FileList::parse(&body, None, AudioProfile::default());

        let entry = &list.entries[0];
        assert_eq!(entry.format_version, 3);
        assert_eq!(entry.length, 192_044);
        assert_eq!(entry.duration_secs, 1.0);
        assert_eq!(entry.signature_hex(), "ab".repeat(16));
    }

    #[test]
    fn test_untimestamped_files_are_dropped() {
        // Known quirk: names without a timestamp never reach the caller.
        let body = with_header(
            2,
            &[
                entry_bytes(2, "notes.wav", 1044),
                entry_bytes(2, "2025May12-114141-Rec44.hda", 1044),
            ],
        );

        let list = FileList::parse(&body, None, AudioProfile::default());
        assert_eq!(list.entries.len(), 2);

        let visible = list.into_timestamped();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "2025May12-114141-Rec44.hda");
    }

    #[test]
    fn test_empty_and_header_only() {
        assert_eq!(FileList::parse(&[], None, AudioProfile::default()), FileList::default());

        let list = FileList::parse(&[0xFF, 0xFF, 0, 0, 0, 0], None, AudioProfile::default());
        assert_eq!(list.total_hint, Some(0));
        assert!(list.entries.is_empty());
    }
}
