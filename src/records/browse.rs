use std::fmt;

use crate::{buffer::DecodeError, protocol::Response};

use super::record_count;

const FIELDS_PER_ENTRY: usize = 5;
const FILETIME_TICKS_PER_MS: u64 = 10_000;
/// Milliseconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_MS: i64 = 11_644_473_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Windows-style attribute bits reported for a listing entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions(u8);

impl Permissions {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const ARCHIVE: u8 = 0x10;
    pub const NORMAL: u8 = 0x80;

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn is_read_only(&self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    pub fn is_hidden(&self) -> bool {
        self.contains(Self::HIDDEN)
    }

    pub fn is_system(&self) -> bool {
        self.contains(Self::SYSTEM)
    }

    pub fn is_archive(&self) -> bool {
        self.contains(Self::ARCHIVE)
    }

    pub fn is_normal(&self) -> bool {
        self.contains(Self::NORMAL)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub kind: EntryKind,
    pub name: String,
    pub permissions: Permissions,
    pub size: u64,
    /// Unix epoch milliseconds; negative before 1970.
    pub modified: i64,
}

impl DirectoryEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Converts a FILETIME split in two 32-bit halves into Unix epoch milliseconds.
pub fn filetime_to_unix_ms(low: u32, high: u32) -> i64 {
    let ticks = u64::from(low) | (u64::from(high) << 32);
    (ticks / FILETIME_TICKS_PER_MS) as i64 - FILETIME_UNIX_OFFSET_MS
}

/// Decodes a `BROWSEDIR` reply: five fields per entry, an empty directory has none.
pub fn decode_listing(response: &Response) -> Result<Vec<DirectoryEntry>, DecodeError> {
    let entries = record_count(response.count(), FIELDS_PER_ENTRY)?;
    let mut fields = response.fields();

    let mut listing = Vec::new();
    for _ in 0..entries {
        let kind = match fields.bytes()? {
            b"F:" => EntryKind::File,
            b"D:" => EntryKind::Directory,
            other => {
                return Err(DecodeError::InvalidField {
                    field: "entry kind",
                    reason: format!("'{}'", String::from_utf8_lossy(other)),
                });
            }
        };
        let name = fields.string()?;

        let permissions = fields.integer("permissions")?;
        let permissions = u8::try_from(permissions).map_err(|_| DecodeError::InvalidField {
            field: "permissions",
            reason: format!("{permissions} is outside 0..=255"),
        })?;

        let size = fields.integer("size")?;
        let size = u64::try_from(size).map_err(|_| DecodeError::InvalidField {
            field: "size",
            reason: format!("{size} is negative"),
        })?;

        let modified = parse_timestamp(&fields.string()?)?;

        listing.push(DirectoryEntry {
            kind,
            name,
            permissions: Permissions::from_bits(permissions),
            size,
            modified,
        });
    }
    Ok(listing)
}

/// Parses `low,high`. Each half is a 32-bit word that may be printed as a signed value.
fn parse_timestamp(text: &str) -> Result<i64, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field: "timestamp",
        reason: format!("'{text}'"),
    };

    let (low, high) = text.split_once(',').ok_or_else(invalid)?;
    let low: i64 = low.trim().parse().map_err(|_| invalid())?;
    let high: i64 = high.trim().parse().map_err(|_| invalid())?;

    Ok(filetime_to_unix_ms(low as u32, high as u32))
}
