//! Canonical per-entry record and the normalisation from raw directory records.

use std::borrow::Cow;

use super::method::CompressionMethod;
use crate::zip::CentralDirectoryRecord;

/// Modification time in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixtimeMicros(pub i64);

/// Absolute byte offset of an entry's data from the start of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressedSize(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OriginalSize(pub u64);

/// CRC-32 of the uncompressed data, as stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(pub u32);

/// One archive member as it appears in the index.
///
/// Records only exist with a resolved data offset; there is no placeholder
/// state. Fields keep their native widths here, and the name its stored
/// bytes; both are checked when the index is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntryRecord {
    pub name: Vec<u8>,
    pub modified: UnixtimeMicros,
    pub offset: Offset,
    pub compressed_size: CompressedSize,
    pub original_size: OriginalSize,
    pub checksum: Checksum,
    pub compression_method: CompressionMethod,
}

impl ZipEntryRecord {
    /// Build the record for `raw`, whose data starts at `offset`.
    pub fn normalize(raw: &CentralDirectoryRecord, offset: u64) -> Self {
        Self {
            name: raw.file_name.clone(),
            modified: UnixtimeMicros(raw.modified_micros()),
            offset: Offset(offset),
            compressed_size: CompressedSize(raw.compressed_size),
            original_size: OriginalSize(raw.uncompressed_size),
            checksum: Checksum(raw.crc32),
            compression_method: CompressionMethod::from(raw.compression_method),
        }
    }

    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// Ordered list of records, in central directory order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipIndex {
    entries: Vec<ZipEntryRecord>,
}

impl ZipIndex {
    pub fn new(entries: Vec<ZipEntryRecord>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ZipEntryRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
