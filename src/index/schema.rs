//! DER schema of the index document.
//!
//! ```text
//! ZipIndex ::= SEQUENCE OF EntryInfo
//!
//! EntryInfo ::= SEQUENCE {
//!     name              UTF8String,
//!     modified          INTEGER,  -- microseconds since the Unix epoch
//!     offset            INTEGER,
//!     compressedSize    INTEGER,
//!     originalSize      INTEGER,
//!     checksum          INTEGER,
//!     compressionMethod ENUMERATED { unspecified(0), store(100), deflate(108) }
//! }
//! ```

use der::Sequence;

use super::method::CompressionMethod;
use super::record::ZipEntryRecord;
use crate::error::Error;

/// Wire form of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Sequence)]
pub struct EntryInfo {
    pub name: String,
    pub modified: i64,
    pub offset: i64,
    pub compressed_size: i64,
    pub original_size: i64,
    pub checksum: i64,
    pub compression_method: CompressionMethod,
}

impl TryFrom<&ZipEntryRecord> for EntryInfo {
    type Error = Error;

    fn try_from(record: &ZipEntryRecord) -> Result<Self, Error> {
        let fail = |reason: String| Error::Encoding {
            name: record.display_name().into_owned(),
            reason,
        };
        let int = |field: &str, value: u64| {
            i64::try_from(value)
                .map_err(|_| fail(format!("{field} {value} exceeds the INTEGER range of the index")))
        };

        let name = String::from_utf8(record.name.clone())
            .map_err(|e| fail(format!("name is not a valid UTF8String: {}", e.utf8_error())))?;

        Ok(Self {
            name,
            modified: record.modified.0,
            offset: int("offset", record.offset.0)?,
            compressed_size: int("compressed size", record.compressed_size.0)?,
            original_size: int("original size", record.original_size.0)?,
            checksum: i64::from(record.checksum.0),
            compression_method: record.compression_method,
        })
    }
}
