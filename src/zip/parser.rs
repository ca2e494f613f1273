//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Work out the base offset of archives with prepended data
//! 4. Read the Central Directory and parse every record up front
//!
//! Local File Headers are only touched later, one entry at a time, when
//! data offsets are resolved (see [`EntryWalker`](super::EntryWalker)).

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Seconds between 1601-01-01 (NTFS epoch) and 1970-01-01.
const NTFS_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Location of the central directory, resolved from the EOCD records.
#[derive(Debug, Clone, Copy)]
struct DirectoryLocation {
    /// Where the directory ends, i.e. the position of the (ZIP64) EOCD
    end_offset: u64,
    cd_offset: u64,
    cd_size: u64,
    total_entries: u64,
    /// Values came from the ZIP64 end record
    zip64: bool,
}

/// An opened ZIP archive.
///
/// Opening reads the end records and the whole central directory; every
/// record has been validated once [`ZipArchive::open`] returns.
pub struct ZipArchive<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
    /// Bytes of unrelated data in front of the archive
    base_offset: u64,
    /// Central directory records in stored order
    records: Vec<CentralDirectoryRecord>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open the archive, taking its size from the reader.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let size = reader.size();
        Self::open_with_size(reader, size).await
    }

    /// Open the archive over a source of declared total `size`.
    ///
    /// # Errors
    ///
    /// [`Error::Format`] when the end records or the central directory are
    /// missing, truncated or inconsistent, [`Error::Io`] when the source
    /// itself fails.
    pub async fn open_with_size(reader: Arc<R>, size: u64) -> Result<Self> {
        let (eocd, eocd_offset) = find_eocd(reader.as_ref(), size).await?;
        debug!(eocd_offset, entries = eocd.total_entries, "found end of central directory");

        let zip64 = if eocd.is_zip64() {
            find_zip64_eocd(reader.as_ref(), size, eocd_offset).await?
        } else {
            None
        };

        let location = match zip64 {
            Some(eocd64_offset) => {
                let eocd64 = read_zip64_eocd(reader.as_ref(), size, eocd64_offset).await?;
                if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
                    return Err(Error::format("multi-disk archives are not supported"));
                }
                DirectoryLocation {
                    end_offset: eocd64_offset,
                    cd_offset: eocd64.cd_offset,
                    cd_size: eocd64.cd_size,
                    total_entries: eocd64.total_entries,
                    zip64: true,
                }
            }
            None => {
                if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
                    return Err(Error::format("multi-disk archives are not supported"));
                }
                DirectoryLocation {
                    end_offset: eocd_offset,
                    cd_offset: eocd.cd_offset as u64,
                    cd_size: eocd.cd_size as u64,
                    total_entries: eocd.total_entries as u64,
                    zip64: false,
                }
            }
        };

        let base_offset = resolve_base_offset(reader.as_ref(), &location).await?;
        let cd_start = base_offset + location.cd_offset;
        debug!(
            cd_start,
            cd_size = location.cd_size,
            base_offset,
            "reading central directory"
        );

        // Read the entire Central Directory in one request
        // (efficient for HTTP as it's a single Range request)
        let cd_len = usize::try_from(location.cd_size)
            .map_err(|_| Error::format("central directory does not fit in memory"))?;
        let mut cd_data = vec![0u8; cd_len];
        reader.read_exact_at(cd_start, &mut cd_data).await?;

        let mut records = Vec::with_capacity((location.cd_size / CDFH_MIN_SIZE as u64) as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        // The stored count is only 16 bits wide outside ZIP64 and wraps on
        // large archives, so the directory itself decides where it ends.
        while cd_data
            .get(cursor.position() as usize..)
            .is_some_and(|rest| rest.starts_with(CDFH_SIGNATURE))
        {
            let index = records.len();
            let record = parse_cdfh(&mut cursor, base_offset).map_err(|reason| {
                Error::Format(format!("central directory entry #{index}: {reason}"))
            })?;
            trace!(
                index,
                name = %record.display_name(),
                lfh_offset = record.lfh_offset,
                "parsed central directory record"
            );
            records.push(record);
        }

        let found = records.len() as u64;
        let consistent = if location.zip64 {
            found == location.total_entries
        } else {
            found as u16 == location.total_entries as u16
        };
        if !consistent {
            return Err(Error::Format(format!(
                "end of central directory declares {} entries, directory holds {found}",
                location.total_entries
            )));
        }

        Ok(Self {
            reader,
            size,
            base_offset,
            records,
        })
    }

    /// Central directory records in stored order.
    pub fn records(&self) -> &[CentralDirectoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of bytes preceding the archive proper (self-extractor stubs and the like).
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Find and parse the End of Central Directory record.
///
/// The EOCD is located at the end of the ZIP file. This handles both the
/// simple case (no comment) and archives with comments by searching
/// backwards for the signature.
async fn find_eocd<R: ReadAt>(reader: &R, size: u64) -> Result<(EndOfCentralDirectory, u64)> {
    if size < EndOfCentralDirectory::SIZE as u64 {
        return Err(Error::format("file is too small to hold an end of central directory record"));
    }

    // First try the simple case where there's no comment.
    // This avoids reading extra data in the common case.
    let offset = size - EndOfCentralDirectory::SIZE as u64;
    let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
    reader.read_exact_at(offset, &mut buf).await?;

    if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
        let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
        return Ok((eocd, offset));
    }

    // The EOCD could be earlier if there's a ZIP comment.
    let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(size);
    let search_start = size - search_size;

    let mut buf = vec![0u8; search_size as usize];
    reader.read_exact_at(search_start, &mut buf).await?;

    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
            // The comment length field must account for all trailing bytes.
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }
    }

    Err(Error::format("end of central directory record not found"))
}

/// Locate the ZIP64 EOCD through the locator that sits right before the EOCD.
///
/// Saturated EOCD fields can be genuine (an archive with exactly 65535
/// entries), so a missing locator means the EOCD values stand: `Ok(None)`.
async fn find_zip64_eocd<R: ReadAt>(
    reader: &R,
    size: u64,
    eocd_offset: u64,
) -> Result<Option<u64>> {
    let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
        return Ok(None);
    };

    let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
    reader.read_exact_at(locator_offset, &mut locator_buf).await?;
    if !locator_buf.starts_with(Zip64EOCDLocator::SIGNATURE) {
        debug!("saturated end of central directory without a ZIP64 locator");
        return Ok(None);
    }
    let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

    if locator.disk_with_eocd64 != 0 || locator.total_disks > 1 {
        return Err(Error::format("multi-disk archives are not supported"));
    }
    if locator.eocd64_offset > locator_offset
        || size - locator.eocd64_offset < Zip64EOCD::MIN_SIZE as u64
    {
        return Err(Error::format("ZIP64 end of central directory offset is out of range"));
    }

    Ok(Some(locator.eocd64_offset))
}

async fn read_zip64_eocd<R: ReadAt>(reader: &R, size: u64, offset: u64) -> Result<Zip64EOCD> {
    let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
    if size.saturating_sub(offset) < Zip64EOCD::MIN_SIZE as u64 {
        return Err(Error::format("ZIP64 end of central directory record is truncated"));
    }
    reader.read_exact_at(offset, &mut eocd64_buf).await?;
    Zip64EOCD::from_bytes(&eocd64_buf)
}

/// Work out how many bytes precede the archive.
///
/// The directory is expected to end where the end records begin, so any
/// difference to the stored directory offset is data prepended to the
/// archive. A directory that is still found at its stored offset wins,
/// since some writers get the end records wrong.
async fn resolve_base_offset<R: ReadAt>(reader: &R, location: &DirectoryLocation) -> Result<u64> {
    let base_offset = location
        .end_offset
        .checked_sub(location.cd_size)
        .and_then(|cd_start| cd_start.checked_sub(location.cd_offset))
        .ok_or_else(|| Error::format("central directory offset or size is out of range"))?;

    if base_offset == 0 || location.total_entries == 0 {
        return Ok(base_offset);
    }

    let mut sig = [0u8; 4];
    if reader.read_exact_at(location.cd_offset, &mut sig).await.is_ok() && sig == CDFH_SIGNATURE {
        return Ok(0);
    }

    warn!(base_offset, "archive has prepended data, shifting all offsets");
    Ok(base_offset)
}

/// Parse a Central Directory File Header from a cursor.
///
/// Errors are returned as plain reasons; the caller attaches the entry
/// position and turns them into format errors.
fn parse_cdfh(
    cursor: &mut Cursor<&[u8]>,
    base_offset: u64,
) -> std::result::Result<CentralDirectoryRecord, String> {
    if remaining(cursor) < CDFH_MIN_SIZE as u64 {
        return Err("central directory is truncated".into());
    }

    let io = |e: std::io::Error| e.to_string();

    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig).map_err(io)?;
    if sig != CDFH_SIGNATURE {
        return Err("bad central directory file header signature".into());
    }

    // Read fixed-size header fields
    let _version_made_by = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let _version_needed = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let _flags = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let compression_method = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let last_mod_time = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let last_mod_date = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let crc32 = cursor.read_u32::<LittleEndian>().map_err(io)?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>().map_err(io)? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>().map_err(io)? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>().map_err(io)? as u64;
    let extra_field_length = cursor.read_u16::<LittleEndian>().map_err(io)? as u64;
    let file_comment_length = cursor.read_u16::<LittleEndian>().map_err(io)? as u64;
    let _disk_number_start = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>().map_err(io)?;
    let _external_attrs = cursor.read_u32::<LittleEndian>().map_err(io)?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>().map_err(io)? as u64;

    if remaining(cursor) < file_name_length + extra_field_length + file_comment_length {
        return Err("central directory is truncated".into());
    }

    let start = cursor.position() as usize;
    let data = *cursor.get_ref();
    let name_end = start + file_name_length as usize;
    let extra_end = name_end + extra_field_length as usize;

    // Kept as stored; names are checked for UTF-8 when the index is encoded
    let file_name = data[start..name_end].to_vec();

    let mut need_uncompressed = uncompressed_size == 0xFFFFFFFF;
    let mut need_compressed = compressed_size == 0xFFFFFFFF;
    let mut need_offset = lfh_offset == 0xFFFFFFFF;
    let mut extra_modified = None;

    for (header_id, field) in ExtraFields::new(&data[name_end..extra_end]) {
        let mut field = Cursor::new(field);
        match header_id {
            EXTRA_ZIP64 => {
                // Fields are present only if the header field is saturated,
                // always in this order. Only the first ZIP64 field counts.
                if need_uncompressed {
                    uncompressed_size = field
                        .read_u64::<LittleEndian>()
                        .map_err(|_| "ZIP64 extra field is truncated")?;
                    need_uncompressed = false;
                }
                if need_compressed {
                    compressed_size = field
                        .read_u64::<LittleEndian>()
                        .map_err(|_| "ZIP64 extra field is truncated")?;
                    need_compressed = false;
                }
                if need_offset {
                    lfh_offset = field
                        .read_u64::<LittleEndian>()
                        .map_err(|_| "ZIP64 extra field is truncated")?;
                    need_offset = false;
                }
            }
            EXTRA_EXT_TIME => {
                // Bit 0 of the flags says a modification time follows.
                if let (Ok(flags), Ok(mtime)) =
                    (field.read_u8(), field.read_u32::<LittleEndian>())
                {
                    if flags & 1 != 0 {
                        extra_modified = Some(i64::from(mtime) * 1_000_000);
                    }
                }
            }
            EXTRA_UNIX | EXTRA_INFO_ZIP_UNIX => {
                if let (Ok(_atime), Ok(mtime)) = (
                    field.read_u32::<LittleEndian>(),
                    field.read_u32::<LittleEndian>(),
                ) {
                    extra_modified = Some(i64::from(mtime) * 1_000_000);
                }
            }
            EXTRA_NTFS => {
                if let Some(micros) = ntfs_mtime_micros(field.into_inner()) {
                    extra_modified = Some(micros);
                }
            }
            _ => {}
        }
    }

    // An uncompressed size of exactly 0xFFFFFFFF is plausible in a plain
    // archive; a saturated compressed size or offset is not.
    if need_uncompressed {
        trace!("uncompressed size 0xFFFFFFFF without a ZIP64 extra field, taken as stored");
    }
    if need_compressed {
        return Err("saturated compressed size without a ZIP64 extra field".into());
    }
    if need_offset {
        return Err("saturated local header offset without a ZIP64 extra field".into());
    }

    // Skip over the file comment (we don't use it)
    cursor.set_position((extra_end as u64) + file_comment_length);

    let lfh_offset = lfh_offset
        .checked_add(base_offset)
        .ok_or_else(|| format!("local header offset {lfh_offset} overflows"))?;

    Ok(CentralDirectoryRecord {
        file_name,
        compression_method,
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
        extra_modified,
    })
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

/// Iterator over `(header id, payload)` pairs of an extra field block.
///
/// Stops at the first field whose declared size overruns the block.
struct ExtraFields<'a> {
    data: &'a [u8],
}

impl<'a> ExtraFields<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 4 {
            return None;
        }
        let header_id = u16::from_le_bytes([self.data[0], self.data[1]]);
        let field_size = u16::from_le_bytes([self.data[2], self.data[3]]) as usize;
        let rest = &self.data[4..];
        if rest.len() < field_size {
            self.data = &[];
            return None;
        }
        let (field, tail) = rest.split_at(field_size);
        self.data = tail;
        Some((header_id, field))
    }
}

/// Modification time from an NTFS extra field payload.
///
/// The payload is 4 reserved bytes followed by tagged attributes; tag 1
/// (24 bytes) holds mtime, atime and ctime as 100ns ticks.
fn ntfs_mtime_micros(payload: &[u8]) -> Option<i64> {
    let mut attrs = payload.get(4..)?;
    let mut modified = None;

    while attrs.len() >= 4 {
        let tag = u16::from_le_bytes([attrs[0], attrs[1]]);
        let size = u16::from_le_bytes([attrs[2], attrs[3]]) as usize;
        let body = attrs.get(4..4 + size)?;
        attrs = &attrs[4 + size..];

        if tag == 1 && size == 24 {
            let ticks = i64::try_from(u64::from_le_bytes(body[0..8].try_into().ok()?)).ok()?;
            let secs = ticks / 10_000_000 - NTFS_EPOCH_OFFSET_SECS;
            let micros = (ticks % 10_000_000) / 10;
            modified = Some(secs * 1_000_000 + micros);
        }
    }

    modified
}
