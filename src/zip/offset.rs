use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::parser::ZipArchive;
use super::structures::{CentralDirectoryRecord, LFH_SIGNATURE, LFH_SIZE};

impl<R: ReadAt> ZipArchive<R> {
    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so the
    /// header is read to calculate where the entry's data begins.
    ///
    /// `index` is the entry's position in the central directory and only
    /// serves to identify it in errors.
    ///
    /// # Errors
    ///
    /// [`Error::LocalHeader`] if the header cannot be read, carries the
    /// wrong signature, or places the data past the end of the archive.
    pub async fn data_offset(&self, index: usize, record: &CentralDirectoryRecord) -> Result<u64> {
        let fail = |reason: String| Error::LocalHeader {
            index,
            name: record.display_name().into_owned(),
            offset: record.lfh_offset,
            reason,
        };

        if self.size().saturating_sub(record.lfh_offset) < LFH_SIZE as u64 {
            return Err(fail("header lies beyond the end of the archive".into()));
        }

        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader()
            .read_exact_at(record.lfh_offset, &mut lfh_buf)
            .await
            .map_err(|e| fail(e.to_string()))?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(fail("bad local file header signature".into()));
        }

        // Variable field lengths sit at fixed positions at the end of the LFH
        let file_name_length = LittleEndian::read_u16(&lfh_buf[26..28]) as u64;
        let extra_field_length = LittleEndian::read_u16(&lfh_buf[28..30]) as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        let data_offset =
            record.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        if data_offset > self.size() {
            return Err(fail(format!(
                "data offset {data_offset} is beyond the end of the archive"
            )));
        }

        Ok(data_offset)
    }
}
