use tracing::trace;

use crate::error::Result;
use crate::index::{ZipEntryRecord, ZipIndex};
use crate::io::ReadAt;

use super::parser::ZipArchive;

/// Pull-based walk over an archive's entries in central directory order.
///
/// Each call to [`EntryWalker::next_entry`] resolves one local header and
/// yields the finished record. The first error is yielded once and ends the
/// walk. Dropping the walker early stops all further reads.
pub struct EntryWalker<'a, R: ReadAt> {
    archive: &'a ZipArchive<R>,
    position: usize,
    done: bool,
}

impl<'a, R: ReadAt> EntryWalker<'a, R> {
    pub(crate) fn new(archive: &'a ZipArchive<R>) -> Self {
        Self {
            archive,
            position: 0,
            done: false,
        }
    }

    /// Produce the next record, `None` once the walk is over.
    pub async fn next_entry(&mut self) -> Option<Result<ZipEntryRecord>> {
        if self.done {
            return None;
        }
        let Some(raw) = self.archive.records().get(self.position) else {
            self.done = true;
            return None;
        };
        let index = self.position;
        self.position += 1;

        match self.archive.data_offset(index, raw).await {
            Ok(offset) => {
                trace!(index, name = %raw.display_name(), offset, "resolved entry");
                Some(Ok(ZipEntryRecord::normalize(raw, offset)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Drain the walk into an index, discarding everything on the first error.
    pub async fn collect_index(mut self) -> Result<ZipIndex> {
        let mut entries = Vec::with_capacity(self.archive.len());
        while let Some(entry) = self.next_entry().await {
            entries.push(entry?);
        }
        Ok(ZipIndex::new(entries))
    }
}

impl<R: ReadAt> ZipArchive<R> {
    /// Walk the entries of this archive.
    pub fn entries(&self) -> EntryWalker<'_, R> {
        EntryWalker::new(self)
    }
}
