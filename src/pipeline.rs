//! End-to-end indexing: source in, DER document out.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::io::{LocalFileReader, ReadAt};
use crate::zip::ZipArchive;

/// Index the archive behind `source`, whose total size is `source_size`.
///
/// The archive is opened, every entry is resolved in central directory
/// order, and the collected index is encoded. The first error anywhere
/// aborts the run; no partial document is ever returned.
pub async fn run<R: ReadAt>(source: Arc<R>, source_size: u64) -> Result<Vec<u8>> {
    let archive = ZipArchive::open_with_size(source, source_size).await?;
    debug!(entries = archive.len(), "archive opened");

    let index = archive.entries().collect_index().await?;
    let bytes = index.to_der()?;

    info!(entries = index.len(), bytes = bytes.len(), "index encoded");
    Ok(bytes)
}

/// [`run`] with the size reported by the source itself.
pub async fn index_archive<R: ReadAt>(source: Arc<R>) -> Result<Vec<u8>> {
    let size = source.size();
    run(source, size).await
}

/// Index a ZIP file on the local filesystem.
pub async fn index_file(path: &Path) -> Result<Vec<u8>> {
    let reader = LocalFileReader::new(path)?;
    index_archive(Arc::new(reader)).await
}
