//! # zip2index
//!
//! Index the central directory of a ZIP archive into a compact DER document.
//!
//! Every archive member becomes one record carrying its name, modification
//! time, the absolute offset of its data, both sizes, its CRC-32 and its
//! compression method. Consumers can then seek straight to a member without
//! parsing the archive again.
//!
//! Archives are read through the [`ReadAt`] trait, so the same code indexes
//! local files, in-memory images, and remote archives over HTTP Range
//! requests. Only the end records, the central directory, and one local
//! header per member are read.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zip2index::{HttpRangeReader, ZipIndex};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/archive.zip".to_string()).await?);
//!
//!     let der = zip2index::index_archive(reader).await?;
//!     for entry in ZipIndex::from_der(&der)? {
//!         println!("{} @ {}", entry.name, entry.offset);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod index;
pub mod io;
pub mod pipeline;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use index::{CompressionMethod, EntryInfo, ZipEntryRecord, ZipIndex};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use pipeline::{index_archive, index_file, run};
pub use crate::zip::{EntryWalker, ZipArchive};
