//! ZIP archive parsing.
//!
//! This module reads just enough of a ZIP archive to describe its members:
//! the end records, the central directory, and each member's local header.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Opening an archive and parsing its central directory
//! - `offset`: Resolving where each member's data starts
//! - `walker`: Sequential, fail-fast walk producing index records
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, which allows indexing an archive without
//! reading the member data - perfect for HTTP Range requests.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - Archive comments and prepended data (self-extracting archives)
//!
//! ## Limitations
//!
//! - No multi-disk archive support
//! - Member data is never decompressed or verified

mod offset;
pub mod parser;
pub mod structures;
mod walker;

pub use parser::ZipArchive;
pub use structures::*;
pub use walker::EntryWalker;
