//! Error types for archive indexing.

use thiserror::Error;

/// Errors that can occur while indexing a ZIP archive.
///
/// Every stage hands its error straight back to the caller; the first one
/// raised aborts the run and no partial index is produced.
#[derive(Debug, Error)]
pub enum Error {
    /// The archive locator was not supplied.
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying source failed while the archive was being opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source does not parse as a ZIP archive.
    #[error("not a valid ZIP archive: {0}")]
    Format(String),

    /// The local file header of an entry could not be read or is inconsistent.
    #[error("invalid local file header for entry #{index} ({name:?}) at offset {offset}: {reason}")]
    LocalHeader {
        index: usize,
        name: String,
        offset: u64,
        reason: String,
    },

    /// A record field does not fit the index schema.
    #[error("cannot encode entry {name:?}: {reason}")]
    Encoding { name: String, reason: String },

    /// The DER layer rejected the document.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),
}

impl Error {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Error::Format(reason.into())
    }
}

/// Result type for indexing operations.
pub type Result<T> = std::result::Result<T, Error>;
