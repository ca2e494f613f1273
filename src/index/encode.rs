use der::{Decode, Encode};

use super::record::ZipIndex;
use super::schema::EntryInfo;
use crate::error::Result;

impl ZipIndex {
    /// Encode the index as a DER `SEQUENCE OF EntryInfo`.
    ///
    /// Every record is range-checked first; the first one that does not fit
    /// fails the whole encoding.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let entries = self
            .entries()
            .iter()
            .map(EntryInfo::try_from)
            .collect::<Result<Vec<_>>>()?;
        encode_entries(entries)
    }

    /// Decode an index document back into its wire records.
    pub fn from_der(bytes: &[u8]) -> Result<Vec<EntryInfo>> {
        Ok(Vec::<EntryInfo>::from_der(bytes)?)
    }
}

/// Encode already validated wire records.
pub fn encode_entries(entries: Vec<EntryInfo>) -> Result<Vec<u8>> {
    Ok(entries.to_der()?)
}
