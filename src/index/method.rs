use der::Enumerated;

use crate::zip::{METHOD_DEFLATED, METHOD_STORED};

/// Compression method as recorded in the index.
///
/// A deliberately small projection of the ZIP method codes: anything other
/// than stored or deflated collapses into [`CompressionMethod::Unspecified`],
/// and there is no way back to the native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enumerated)]
#[repr(u32)]
pub enum CompressionMethod {
    Unspecified = 0,
    Store = 100,
    Deflate = 108,
}

impl From<u16> for CompressionMethod {
    // Convert a native ZIP method code into its index counterpart.
    fn from(value: u16) -> Self {
        match value {
            METHOD_STORED => CompressionMethod::Store,
            METHOD_DEFLATED => CompressionMethod::Deflate,
            _ => CompressionMethod::Unspecified,
        }
    }
}

impl CompressionMethod {
    /// Numeric value written to the index.
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionMethod::Unspecified => "unspecified",
            CompressionMethod::Store => "store",
            CompressionMethod::Deflate => "deflate",
        }
    }
}
