//! The index document: per-entry records and their DER encoding.
//!
//! - [`method`]: projection of ZIP method codes onto the index enumeration
//! - [`record`]: canonical entry records and the [`ZipIndex`] list
//! - [`schema`]: the DER wire types
//! - `encode`: encoding and decoding of whole documents

mod encode;
pub mod method;
pub mod record;
pub mod schema;

pub use encode::encode_entries;
pub use method::CompressionMethod;
pub use record::*;
pub use schema::EntryInfo;
