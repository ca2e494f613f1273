//! Deterministic ZIP builder for tests.
//!
//! Writes local headers, data, central directory and end records by hand so
//! tests control every field, including the broken ones.

#![allow(dead_code)]

pub mod server;

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

/// DOS date for 2024-02-29.
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (2 << 5) | 29;
/// DOS time for 13:37:42.
pub const DOS_TIME: u16 = (13 << 11) | (37 << 5) | (42 / 2);
/// 2024-02-29T13:37:42Z in microseconds.
pub const DOS_MICROS: i64 = 1_709_213_862_000_000;

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: Vec<u8>,
    pub content: Vec<u8>,
    pub method: u16,
    pub local_extra: Vec<u8>,
    pub central_extra: Vec<u8>,
}

impl Entry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            content: content.to_vec(),
            method: 0,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
        }
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        Self {
            method: 8,
            ..Self::stored(name, content)
        }
    }

    /// Name bytes written verbatim, valid UTF-8 or not.
    pub fn with_raw_name(mut self, name: &[u8]) -> Self {
        self.name = name.to_vec();
        self
    }

    /// Any other method code; the content is written as is.
    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn with_local_extra(mut self, extra: Vec<u8>) -> Self {
        self.local_extra = extra;
        self
    }

    pub fn with_central_extra(mut self, extra: Vec<u8>) -> Self {
        self.central_extra = extra;
        self
    }

    fn payload(&self) -> Vec<u8> {
        if self.method == 8 {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&self.content).unwrap();
            encoder.finish().unwrap()
        } else {
            self.content.clone()
        }
    }

    pub fn crc32(&self) -> u32 {
        let mut crc = Crc::new();
        crc.update(&self.content);
        crc.sum()
    }
}

/// What a built archive looks like, for assertions.
#[derive(Debug, Clone)]
pub struct Built {
    pub bytes: Vec<u8>,
    pub local_offsets: Vec<u64>,
    /// Absolute position of each central directory header
    pub central_offsets: Vec<u64>,
    /// Absolute position of the end of central directory record
    pub eocd_offset: usize,
    pub data_offsets: Vec<u64>,
    pub payloads: Vec<Vec<u8>>,
}

impl Built {
    /// Break the signature of entry `index`'s local header.
    pub fn corrupt_local_header(&mut self, index: usize) {
        let at = self.local_offsets[index] as usize;
        self.bytes[at..at + 4].copy_from_slice(b"XXXX");
    }

    /// Overwrite a little-endian `u16` at `at`.
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        self.bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Overwrite a little-endian `u32` at `at`.
    pub fn patch_u32(&mut self, at: usize, value: u32) {
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Set both entry counts of the end of central directory record.
    pub fn set_eocd_count(&mut self, count: u16) {
        self.patch_u16(self.eocd_offset + 8, count);
        self.patch_u16(self.eocd_offset + 10, count);
    }
}

#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
    prefix: Vec<u8>,
    comment: Vec<u8>,
    zip64: bool,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Junk in front of the archive; stored offsets stay relative to the archive.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Saturate 32-bit fields and carry the real values in ZIP64 records.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn build(self) -> Built {
        let base = self.prefix.len() as u64;
        let mut out = self.prefix.clone();
        let mut cd = Vec::new();
        let mut local_offsets = Vec::new();
        let mut central_in_cd = Vec::new();
        let mut data_offsets = Vec::new();
        let mut payloads = Vec::new();

        for entry in &self.entries {
            let payload = entry.payload();
            let crc = entry.crc32();
            let local_offset = out.len() as u64;

            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&DOS_TIME.to_le_bytes());
            out.extend_from_slice(&DOS_DATE.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.content.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(entry.local_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&entry.local_extra);
            data_offsets.push(out.len() as u64);
            out.extend_from_slice(&payload);

            let stored_offset = local_offset - base;
            let mut central_extra = Vec::new();
            let (csize, usize_, offset) = if self.zip64 {
                central_extra.extend_from_slice(&0x0001u16.to_le_bytes());
                central_extra.extend_from_slice(&24u16.to_le_bytes());
                central_extra.extend_from_slice(&(entry.content.len() as u64).to_le_bytes());
                central_extra.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                central_extra.extend_from_slice(&stored_offset.to_le_bytes());
                (u32::MAX, u32::MAX, u32::MAX)
            } else {
                (
                    payload.len() as u32,
                    entry.content.len() as u32,
                    stored_offset as u32,
                )
            };
            central_extra.extend_from_slice(&entry.central_extra);

            central_in_cd.push(cd.len() as u64);
            cd.extend_from_slice(b"PK\x01\x02");
            cd.extend_from_slice(&0x031Eu16.to_le_bytes());
            cd.extend_from_slice(&20u16.to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes());
            cd.extend_from_slice(&entry.method.to_le_bytes());
            cd.extend_from_slice(&DOS_TIME.to_le_bytes());
            cd.extend_from_slice(&DOS_DATE.to_le_bytes());
            cd.extend_from_slice(&crc.to_le_bytes());
            cd.extend_from_slice(&csize.to_le_bytes());
            cd.extend_from_slice(&usize_.to_le_bytes());
            cd.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            cd.extend_from_slice(&(central_extra.len() as u16).to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes()); // comment
            cd.extend_from_slice(&0u16.to_le_bytes()); // disk
            cd.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            cd.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            cd.extend_from_slice(&offset.to_le_bytes());
            cd.extend_from_slice(&entry.name);
            cd.extend_from_slice(&central_extra);

            local_offsets.push(local_offset);
            payloads.push(payload);
        }

        let cd_offset = out.len() as u64 - base;
        let cd_size = cd.len() as u64;
        let count = self.entries.len() as u64;
        let cd_start = out.len() as u64;
        let central_offsets = central_in_cd.iter().map(|at| cd_start + at).collect();
        out.extend_from_slice(&cd);

        if self.zip64 {
            let eocd64_offset = out.len() as u64 - base;
            out.extend_from_slice(b"PK\x06\x06");
            out.extend_from_slice(&44u64.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&cd_size.to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());

            out.extend_from_slice(b"PK\x06\x07");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(eocd64_offset + base).to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
        }

        let (eocd_count, eocd_size, eocd_offset) = if self.zip64 {
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (count as u16, cd_size as u32, cd_offset as u32)
        };

        let eocd_at = out.len();
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&eocd_count.to_le_bytes());
        out.extend_from_slice(&eocd_count.to_le_bytes());
        out.extend_from_slice(&eocd_size.to_le_bytes());
        out.extend_from_slice(&eocd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);

        Built {
            bytes: out,
            local_offsets,
            central_offsets,
            eocd_offset: eocd_at,
            data_offsets,
            payloads,
        }
    }
}

/// Extended timestamp extra field (0x5455) carrying only mtime.
pub fn ext_time_extra(mtime: u32) -> Vec<u8> {
    let mut extra = Vec::new();
    extra.extend_from_slice(&0x5455u16.to_le_bytes());
    extra.extend_from_slice(&5u16.to_le_bytes());
    extra.push(1);
    extra.extend_from_slice(&mtime.to_le_bytes());
    extra
}

/// NTFS extra field (0x000a) with mtime, atime and ctime all set to `ticks`.
pub fn ntfs_extra(ticks: u64) -> Vec<u8> {
    let mut extra = Vec::new();
    extra.extend_from_slice(&0x000au16.to_le_bytes());
    extra.extend_from_slice(&32u16.to_le_bytes());
    extra.extend_from_slice(&[0u8; 4]);
    extra.extend_from_slice(&1u16.to_le_bytes());
    extra.extend_from_slice(&24u16.to_le_bytes());
    for _ in 0..3 {
        extra.extend_from_slice(&ticks.to_le_bytes());
    }
    extra
}

/// PKWARE Unix extra field (0x000d) with the given access and modification times.
pub fn unix_extra(atime: u32, mtime: u32) -> Vec<u8> {
    let mut extra = Vec::new();
    extra.extend_from_slice(&0x000du16.to_le_bytes());
    extra.extend_from_slice(&12u16.to_le_bytes());
    extra.extend_from_slice(&atime.to_le_bytes());
    extra.extend_from_slice(&mtime.to_le_bytes());
    extra.extend_from_slice(&[0u8; 4]); // uid, gid
    extra
}
