//! On-disk record format used by the filesystem store.
//!
//! Each stored value is written with a 16-byte header followed by the payload:
//!
//! ```text
//! 0x00  4   "MDAG" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   compression: 0=none, 1=zstd
//! 0x06  2   reserved (must be 0)
//! 0x08  8   payload_len (u64 LE) - stored (possibly compressed) size
//! 0x10  ... payload
//! ```
//!
//! The header belongs to the store, not to the DAG: it says nothing about whether the
//! value is a blob or an encoded object.

use crate::error::{Error, Result};

/// Magic bytes at the start of every record file.
pub const MAGIC: &[u8; 4] = b"MDAG";

/// Current record format version.
pub const VERSION: u8 = 1;

/// Size of the record header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Compression types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression.
    None = 0,
    /// Zstandard compression.
    Zstd = 1,
}

impl CompressionType {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            _ => Err(Error::storage(format!(
                "Invalid compression type: {}",
                value
            ))),
        }
    }

    /// Get the string name of this compression type (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Zstd => "zstd",
        }
    }

    /// Parse from a config value.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(CompressionType::None),
            "zstd" => Ok(CompressionType::Zstd),
            _ => Err(Error::invalid_config(format!("Unknown compression: {}", s))),
        }
    }
}

/// A 16-byte record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record format version.
    pub version: u8,
    /// Compression applied to the payload.
    pub compression: CompressionType,
    /// Length of the stored payload in bytes.
    pub payload_len: u64,
}

impl RecordHeader {
    pub fn new(compression: CompressionType, payload_len: u64) -> Self {
        Self {
            version: VERSION,
            compression,
            payload_len,
        }
    }

    /// Encode the header to a 16-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version;
        buf[5] = self.compression.to_u8();
        // 6..8 reserved
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Decode a header from the first 16 bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::storage(format!(
                "Record header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            )));
        }

        if &buf[0..4] != MAGIC {
            return Err(Error::storage(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &buf[0..4]
            )));
        }

        let version = buf[4];
        if version != VERSION {
            return Err(Error::storage(format!(
                "Unsupported record version: {} (expected {})",
                version, VERSION
            )));
        }

        let compression = CompressionType::from_u8(buf[5])?;

        if buf[6] != 0 || buf[7] != 0 {
            return Err(Error::storage("Reserved header bytes must be 0"));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);

        Ok(Self {
            version,
            compression,
            payload_len: u64::from_le_bytes(len_bytes),
        })
    }
}

/// Compress data using zstd.
pub fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3) // Level 3 = fast compression
        .map_err(|e| Error::storage(format!("zstd compression failed: {}", e)))
}

/// Decompress data using zstd.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| Error::storage(format!("zstd decompression failed: {}", e)))
}
