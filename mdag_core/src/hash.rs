//! Content hashing.
//!
//! Digests are opaque 32-byte values. Hashing state is mutable and not reentrant, so
//! it is handed around as an explicit [`ContentHasher`] capability; a
//! [`HashProvider`] gives each concurrent task its own instance.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Hash digest size in bytes (BLAKE3 produces 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" | "blake3" => Ok(Algorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// A provider handing out hashers for this algorithm.
    pub fn provider(&self) -> Blake3Provider {
        match self {
            Algorithm::Blake3 => Blake3Provider,
        }
    }
}

/// A 32-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a slice, which must be exactly [`HASH_SIZE`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| {
            Error::invalid_hash(format!(
                "Expected {} bytes, got {}",
                HASH_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Hash(array))
    }

    /// Create a Hash from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        Self::from_slice(&bytes)
    }

    /// Convert to hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the first 2 hex characters (for directory sharding).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Get the remaining 62 hex characters (for filename).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Hash raw bytes with a one-off BLAKE3 hasher.
    pub fn hash_bytes(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A stateful hash function instance.
///
/// Used as `reset()`, then any number of `write()` calls, then `sum()`.
pub trait ContentHasher {
    /// Discard any bytes written so far.
    fn reset(&mut self);

    /// Feed bytes into the running digest.
    fn write(&mut self, bytes: &[u8]);

    /// Digest of everything written since the last reset.
    fn sum(&self) -> Hash;

    /// Reset, write `bytes` and return the digest.
    fn digest(&mut self, bytes: &[u8]) -> Hash {
        self.reset();
        self.write(bytes);
        self.sum()
    }
}

/// Hands out independent hasher instances, one per concurrent task.
pub trait HashProvider {
    type Hasher: ContentHasher;

    fn new_hasher(&self) -> Self::Hasher;
}

/// BLAKE3 implementation of [`ContentHasher`].
#[derive(Debug, Clone, Default)]
pub struct Blake3Hasher {
    inner: blake3::Hasher,
}

impl Blake3Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentHasher for Blake3Hasher {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    fn sum(&self) -> Hash {
        Hash(*self.inner.finalize().as_bytes())
    }
}

/// Provider of [`Blake3Hasher`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Provider;

impl HashProvider for Blake3Provider {
    type Hasher = Blake3Hasher;

    fn new_hasher(&self) -> Blake3Hasher {
        Blake3Hasher::new()
    }
}
