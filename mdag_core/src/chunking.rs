//! Fixed-size chunking parameters and chunk-tree geometry.

use crate::error::{Error, Result};

/// Maximum bytes in one leaf chunk.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Maximum number of children of a chunk-list node.
pub const MAX_LINKS: usize = 4096;

/// Configuration for splitting large files.
///
/// Both values are part of the stored format: DAGs built with different settings
/// hash differently and do not deduplicate against each other. Only
/// [`ChunkerConfig::new`] and `Default` construct one, so `chunk_size >= 1` and
/// `max_links >= 2` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    max_links: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_links: MAX_LINKS,
        }
    }
}

impl ChunkerConfig {
    /// Create a config, rejecting values that cannot produce a finite tree.
    pub fn new(chunk_size: usize, max_links: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_config("chunk_size must be at least 1"));
        }
        if max_links < 2 {
            return Err(Error::invalid_config("max_links must be at least 2"));
        }
        Ok(Self {
            chunk_size,
            max_links,
        })
    }

    /// Files larger than this are split into chunks of at most this size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fan-out limit of every chunk-list node.
    pub fn max_links(&self) -> usize {
        self.max_links
    }

    /// Number of chunks a file of `size` bytes is split into.
    pub fn num_chunks(&self, size: u64) -> u64 {
        size.div_ceil(self.chunk_size as u64)
    }

    /// Smallest height `h >= 1` such that `max_links^h >= num_chunks`.
    pub fn tree_height(&self, num_chunks: u64) -> u32 {
        let fan_out = self.max_links as u64;
        let mut height = 1;
        let mut reach = fan_out;
        while reach < num_chunks {
            reach = reach.saturating_mul(fan_out);
            height += 1;
        }
        height
    }

    /// Bytes a subtree of the given height can hold (`max_links^height * chunk_size`).
    ///
    /// Height 0 is a single chunk. Saturates instead of overflowing.
    pub fn capacity(&self, height: u32) -> u64 {
        let fan_out = self.max_links as u64;
        (0..height).fold(self.chunk_size as u64, |cap, _| cap.saturating_mul(fan_out))
    }
}
