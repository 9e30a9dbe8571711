//! # mdag core
//!
//! A content-addressed Merkle DAG over a key-value byte store.
//!
//! Files and directories are turned into a graph of [`Object`]s keyed by the hash of
//! their canonical encoding. Small files are single blobs, large files are split into
//! fixed-size chunks under a bounded-fan-out chunk tree, and directories are tree
//! objects linking to their entries by name.
//!
//! ## Features
//!
//! - Deterministic hashing: the same content always yields the same root
//! - Deduplication: a node already in the store is never written twice
//! - Pluggable stores ([`KvStore`]) with an in-memory and a filesystem implementation
//! - Path resolution and directory listing from a root hash
//! - Named references to roots
//!
//! ## Example
//!
//! ```no_run
//! use mdag_core::{Algorithm, CompressionType, FsStore, RootRef, resolve};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Initialize a new store
//! let store = FsStore::init("./my-store", Algorithm::Blake3, CompressionType::Zstd)?;
//!
//! // Add a directory
//! let added = store.add_path(Path::new("./my-data"))?;
//!
//! // Remember the root under a name
//! store.refs().set("backup", RootRef::new(added.hash, added.kind))?;
//!
//! // Read one file back
//! if let Some(bytes) = resolve(&store, &added.hash, "docs/readme.md")? {
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod chunking;
mod error;
mod hash;
mod kv;
mod object;
mod persist;
mod reader;
mod record;
mod refs;
mod store;
mod walk;

pub use builder::{Added, DagBuilder, add};
pub use chunking::{CHUNK_SIZE, ChunkerConfig, MAX_LINKS};
pub use error::{Error, Result};
pub use hash::{
    Algorithm, Blake3Hasher, Blake3Provider, ContentHasher, HASH_SIZE, Hash, HashProvider,
};
pub use kv::{KvStore, MemoryStore};
pub use object::{Link, NodeKind, Object, TAG_SIZE};
pub use persist::persist;
pub use reader::{DagReader, Entry, list, read_file, resolve};
pub use record::CompressionType;
pub use refs::{RefManager, RootRef};
pub use store::FsStore;
pub use walk::{Children, DirNode, FileNode, Node};
