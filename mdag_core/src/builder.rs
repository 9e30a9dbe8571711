//! Turning source trees into persisted DAGs.
//!
//! Files up to one chunk become a single blob. Larger files become a height-bounded
//! chunk tree filled left to right: every list node holds at most `max_links` children,
//! each child covering at most the capacity of a subtree one level lower. A subtree
//! whose share of the file fits in one chunk is stored as a blob directly, so list
//! nodes above height 1 may still carry `blob` tags.
//!
//! Directories become tree objects whose links follow the child iterator order.

use crate::chunking::ChunkerConfig;
use crate::error::Result;
use crate::hash::{ContentHasher, Hash};
use crate::kv::KvStore;
use crate::object::{Link, NodeKind, Object};
use crate::persist::persist;
use crate::walk::{DirNode, FileNode, Node};
use serde::Serialize;
use std::io::Read;
use tracing::debug;

/// Result of adding one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Added {
    /// Key of the persisted root.
    pub hash: Hash,
    /// How the root is stored; needed to read a file root back.
    pub kind: NodeKind,
    /// Bytes of file content under the root.
    pub size: u64,
}

/// Builds DAGs into a store with a caller-owned hasher.
pub struct DagBuilder<'a, S: KvStore + ?Sized, H: ContentHasher + ?Sized> {
    store: &'a S,
    hasher: &'a mut H,
    config: ChunkerConfig,
}

impl<'a, S: KvStore + ?Sized, H: ContentHasher + ?Sized> DagBuilder<'a, S, H> {
    /// A builder using the default chunk size and fan-out.
    pub fn new(store: &'a S, hasher: &'a mut H) -> Self {
        Self::with_config(store, hasher, ChunkerConfig::default())
    }

    pub fn with_config(store: &'a S, hasher: &'a mut H, config: ChunkerConfig) -> Self {
        Self {
            store,
            hasher,
            config,
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Persist `node` and everything below it, returning the root hash.
    pub fn add(&mut self, node: Node) -> Result<Hash> {
        self.add_node(node).map(|added| added.hash)
    }

    /// Persist `node` and everything below it.
    pub fn add_node(&mut self, node: Node) -> Result<Added> {
        match node {
            Node::File(file) => self.add_file(&file),
            Node::Dir(dir) => self.add_dir(dir),
        }
    }

    fn add_file(&mut self, file: &FileNode) -> Result<Added> {
        let size = file.size();
        let mut reader = file.open()?;

        let added = if size <= self.config.chunk_size() as u64 {
            self.build_subtree(&mut reader, 0, size)?
        } else {
            let height = self.config.tree_height(self.config.num_chunks(size));
            self.build_subtree(&mut reader, height, size)?
        };

        debug!(name = file.name(), hash = %added.hash, kind = %added.kind, size, "added file");
        Ok(added)
    }

    /// Build the subtree holding the next `remaining` bytes of `reader`.
    ///
    /// `remaining` must not exceed `capacity(height)`.
    fn build_subtree(
        &mut self,
        reader: &mut dyn Read,
        height: u32,
        remaining: u64,
    ) -> Result<Added> {
        if height == 0 || remaining <= self.config.chunk_size() as u64 {
            let mut data = vec![0u8; remaining as usize];
            reader.read_exact(&mut data)?;
            let blob = Object::blob(data);
            let hash = persist(self.store, &mut *self.hasher, &blob, NodeKind::Blob)?;
            return Ok(Added {
                hash,
                kind: NodeKind::Blob,
                size: remaining,
            });
        }

        let child_capacity = self.config.capacity(height - 1);
        let mut list = Object::new();
        let mut consumed = 0u64;

        while consumed < remaining && list.links().len() < self.config.max_links() {
            let budget = child_capacity.min(remaining - consumed);
            let child = self.build_subtree(reader, height - 1, budget)?;
            list.push(Link::chunk(child.hash, child.size), child.kind);
            consumed += child.size;
        }

        let hash = persist(self.store, &mut *self.hasher, &list, NodeKind::List)?;
        Ok(Added {
            hash,
            kind: NodeKind::List,
            size: consumed,
        })
    }

    fn add_dir(&mut self, dir: DirNode) -> Result<Added> {
        let name = dir.name().to_string();
        let mut tree = Object::new();

        for child in dir.into_children() {
            let child = child?;
            let child_name = child.name().to_string();
            let added = self.add_node(child)?;
            tree.push(Link::new(child_name, added.hash, added.size), added.kind);
        }

        let size = tree.links_size();
        let hash = persist(self.store, &mut *self.hasher, &tree, NodeKind::Tree)?;
        debug!(%name, %hash, entries = tree.links().len(), size, "added directory");

        Ok(Added {
            hash,
            kind: NodeKind::Tree,
            size,
        })
    }
}

/// Persist `root` into `store` with the default chunking and return its hash.
pub fn add<S, H>(store: &S, root: Node, hasher: &mut H) -> Result<Hash>
where
    S: KvStore + ?Sized,
    H: ContentHasher + ?Sized,
{
    DagBuilder::new(store, hasher).add(root)
}
