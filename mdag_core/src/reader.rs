//! Reading files and directories back out of a DAG.
//!
//! Path lookup scans a directory's links in order. A `tree` entry whose name matches
//! is descended into; if nothing is found below it the scan carries on with the next
//! entry, so the first match that leads somewhere wins. A `blob` or `link` entry that
//! matches ends the lookup, whatever segments remain.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kv::KvStore;
use crate::object::{NodeKind, Object};
use serde::Serialize;
use std::io::Write;
use tracing::trace;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    pub hash: Hash,
}

/// Read-only view of the DAGs in a store.
pub struct DagReader<'a, S: KvStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> DagReader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Contents of the file at `path` under the directory `root`.
    ///
    /// Returns `None` if `root` is not in the store, the path names no file, or the
    /// path ends at a directory.
    pub fn resolve(&self, root: &Hash, path: &str) -> Result<Option<Vec<u8>>> {
        match self.locate_file(root, path)? {
            Some((hash, kind)) => self.read_file(&hash, kind).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`resolve`](Self::resolve), but streams the content into `out`.
    ///
    /// Returns the number of bytes written, or `None` if nothing was found.
    pub fn resolve_to_writer<W: Write + ?Sized>(
        &self,
        root: &Hash,
        path: &str,
        out: &mut W,
    ) -> Result<Option<u64>> {
        match self.locate_file(root, path)? {
            Some((hash, kind)) => self.write_file(&hash, kind, out).map(Some),
            None => Ok(None),
        }
    }

    /// Read a file root stored as `kind`.
    pub fn read_file(&self, hash: &Hash, kind: NodeKind) -> Result<Vec<u8>> {
        match kind {
            NodeKind::Blob => self.store.get(hash),
            NodeKind::List => {
                let mut buf = Vec::new();
                self.write_chunks(hash, &mut buf)?;
                Ok(buf)
            }
            NodeKind::Tree => Err(Error::invalid_object_type("blob or list", "tree")),
        }
    }

    /// Write a file root stored as `kind` into `out`, one chunk at a time.
    pub fn write_file<W: Write + ?Sized>(
        &self,
        hash: &Hash,
        kind: NodeKind,
        out: &mut W,
    ) -> Result<u64> {
        match kind {
            NodeKind::Blob => {
                let data = self.store.get(hash)?;
                out.write_all(&data)?;
                Ok(data.len() as u64)
            }
            NodeKind::List => self.write_chunks(hash, out),
            NodeKind::Tree => Err(Error::invalid_object_type("blob or list", "tree")),
        }
    }

    /// Entries of the directory at `path` under `root`, in stored order.
    ///
    /// Returns `None` if `root` is absent or no directory lives at `path`.
    pub fn list(&self, root: &Hash, path: &str) -> Result<Option<Vec<Entry>>> {
        if !self.store.has(root)? {
            return Ok(None);
        }

        let segments = split_path(path);
        let Some(dir) = self.find_dir(root, &segments)? else {
            return Ok(None);
        };

        let tree = self.load(&dir)?;
        tree.entries()
            .map(|entry| {
                entry.map(|(link, kind)| Entry {
                    name: link.name.clone(),
                    kind,
                    size: link.size,
                    hash: link.hash,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn locate_file(&self, root: &Hash, path: &str) -> Result<Option<(Hash, NodeKind)>> {
        if !self.store.has(root)? {
            trace!(%root, "root not in store");
            return Ok(None);
        }
        self.find_file(root, &split_path(path))
    }

    fn find_file(&self, dir: &Hash, segments: &[&str]) -> Result<Option<(Hash, NodeKind)>> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };

        let tree = self.load(dir)?;
        for entry in tree.entries() {
            let (link, kind) = entry?;
            if link.name != *first {
                continue;
            }
            trace!(segment = *first, hash = %link.hash, %kind, "path segment matched");
            match kind {
                NodeKind::Tree => {
                    if let Some(found) = self.find_file(&link.hash, rest)? {
                        return Ok(Some(found));
                    }
                }
                NodeKind::Blob | NodeKind::List => return Ok(Some((link.hash, kind))),
            }
        }
        Ok(None)
    }

    fn find_dir(&self, dir: &Hash, segments: &[&str]) -> Result<Option<Hash>> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Some(*dir));
        };

        let tree = self.load(dir)?;
        for entry in tree.entries() {
            let (link, kind) = entry?;
            if kind == NodeKind::Tree
                && link.name == *first
                && let Some(found) = self.find_dir(&link.hash, rest)?
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Concatenate the chunks under a list node, in link order.
    fn write_chunks<W: Write + ?Sized>(&self, list: &Hash, out: &mut W) -> Result<u64> {
        let object = self.load(list)?;
        let mut written = 0;
        for entry in object.entries() {
            let (link, kind) = entry?;
            written += match kind {
                NodeKind::Blob => {
                    let chunk = self.store.get(&link.hash)?;
                    out.write_all(&chunk)?;
                    chunk.len() as u64
                }
                NodeKind::List => self.write_chunks(&link.hash, out)?,
                NodeKind::Tree => {
                    return Err(Error::decode(format!(
                        "Chunk list {} links to a tree",
                        list
                    )));
                }
            };
        }
        Ok(written)
    }

    fn load(&self, hash: &Hash) -> Result<Object> {
        Object::decode(&self.store.get(hash)?)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Contents of the file at `path` under the directory `root`.
pub fn resolve<S>(store: &S, root: &Hash, path: &str) -> Result<Option<Vec<u8>>>
where
    S: KvStore + ?Sized,
{
    DagReader::new(store).resolve(root, path)
}

/// Read a file root stored as `kind`.
pub fn read_file<S>(store: &S, hash: &Hash, kind: NodeKind) -> Result<Vec<u8>>
where
    S: KvStore + ?Sized,
{
    DagReader::new(store).read_file(hash, kind)
}

/// Entries of the directory at `path` under `root`.
pub fn list<S>(store: &S, root: &Hash, path: &str) -> Result<Option<Vec<Entry>>>
where
    S: KvStore + ?Sized,
{
    DagReader::new(store).list(root, path)
}
