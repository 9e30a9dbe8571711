//! Source trees to build a DAG from.
//!
//! A [`Node`] is either a file with a known size and a byte source, or a directory
//! with a forward-only iterator over its children. Children are produced lazily and
//! their order becomes link order in the resulting tree object.

use crate::builder::{Added, DagBuilder};
use crate::error::{Error, Result};
use crate::hash::HashProvider;
use crate::store::FsStore;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Lazy sequence of directory children.
pub type Children = Box<dyn Iterator<Item = Result<Node>>>;

/// A node of a source tree.
pub enum Node {
    File(FileNode),
    Dir(DirNode),
}

impl Node {
    /// An in-memory file.
    pub fn file(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Node::File(FileNode::from_bytes(name, bytes))
    }

    /// An in-memory directory with children in the given order.
    pub fn dir(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Dir(DirNode::new(name, children))
    }

    /// A file or directory on disk.
    ///
    /// Directory listings respect `.gitignore`, include hidden files and are sorted by
    /// file name so that the same tree always yields the same root hash.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if metadata.is_file() {
            Ok(Node::File(FileNode::from_path(name, path, metadata.len())))
        } else if metadata.is_dir() {
            Ok(Node::Dir(DirNode::from_path(name, path)))
        } else {
            Err(Error::invalid_node(path, "only regular files and directories are supported"))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File(f) => f.name(),
            Node::Dir(d) => d.name(),
        }
    }

    /// Total bytes under this node. Directories read from disk are measured on call.
    pub fn size(&self) -> Result<u64> {
        match self {
            Node::File(f) => Ok(f.size()),
            Node::Dir(d) => d.size(),
        }
    }
}

enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A file: a name, a declared size and somewhere to read the bytes from.
pub struct FileNode {
    name: String,
    size: u64,
    source: FileSource,
}

impl FileNode {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Bytes(bytes),
        }
    }

    /// A file read from `path` when the builder gets to it.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            source: FileSource::Path(path.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the content for reading.
    pub fn open(&self) -> Result<Box<dyn Read + '_>> {
        match &self.source {
            FileSource::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            FileSource::Path(path) => Ok(Box::new(fs::File::open(path)?)),
        }
    }
}

/// Bytes counted up front plus directories still to be measured.
#[derive(Default)]
struct DirSize {
    known: u64,
    on_disk: Vec<PathBuf>,
}

impl DirSize {
    fn add(&mut self, node: &Node) {
        match node {
            Node::File(f) => self.known += f.size(),
            Node::Dir(d) => {
                self.known += d.size.known;
                self.on_disk.extend(d.size.on_disk.iter().cloned());
            }
        }
    }

    fn total(&self) -> Result<u64> {
        let mut total = self.known;
        for path in &self.on_disk {
            total += dir_size(path)?;
        }
        Ok(total)
    }
}

/// A directory: a name, a size and its children.
pub struct DirNode {
    name: String,
    size: DirSize,
    children: Children,
}

impl DirNode {
    /// A directory over already-built children. Its size is the sum of theirs.
    pub fn new(name: impl Into<String>, children: Vec<Node>) -> Self {
        let mut size = DirSize::default();
        for child in &children {
            size.add(child);
        }
        Self {
            name: name.into(),
            size,
            children: Box::new(children.into_iter().map(Ok)),
        }
    }

    /// A directory with an arbitrary lazy child source.
    pub fn from_iter<I>(name: impl Into<String>, size: u64, children: I) -> Self
    where
        I: Iterator<Item = Result<Node>> + 'static,
    {
        Self {
            name: name.into(),
            size: DirSize {
                known: size,
                on_disk: Vec::new(),
            },
            children: Box::new(children),
        }
    }

    fn from_path(name: String, path: &Path) -> Self {
        let walker = ignore::WalkBuilder::new(path)
            .max_depth(Some(1)) // Only immediate children
            .hidden(false) // Include hidden files
            .git_ignore(true) // Respect .gitignore
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let children = walker
            .filter(|entry| !matches!(entry, Ok(e) if e.depth() == 0))
            .map(|entry| {
                let entry = entry?;
                let entry_path = entry.path();
                if entry_path.file_name().and_then(|n| n.to_str()).is_none() {
                    return Err(Error::invalid_node(entry_path, "file name is not valid UTF-8"));
                }
                Node::from_path(entry_path)
            });

        let mut node = Self::from_iter(name, 0, children);
        node.size.on_disk.push(path.to_path_buf());
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Result<u64> {
        self.size.total()
    }

    /// Consume the directory, yielding its children in order.
    pub fn into_children(self) -> Children {
        self.children
    }
}

/// Total size of the files under `path`, with the same ignore rules as the listing.
fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in ignore::WalkBuilder::new(path)
        .hidden(false)
        .git_ignore(true)
        .build()
    {
        let entry = entry?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

impl FsStore {
    /// Add a file or directory from disk, returning the root and how it is stored.
    pub fn add_path(&self, path: &Path) -> Result<Added> {
        if !path.exists() {
            return Err(Error::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Path does not exist: {}", path.display()),
                ),
            });
        }

        let node = Node::from_path(path)?;
        let mut hasher = self.algorithm().provider().new_hasher();
        DagBuilder::new(self, &mut hasher).add_node(node)
    }
}
