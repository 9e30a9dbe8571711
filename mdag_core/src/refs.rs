//! Named references to DAG roots.
//!
//! A ref file under `refs/` is an append-only log of `<hash> <kind>` lines; the last
//! well-formed line is the current value. Recording the kind lets a file root be read
//! back without guessing how its value was stored.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::NodeKind;
use crate::store::FsStore;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// The value of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RootRef {
    pub hash: Hash,
    pub kind: NodeKind,
}

impl RootRef {
    pub fn new(hash: Hash, kind: NodeKind) -> Self {
        Self { hash, kind }
    }

    fn to_line(self) -> String {
        format!("{} {}\n", self.hash.to_hex(), self.kind.as_str())
    }

    /// Parse a ref line. A bare hash is read as a tree root.
    fn from_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let hash = Hash::from_hex(parts.next().unwrap_or_default())?;
        let kind = match parts.next() {
            Some(kind) => NodeKind::parse(kind)?,
            None => NodeKind::Tree,
        };
        Ok(Self { hash, kind })
    }
}

/// Manages named references in the store.
pub struct RefManager<'a> {
    store: &'a FsStore,
}

impl<'a> RefManager<'a> {
    pub(crate) fn new(store: &'a FsStore) -> Self {
        Self { store }
    }

    /// Get the path to a reference file.
    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        // Validate name - no path traversal
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(Error::invalid_ref(format!(
                "Invalid ref name: {} (must not contain .. or path separators)",
                name
            )));
        }

        if name.is_empty() {
            return Err(Error::invalid_ref("Ref name cannot be empty"));
        }

        Ok(self.store.root().join("refs").join(name))
    }

    /// Point `name` at a root, keeping earlier values in the ref's history.
    pub fn set(&self, name: &str, root: RootRef) -> Result<()> {
        let path = self.ref_path(name)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(root.to_line().as_bytes())?;

        Ok(())
    }

    /// Get the current value of a reference.
    ///
    /// Blank lines, `#` comments and malformed lines are skipped.
    pub fn get(&self, name: &str) -> Result<Option<RootRef>> {
        let path = self.ref_path(name)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| RootRef::from_line(line).ok())
            .last())
    }

    /// List all references, sorted by name.
    pub fn list(&self) -> Result<Vec<(String, RootRef)>> {
        let refs_dir = self.store.root().join("refs");
        let mut refs = Vec::new();

        if !refs_dir.exists() {
            return Ok(refs);
        }

        for entry in fs::read_dir(&refs_dir)? {
            let path = entry?.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
                && let Some(root) = self.get(name)?
            {
                refs.push((name.to_string(), root));
            }
        }

        refs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(refs)
    }

    /// Remove a reference.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.ref_path(name)?;

        if !path.exists() {
            return Err(Error::ref_not_found(name));
        }

        fs::remove_file(&path)?;
        Ok(())
    }

    /// Interpret `spec` as a 64-character hex hash (a tree root) or a ref name.
    pub fn lookup(&self, spec: &str) -> Result<RootRef> {
        if let Ok(hash) = Hash::from_hex(spec) {
            return Ok(RootRef::new(hash, NodeKind::Tree));
        }
        self.get(spec)?.ok_or_else(|| Error::ref_not_found(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use crate::record::CompressionType;
    use tempfile::TempDir;

    fn init_store(temp_dir: &TempDir) -> FsStore {
        FsStore::init(temp_dir.path(), Algorithm::Blake3, CompressionType::Zstd).unwrap()
    }

    #[test]
    fn test_ref_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();

        let root = RootRef::new(Hash::hash_bytes(b"test"), NodeKind::List);
        refs.set("myref", root).unwrap();

        assert_eq!(refs.get("myref").unwrap(), Some(root));
    }

    #[test]
    fn test_ref_get_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        assert_eq!(store.refs().get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_ref_update_keeps_last() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();

        let first = RootRef::new(Hash::hash_bytes(b"test1"), NodeKind::Tree);
        let second = RootRef::new(Hash::hash_bytes(b"test2"), NodeKind::Blob);
        refs.set("myref", first).unwrap();
        refs.set("myref", second).unwrap();

        assert_eq!(refs.get("myref").unwrap(), Some(second));
    }

    #[test]
    fn test_ref_bare_hash_line_is_tree() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let hash = Hash::hash_bytes(b"legacy");

        let content = format!("# written by hand\n{}\n\nnot-a-hash\n", hash.to_hex());
        fs::write(temp_dir.path().join("refs/handmade"), content).unwrap();

        let root = store.refs().get("handmade").unwrap().unwrap();
        assert_eq!(root, RootRef::new(hash, NodeKind::Tree));
    }

    #[test]
    fn test_ref_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();

        let root1 = RootRef::new(Hash::hash_bytes(b"test1"), NodeKind::Tree);
        let root2 = RootRef::new(Hash::hash_bytes(b"test2"), NodeKind::Blob);
        refs.set("ref2", root2).unwrap();
        refs.set("ref1", root1).unwrap();

        let list = refs.list().unwrap();
        assert_eq!(list, vec![("ref1".to_string(), root1), ("ref2".to_string(), root2)]);
    }

    #[test]
    fn test_ref_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();

        refs.set("myref", RootRef::new(Hash::hash_bytes(b"test"), NodeKind::Tree))
            .unwrap();
        refs.remove("myref").unwrap();

        assert_eq!(refs.get("myref").unwrap(), None);
        assert!(matches!(refs.remove("myref"), Err(Error::RefNotFound { .. })));
    }

    #[test]
    fn test_ref_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();
        let root = RootRef::new(Hash::hash_bytes(b"test"), NodeKind::Tree);

        assert!(refs.set("../etc/passwd", root).is_err());
        assert!(refs.set("foo/bar", root).is_err());
        assert!(refs.set("", root).is_err());
    }

    #[test]
    fn test_lookup_hash_or_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let refs = store.refs();

        let hash = Hash::hash_bytes(b"root");
        assert_eq!(
            refs.lookup(&hash.to_hex()).unwrap(),
            RootRef::new(hash, NodeKind::Tree)
        );

        let file_root = RootRef::new(Hash::hash_bytes(b"file"), NodeKind::Blob);
        refs.set("notes", file_root).unwrap();
        assert_eq!(refs.lookup("notes").unwrap(), file_root);

        assert!(matches!(refs.lookup("missing"), Err(Error::RefNotFound { .. })));
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            max_shrink_iters: 1000,
            ..ProptestConfig::default()
        })]

        /// Valid ref names are accepted and read back
        #[test]
        fn prop_valid_ref_names_accepted(name in "[a-zA-Z0-9_-]{1,50}") {
            let temp_dir = TempDir::new().unwrap();
            let store = FsStore::init(temp_dir.path(), Algorithm::Blake3, CompressionType::None)?;
            let refs = store.refs();
            let root = RootRef::new(Hash::hash_bytes(b"test data"), NodeKind::List);

            prop_assert!(refs.set(&name, root).is_ok(), "Valid ref name '{}' should be accepted", name);
            prop_assert_eq!(refs.get(&name)?, Some(root));
        }
    }
}
