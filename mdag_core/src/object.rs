//! DAG node format and encoding.
//!
//! Every node is an [`Object`]: an ordered list of [`Link`]s plus a data field.
//! A leaf (blob) has no links and carries raw file bytes in `data`. A list or tree
//! node carries one 4-byte ASCII tag per link in `data`, in link order:
//!
//! ```text
//! "blob"  child is stored as raw bytes
//! "link"  child is a chunk list
//! "tree"  child is a directory
//! ```
//!
//! Canonical encoding (little-endian integers):
//!
//! ```text
//! u32       link_count
//! per link:
//!   u32     name_len
//!   [u8]    name (UTF-8)
//!   [u8;32] hash
//!   u64     size
//! [u8]      data (rest of the buffer)
//! ```
//!
//! The empty object encodes to zero bytes, so an empty file stored raw and an empty
//! directory stored encoded share one key and one value.

use crate::error::{Error, Result};
use crate::hash::{HASH_SIZE, Hash};
use serde::Serialize;
use std::fmt;

/// Width of a type tag in bytes.
pub const TAG_SIZE: usize = 4;

/// How a child's stored bytes must be interpreted.
///
/// Doubles as the `kind` argument when persisting: blobs are stored as their raw data,
/// lists and trees as their encoded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// File content (a small file or one chunk).
    Blob,
    /// An intermediate chunk list. Tagged `link` on the wire.
    List,
    /// A directory.
    Tree,
}

impl NodeKind {
    /// Wire representation of this tag.
    pub fn tag(self) -> &'static [u8; TAG_SIZE] {
        match self {
            NodeKind::Blob => b"blob",
            NodeKind::List => b"link",
            NodeKind::Tree => b"tree",
        }
    }

    /// Wire representation as text, for listings.
    pub fn tag_str(self) -> &'static str {
        match self {
            NodeKind::Blob => "blob",
            NodeKind::List => "link",
            NodeKind::Tree => "tree",
        }
    }

    /// Parse a tag from its wire representation.
    pub fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"blob" => Ok(NodeKind::Blob),
            b"link" => Ok(NodeKind::List),
            b"tree" => Ok(NodeKind::Tree),
            _ => Err(Error::decode(format!(
                "Invalid type tag: {:?}",
                String::from_utf8_lossy(tag)
            ))),
        }
    }

    /// Get the string name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Blob => "blob",
            NodeKind::List => "list",
            NodeKind::Tree => "tree",
        }
    }

    /// Parse a kind from its name (`blob`, `list`/`link`, `tree`).
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(NodeKind::Blob),
            "list" | "link" => Ok(NodeKind::List),
            "tree" => Ok(NodeKind::Tree),
            _ => Err(Error::invalid_object_type("blob, list or tree", s)),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, sized reference from a parent node to a child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Entry name inside a directory; empty for chunk-list children.
    pub name: String,
    /// Content address of the child.
    pub hash: Hash,
    /// Bytes of file content reachable through this link.
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, hash: Hash, size: u64) -> Self {
        Self {
            name: name.into(),
            hash,
            size,
        }
    }

    /// A nameless link, as used for chunk-list children.
    pub fn chunk(hash: Hash, size: u64) -> Self {
        Self::new(String::new(), hash, size)
    }
}

/// A DAG node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    links: Vec<Link>,
    data: Vec<u8>,
}

impl Object {
    /// An empty list or tree, ready for [`push`](Self::push).
    pub fn new() -> Self {
        Self::default()
    }

    /// A leaf holding raw bytes.
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self {
            links: Vec::new(),
            data: data.into(),
        }
    }

    /// Append a child link together with the tag describing it.
    ///
    /// Must not be called on a leaf that already holds data.
    pub fn push(&mut self, link: Link, kind: NodeKind) {
        debug_assert_eq!(self.data.len(), TAG_SIZE * self.links.len());
        self.links.push(link);
        self.data.extend_from_slice(kind.tag());
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the object, returning its data field.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// True if the object has no children.
    pub fn is_leaf(&self) -> bool {
        self.links.is_empty()
    }

    /// Total content size reachable through this node's links.
    pub fn links_size(&self) -> u64 {
        self.links.iter().map(|l| l.size).sum()
    }

    /// The tag recorded for `links[index]`.
    pub fn tag_at(&self, index: usize) -> Result<NodeKind> {
        if index >= self.links.len() {
            return Err(Error::decode(format!(
                "Tag index {} out of range for {} links",
                index,
                self.links.len()
            )));
        }
        let start = index * TAG_SIZE;
        let tag = self.data.get(start..start + TAG_SIZE).ok_or_else(|| {
            Error::decode(format!("Tag table truncated at entry {}", index))
        })?;
        NodeKind::from_tag(tag)
    }

    /// Iterate over `(link, tag)` pairs in link order.
    pub fn entries(&self) -> impl Iterator<Item = Result<(&Link, NodeKind)>> + '_ {
        self.links
            .iter()
            .enumerate()
            .map(move |(i, link)| self.tag_at(i).map(|kind| (link, kind)))
    }

    /// Canonical serialization of the full object.
    pub fn encode(&self) -> Vec<u8> {
        if self.links.is_empty() && self.data.is_empty() {
            return Vec::new();
        }

        let names: usize = self.links.iter().map(|l| l.name.len()).sum();
        let mut buf =
            Vec::with_capacity(4 + self.links.len() * (4 + HASH_SIZE + 8) + names + self.data.len());

        // Link count (4 bytes)
        buf.extend_from_slice(&(self.links.len() as u32).to_le_bytes());

        for link in &self.links {
            buf.extend_from_slice(&(link.name.len() as u32).to_le_bytes());
            buf.extend_from_slice(link.name.as_bytes());
            buf.extend_from_slice(link.hash.as_bytes());
            buf.extend_from_slice(&link.size.to_le_bytes());
        }

        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode an object produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }

        let mut cursor = Cursor::new(bytes);
        let count = cursor.read_u32()? as usize;

        // Each link needs at least 44 bytes; reject absurd counts before allocating.
        let min_len = count.saturating_mul(4 + HASH_SIZE + 8);
        if min_len > cursor.remaining() {
            return Err(Error::decode(format!(
                "Link table truncated: {} links need at least {} bytes, {} left",
                count,
                min_len,
                cursor.remaining()
            )));
        }

        let mut links = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = cursor.read_u32()? as usize;
            let name = String::from_utf8(cursor.take(name_len)?.to_vec())
                .map_err(|e| Error::decode(format!("Invalid UTF-8 in link name: {}", e)))?;
            let hash = Hash::from_slice(cursor.take(HASH_SIZE)?)?;
            let size = cursor.read_u64()?;
            links.push(Link { name, hash, size });
        }

        let object = Self {
            links,
            data: cursor.rest().to_vec(),
        };
        if object.links.is_empty() && object.data.is_empty() {
            return Err(Error::decode("Empty object must be encoded as zero bytes"));
        }
        object.validate()?;
        Ok(object)
    }

    /// Check the tag table of a non-leaf object.
    pub fn validate(&self) -> Result<()> {
        if self.links.is_empty() {
            return Ok(());
        }
        if self.data.len() != TAG_SIZE * self.links.len() {
            return Err(Error::decode(format!(
                "Tag table length {} does not match {} links",
                self.data.len(),
                self.links.len()
            )));
        }
        for tag in self.data.chunks_exact(TAG_SIZE) {
            NodeKind::from_tag(tag)?;
        }
        Ok(())
    }
}

/// Bounds-checked reader over an encoded object.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::decode(format!(
                "Unexpected end of object: wanted {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Object {
        let mut obj = Object::new();
        obj.push(Link::new("a.txt", Hash::hash_bytes(b"a"), 1), NodeKind::Blob);
        obj.push(Link::new("big.bin", Hash::hash_bytes(b"big"), 1 << 20), NodeKind::List);
        obj.push(Link::new("sub", Hash::hash_bytes(b"sub"), 42), NodeKind::Tree);
        obj
    }

    #[test]
    fn test_tag_wire_bytes() {
        assert_eq!(NodeKind::Blob.tag(), b"blob");
        assert_eq!(NodeKind::List.tag(), b"link");
        assert_eq!(NodeKind::Tree.tag(), b"tree");

        assert_eq!(NodeKind::from_tag(b"link").unwrap(), NodeKind::List);
        assert!(NodeKind::from_tag(b"list").is_err());
        assert!(NodeKind::from_tag(b"blo").is_err());
    }

    #[test]
    fn test_push_keeps_tags_in_step() {
        let obj = sample_tree();
        assert_eq!(obj.links().len(), 3);
        assert_eq!(obj.data(), b"bloblinktree");
        assert_eq!(obj.tag_at(0).unwrap(), NodeKind::Blob);
        assert_eq!(obj.tag_at(1).unwrap(), NodeKind::List);
        assert_eq!(obj.tag_at(2).unwrap(), NodeKind::Tree);
    }

    #[test]
    fn test_tag_at_out_of_range() {
        let obj = sample_tree();
        assert!(matches!(obj.tag_at(3), Err(Error::Decode { .. })));
        assert!(Object::blob(b"data".to_vec()).tag_at(0).is_err());
    }

    #[test]
    fn test_encode_decode_tree() {
        let obj = sample_tree();
        let decoded = Object::decode(&obj.encode()).unwrap();
        assert_eq!(decoded, obj);
    }

    #[test]
    fn test_encode_decode_blob() {
        let obj = Object::blob(b"raw chunk bytes".to_vec());
        let encoded = obj.encode();
        assert_eq!(&encoded[..4], &0u32.to_le_bytes());
        assert_eq!(&encoded[4..], b"raw chunk bytes");
        assert_eq!(Object::decode(&encoded).unwrap(), obj);
    }

    #[test]
    fn test_empty_object_encodes_to_nothing() {
        assert!(Object::new().encode().is_empty());
        assert!(Object::blob(Vec::new()).encode().is_empty());
        assert_eq!(Object::decode(&[]).unwrap(), Object::new());
    }

    #[test]
    fn test_decode_rejects_padded_empty_object() {
        let err = Object::decode(&[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));

        // A leaf with data still carries the zero count.
        let blob = Object::blob(b"x".to_vec());
        assert_eq!(Object::decode(&blob.encode()).unwrap(), blob);
    }

    #[test]
    fn test_tag_str_matches_wire_bytes() {
        for kind in [NodeKind::Blob, NodeKind::List, NodeKind::Tree] {
            assert_eq!(kind.tag_str().as_bytes(), kind.tag());
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(sample_tree().encode(), sample_tree().encode());
    }

    #[test]
    fn test_link_order_changes_encoding() {
        let mut reordered = Object::new();
        let original = sample_tree();
        for i in [1, 0, 2] {
            reordered.push(original.links()[i].clone(), original.tag_at(i).unwrap());
        }
        assert_ne!(reordered.encode(), original.encode());
    }

    #[test]
    fn test_decode_truncated_link_table() {
        let encoded = sample_tree().encode();
        assert!(Object::decode(&encoded[..10]).is_err());
        assert!(Object::decode(&encoded[..3]).is_err());

        // Claims a huge link count with nothing behind it
        let mut bogus = u32::MAX.to_le_bytes().to_vec();
        bogus.extend_from_slice(b"tree");
        assert!(matches!(Object::decode(&bogus), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_decode_wrong_tag_length() {
        let mut encoded = sample_tree().encode();
        encoded.pop();
        assert!(matches!(Object::decode(&encoded), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut encoded = sample_tree().encode();
        let len = encoded.len();
        encoded[len - 4..].copy_from_slice(b"xxxx");
        assert!(matches!(Object::decode(&encoded), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(NodeKind::parse("list").unwrap(), NodeKind::List);
        assert_eq!(NodeKind::parse("link").unwrap(), NodeKind::List);
        assert!(NodeKind::parse("dir").is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    fn arb_kind() -> impl Strategy<Value = NodeKind> {
        prop::sample::select(vec![NodeKind::Blob, NodeKind::List, NodeKind::Tree])
    }

    fn arb_object() -> impl Strategy<Value = Object> {
        prop::collection::vec(
            (
                "[a-zA-Z0-9._-]{0,32}",
                prop::array::uniform32(any::<u8>()),
                any::<u64>(),
                arb_kind(),
            ),
            1..16,
        )
        .prop_map(|entries| {
            let mut obj = Object::new();
            for (name, hash, size, kind) in entries {
                obj.push(Link::new(name, Hash::from_bytes(hash), size), kind);
            }
            obj
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Decoding recovers exactly what was encoded
        #[test]
        fn prop_object_roundtrip(obj in arb_object()) {
            let decoded = Object::decode(&obj.encode())?;
            prop_assert_eq!(decoded, obj);
        }

        /// Any strict prefix of a non-leaf encoding is rejected
        #[test]
        fn prop_truncation_rejected(obj in arb_object(), cut in any::<prop::sample::Index>()) {
            let encoded = obj.encode();
            let at = cut.index(encoded.len());
            prop_assert!(Object::decode(&encoded[..at]).is_err() || at == 0);
        }
    }
}
