//! Hashing and dedup-aware writing of DAG nodes.

use crate::error::Result;
use crate::hash::{ContentHasher, Hash};
use crate::kv::KvStore;
use crate::object::{NodeKind, Object};
use tracing::{debug, trace};

/// Hash `object` and write it to `store` unless the key is already present.
///
/// The key is always the hash of the full encoded object. What gets written under it
/// depends on `kind`: a blob stores only its raw data, a list or tree stores the
/// encoded object. Readers rely on the parent's tag, never on the stored bytes, to
/// tell the two apart.
pub fn persist<S, H>(store: &S, hasher: &mut H, object: &Object, kind: NodeKind) -> Result<Hash>
where
    S: KvStore + ?Sized,
    H: ContentHasher + ?Sized,
{
    let bytes = object.encode();
    let hash = hasher.digest(&bytes);

    if store.has(&hash)? {
        trace!(%hash, %kind, "dedup hit");
        return Ok(hash);
    }

    let value = match kind {
        NodeKind::Blob => object.data(),
        NodeKind::List | NodeKind::Tree => &bytes,
    };
    store.put(&hash, value)?;
    debug!(%hash, %kind, bytes = value.len(), "persisted node");

    Ok(hash)
}
