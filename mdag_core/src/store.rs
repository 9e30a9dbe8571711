//! Filesystem-backed key-value store.

use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::kv::KvStore;
use crate::record::{
    CompressionType, HEADER_SIZE, RecordHeader, compress_zstd, decompress_zstd,
};
use crate::refs::RefManager;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Compression threshold: values >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// A store that keeps every value in its own file under `objects/`.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    algorithm: Algorithm,
    compression: CompressionType,
}

impl FsStore {
    /// Initialize a new store at the given path.
    ///
    /// Creates the directory structure:
    /// - `objects/blake3-256/` for stored values
    /// - `refs/` for named references
    /// - `config` file with version, algorithm and compression
    pub fn init<P: AsRef<Path>>(
        root: P,
        algorithm: Algorithm,
        compression: CompressionType,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("objects").join(algorithm.as_str()))?;
        fs::create_dir_all(root.join("refs"))?;

        let config_content = format!(
            "version=1\nalgo={}\ncompression={}\n",
            algorithm.as_str(),
            compression.as_str()
        );
        fs::write(root.join("config"), config_content)?;

        Ok(Self {
            root,
            algorithm,
            compression,
        })
    }

    /// Open an existing store at the given path.
    ///
    /// Validates the store structure and reads the configuration.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_store(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_store(&root, "config file not found"));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let (algorithm, compression) = Self::parse_config(&root, &config_content)?;

        if !root.join("objects").join(algorithm.as_str()).exists() {
            return Err(Error::invalid_store(
                &root,
                "objects directory structure missing",
            ));
        }

        if !root.join("refs").exists() {
            return Err(Error::invalid_store(&root, "refs directory missing"));
        }

        Ok(Self {
            root,
            algorithm,
            compression,
        })
    }

    /// Parse the config file.
    ///
    /// `compression` is optional and defaults to zstd.
    fn parse_config(root: &Path, content: &str) -> Result<(Algorithm, CompressionType)> {
        let mut version = None;
        let mut algo = None;
        let mut compression = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    "compression" => compression = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_store(
                root,
                format!("Unsupported config version: {:?}", version),
            ));
        }

        let algo_str = algo.ok_or_else(|| Error::invalid_store(root, "Missing algo in config"))?;
        let compression = match compression {
            Some(value) => CompressionType::parse(value)?,
            None => CompressionType::Zstd,
        };

        Ok((Algorithm::parse(algo_str)?, compression))
    }

    /// Get the path of the file holding a key.
    ///
    /// Returns: `objects/{algorithm}/{prefix}/{suffix}`
    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        self.root
            .join("objects")
            .join(self.algorithm.as_str())
            .join(hash.prefix())
            .join(hash.suffix())
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the algorithm used by this store.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Get the compression applied to large values.
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Get the reference manager for this store.
    pub fn refs(&self) -> RefManager<'_> {
        RefManager::new(self)
    }

    /// Read and decode the record at `path`.
    fn read_record(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = fs::File::open(path)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)?;
        let header = RecordHeader::decode(&header_buf)?;

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;

        if payload.len() as u64 != header.payload_len {
            return Err(Error::storage(format!(
                "Payload length mismatch in {}: expected {}, got {}",
                path.display(),
                header.payload_len,
                payload.len()
            )));
        }

        match header.compression {
            CompressionType::None => Ok(payload),
            CompressionType::Zstd => decompress_zstd(&payload),
        }
    }

    /// Write a record atomically using tempfile.
    fn write_record_atomic(&self, path: &Path, value: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::storage(format!("No parent for {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let (payload, compression) = if self.compression == CompressionType::Zstd
            && value.len() >= COMPRESSION_THRESHOLD
        {
            (compress_zstd(value)?, CompressionType::Zstd)
        } else {
            (value.to_vec(), CompressionType::None)
        };
        let header = RecordHeader::new(compression, payload.len() as u64);

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&header.encode())?;
        temp_file.write_all(&payload)?;
        temp_file.flush()?;

        // A racing writer of the same key leaves identical content behind.
        temp_file.persist(path)?;

        Ok(())
    }
}

impl KvStore for FsStore {
    fn has(&self, key: &Hash) -> Result<bool> {
        Ok(self.object_path(key).try_exists()?)
    }

    fn get(&self, key: &Hash) -> Result<Vec<u8>> {
        let path = self.object_path(key);
        if !path.try_exists()? {
            return Err(Error::object_not_found(key.to_hex()));
        }
        self.read_record(&path)
    }

    fn put(&self, key: &Hash, value: &[u8]) -> Result<()> {
        let path = self.object_path(key);
        if path.try_exists()? {
            trace!(hash = %key, "value already on disk");
            return Ok(());
        }
        self.write_record_atomic(&path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_store(temp_dir: &TempDir) -> FsStore {
        FsStore::init(temp_dir.path(), Algorithm::Blake3, CompressionType::Zstd).unwrap()
    }

    #[test]
    fn test_store_init() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("store");

        let store = FsStore::init(&store_path, Algorithm::Blake3, CompressionType::Zstd).unwrap();
        assert_eq!(store.root(), store_path);
        assert_eq!(store.algorithm(), Algorithm::Blake3);

        assert!(store_path.join("objects/blake3-256").exists());
        assert!(store_path.join("refs").exists());

        let config = fs::read_to_string(store_path.join("config")).unwrap();
        assert!(config.contains("version=1"));
        assert!(config.contains("algo=blake3-256"));
        assert!(config.contains("compression=zstd"));
    }

    #[test]
    fn test_store_open() {
        let temp_dir = TempDir::new().unwrap();
        FsStore::init(temp_dir.path(), Algorithm::Blake3, CompressionType::None).unwrap();

        let store = FsStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.algorithm(), Algorithm::Blake3);
        assert_eq!(store.compression(), CompressionType::None);
    }

    #[test]
    fn test_store_open_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FsStore::open(temp_dir.path().join("nonexistent")).is_err());
    }

    #[test]
    fn test_store_open_invalid_no_config() {
        let temp_dir = TempDir::new().unwrap();
        let result = FsStore::open(temp_dir.path());
        assert!(matches!(result, Err(Error::InvalidStore { .. })));
    }

    #[test]
    fn test_parse_config() {
        let root = Path::new("/tmp/store");
        let config = "# Comment\nversion=1\nalgo=blake3-256\n";
        let (algo, compression) = FsStore::parse_config(root, config).unwrap();
        assert_eq!(algo, Algorithm::Blake3);
        assert_eq!(compression, CompressionType::Zstd);

        let config = "version=1\nalgo=blake3-256\ncompression=none\nextra=ignored\n";
        let (_, compression) = FsStore::parse_config(root, config).unwrap();
        assert_eq!(compression, CompressionType::None);
    }

    #[test]
    fn test_parse_config_invalid() {
        let root = Path::new("/tmp/store");
        assert!(FsStore::parse_config(root, "version=99\nalgo=blake3-256\n").is_err());
        assert!(FsStore::parse_config(root, "version=1\n").is_err());
        assert!(FsStore::parse_config(root, "version=1\nalgo=sha1\n").is_err());
        assert!(FsStore::parse_config(root, "version=1\nalgo=blake3-256\ncompression=lz4\n").is_err());
    }

    #[test]
    fn test_object_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let hash = Hash::hash_bytes(b"test");
        let path = store.object_path(&hash);
        assert!(path.ends_with(format!("objects/blake3-256/{}/{}", hash.prefix(), hash.suffix())));
    }

    #[test]
    fn test_put_get_small_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = Hash::hash_bytes(b"hello");

        assert!(!store.has(&key).unwrap());
        store.put(&key, b"hello").unwrap();
        assert!(store.has(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), b"hello");

        let on_disk = fs::read(store.object_path(&key)).unwrap();
        let header = RecordHeader::decode(&on_disk).unwrap();
        assert_eq!(header.compression, CompressionType::None);
    }

    #[test]
    fn test_large_values_are_compressed() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let value = vec![0xAB; 64 * 1024];
        let key = Hash::hash_bytes(&value);

        store.put(&key, &value).unwrap();

        let on_disk = fs::read(store.object_path(&key)).unwrap();
        let header = RecordHeader::decode(&on_disk).unwrap();
        assert_eq!(header.compression, CompressionType::Zstd);
        assert!(on_disk.len() < value.len());
        assert_eq!(store.get(&key).unwrap(), value);
    }

    #[test]
    fn test_compression_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let store =
            FsStore::init(temp_dir.path(), Algorithm::Blake3, CompressionType::None).unwrap();
        let value = vec![0xAB; 64 * 1024];
        let key = Hash::hash_bytes(&value);

        store.put(&key, &value).unwrap();
        let on_disk = fs::read(store.object_path(&key)).unwrap();
        assert_eq!(on_disk.len(), HEADER_SIZE + value.len());
    }

    #[test]
    fn test_put_existing_key_keeps_first_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = Hash::hash_bytes(b"first");

        store.put(&key, b"first").unwrap();
        store.put(&key, b"second").unwrap();
        assert_eq!(store.get(&key).unwrap(), b"first");
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let result = store.get(&Hash::hash_bytes(b"nonexistent"));
        assert!(matches!(result, Err(Error::ObjectNotFound { .. })));
    }

    #[test]
    fn test_truncated_record_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = Hash::hash_bytes(b"data");
        store.put(&key, b"some data").unwrap();

        let path = store.object_path(&key);
        let mut on_disk = fs::read(&path).unwrap();
        on_disk.truncate(on_disk.len() - 2);
        fs::write(&path, on_disk).unwrap();

        let err = store.get(&key).unwrap_err();
        assert!(err.is_storage());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_shard_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = Hash::hash_bytes(b"data");

        let shard = store.object_path(&key).parent().unwrap().to_path_buf();
        fs::create_dir_all(shard.parent().unwrap()).unwrap();
        fs::write(&shard, b"not a directory").unwrap();

        assert!(store.has(&key).unwrap_err().is_storage());
        assert!(store.get(&key).unwrap_err().is_storage());
        assert!(store.put(&key, b"value").unwrap_err().is_storage());
    }

    #[test]
    fn test_empty_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = Hash::hash_bytes(b"");
        store.put(&key, b"").unwrap();
        assert!(store.get(&key).unwrap().is_empty());
    }
}
