//! Error types for mdag_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using mdag_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or reading a DAG.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a source file or touching the filesystem store.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The key-value store failed for a reason other than plain I/O.
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// Stored bytes are not a well-formed object.
    #[error("Decode error: {reason}")]
    Decode { reason: String },

    /// A key referenced by a link is absent from the store.
    #[error("Object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// A node was read as a kind it cannot be interpreted as.
    #[error("Invalid object type: expected {expected}, got {got}")]
    InvalidObjectType { expected: String, got: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Store is invalid or not initialized.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Invalid reference name or format.
    #[error("Invalid reference: {reason}")]
    InvalidRef { reason: String },

    /// Reference not found.
    #[error("Reference not found: {name}")]
    RefNotFound { name: String },

    /// A source tree node could not be turned into a DAG node.
    #[error("Invalid node {path}: {reason}")]
    InvalidNode { path: PathBuf, reason: String },

    /// Builder or store settings that cannot be used.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

impl Error {
    /// Create a Storage error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Error::Storage {
            reason: reason.into(),
        }
    }

    /// Create a Decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(hash: impl Into<String>) -> Self {
        Error::ObjectNotFound { hash: hash.into() }
    }

    /// Create an InvalidObjectType error.
    pub fn invalid_object_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::InvalidObjectType {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRef error.
    pub fn invalid_ref(reason: impl Into<String>) -> Self {
        Error::InvalidRef {
            reason: reason.into(),
        }
    }

    /// Create a RefNotFound error.
    pub fn ref_not_found(name: impl Into<String>) -> Self {
        Error::RefNotFound { name: name.into() }
    }

    /// Create an InvalidNode error.
    pub fn invalid_node(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidNode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Whether this error came from the byte store rather than from the data in it.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Storage { .. })
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        assert!(Error::storage("lock poisoned").is_storage());
        assert!(Error::from(std::io::Error::other("disk full")).is_storage());
        assert!(!Error::decode("truncated").is_storage());
        assert!(!Error::object_not_found("abcd").is_storage());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::invalid_object_type("blob or list", "tree");
        assert_eq!(
            err.to_string(),
            "Invalid object type: expected blob or list, got tree"
        );
        assert_eq!(
            Error::decode("bad tag").to_string(),
            "Decode error: bad tag"
        );
    }
}
