//! Error taxonomy for the sync engine.
//!
//! Every variant is scoped: an error local to one item or one source is
//! caught and logged at that scope, never allowed to abort a whole run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The catalog authority is not installed or not invocable.
    /// Disables the affected source for this run.
    #[error("catalog authority unavailable: {0}")]
    ToolUnavailable(String),

    /// Single-item lookup miss.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Malformed entry inside a catalog listing or file.
    #[error("malformed catalog entry in {origin}: {message}")]
    CatalogParse { origin: String, message: String },

    /// An ancestry walk revisited a basename.
    #[error("ancestry cycle at '{basename}': {}", chain.join(" -> "))]
    CycleDetected { basename: String, chain: Vec<String> },

    /// A single launcher store call failed.
    #[error("launcher store: {0}")]
    StoreIo(#[from] StoreError),

    /// Machine cache I/O failure.
    #[error("machine cache I/O error on {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A content source failed to enumerate or derive an item.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl SyncError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SyncError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid launcher record {}: {source}", path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("source type '{0}' is not usable as a store directory name")]
    InvalidSourceType(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = SyncError::CycleDetected {
            basename: "a".to_string(),
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "ancestry cycle at 'a': a -> b -> a");
    }

    #[test]
    fn test_not_found_helper() {
        let err = SyncError::not_found("machine", "pacman");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "machine 'pacman' not found");
    }

    #[test]
    fn test_store_error_converts() {
        let err: SyncError = StoreError::InvalidSourceType("a/b".to_string()).into();
        assert!(matches!(err, SyncError::StoreIo(_)));
    }
}
