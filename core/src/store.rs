//! Persisted launcher descriptors.
//!
//! One pretty-printed JSON record per descriptor:
//!
//! ```text
//! <store_dir>/<source_type>/<sha256(unique_id)>.json
//! ```
//!
//! Unique ids are opaque (paths, package ids) so the file name is a digest;
//! the record itself carries the full key. All keys are loaded once when the
//! store is opened, so `exists` never touches the disk.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use marquee_shared::fs::{MAX_RECORD_BYTES, read_file_with_limit, write_atomic};
use marquee_shared::ids::is_safe_path_component;
use marquee_shared::{LauncherDescriptor, LauncherKey};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::StoreError;

const RECORD_EXTENSION: &str = "json";

pub struct LauncherStore {
    root: PathBuf,
    records: BTreeMap<LauncherKey, PathBuf>,
}

impl LauncherStore {
    /// Open (creating if needed) the store rooted at `root` and index its keys.
    ///
    /// Unreadable or misplaced records are logged and left out of the index.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;

        let mut store = Self {
            root,
            records: BTreeMap::new(),
        };

        for entry in WalkDir::new(&store.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable store entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }

            match read_record(path) {
                Ok(descriptor) => {
                    let expected = store.record_path(descriptor.key());
                    if expected != path {
                        warn!(
                            "Ignoring misplaced launcher record {} (expected {})",
                            path.display(),
                            expected.display()
                        );
                        continue;
                    }
                    store.records.insert(descriptor.key().clone(), expected);
                }
                Err(e) => warn!("Ignoring launcher record: {}", e),
            }
        }

        info!(
            root = %store.root.display(),
            launchers = store.records.len(),
            "Opened launcher store"
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn exists(&self, source_type: &str, unique_id: &str) -> bool {
        self.contains(&LauncherKey::new(source_type, unique_id))
    }

    pub fn contains(&self, key: &LauncherKey) -> bool {
        self.records.contains_key(key)
    }

    /// All keys, sorted by `(source_type, unique_id)`.
    pub fn keys(&self) -> Vec<LauncherKey> {
        self.records.keys().cloned().collect()
    }

    pub fn get(&self, key: &LauncherKey) -> Result<Option<LauncherDescriptor>, StoreError> {
        match self.records.get(key) {
            Some(path) => read_record(path).map(Some),
            None => Ok(None),
        }
    }

    /// Every readable descriptor, sorted by key.
    ///
    /// A record that became unreadable since `open` is logged and skipped.
    pub fn enumerate(&self) -> Vec<LauncherDescriptor> {
        self.records
            .values()
            .filter_map(|path| match read_record(path) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!("Skipping launcher record: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Create or replace the record for `descriptor`.
    pub fn write(&mut self, descriptor: &LauncherDescriptor) -> Result<(), StoreError> {
        let source_type = descriptor.source_type();
        if !is_safe_path_component(source_type) {
            return Err(StoreError::InvalidSourceType(source_type.to_string()));
        }

        let path = self.record_path(descriptor.key());
        let mut bytes =
            serde_json::to_vec_pretty(descriptor).map_err(|source| StoreError::Record {
                path: path.clone(),
                source,
            })?;
        bytes.push(b'\n');
        write_atomic(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;

        debug!(key = %descriptor.key(), "Wrote launcher record");
        self.records.insert(descriptor.key().clone(), path);
        Ok(())
    }

    /// Delete one record. Returns `false` if the key was not stored.
    pub fn remove(&mut self, source_type: &str, unique_id: &str) -> Result<bool, StoreError> {
        let key = LauncherKey::new(source_type, unique_id);
        let Some(path) = self.records.get(&key) else {
            return Ok(false);
        };

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(path, e)),
        }

        debug!(key = %key, "Removed launcher record");
        self.records.remove(&key);
        Ok(true)
    }

    /// Delete every record, including ones that could not be indexed.
    ///
    /// Returns the number of indexed records removed.
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.records.len();
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;
            }
        }

        self.records.clear();
        info!(removed, "Cleared launcher store");
        Ok(removed)
    }

    fn record_path(&self, key: &LauncherKey) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.unique_id.as_bytes()));
        self.root
            .join(&key.source_type)
            .join(format!("{}.{}", digest, RECORD_EXTENSION))
    }
}

fn read_record(path: &Path) -> Result<LauncherDescriptor, StoreError> {
    let bytes = read_file_with_limit(path, MAX_RECORD_BYTES).map_err(|e| {
        StoreError::io(path, io::Error::other(e.to_string()))
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Record {
        path: path.to_path_buf(),
        source,
    })
}
