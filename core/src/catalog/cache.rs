//! Version-namespaced, on-disk machine cache.
//!
//! Layout under the configured cache directory:
//!
//! ```text
//! <cache_dir>/<authority version>/machines/<basename>.json
//! <cache_dir>/<authority version>/catalog_complete.json
//! ```
//!
//! The completion marker is written atomically, and only after every item
//! of a full listing has been persisted. Without it, per-item files are
//! treated as unreliable for enumeration and the next `iterate_all`
//! re-materializes from scratch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use marquee_shared::fs::{MAX_RECORD_BYTES, read_file_with_limit, write_atomic};
use marquee_shared::ids::{is_safe_path_component, sanitize_path_component};
use marquee_shared::Machine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::authority::Authority;
use crate::error::SyncError;

const MACHINES_DIR: &str = "machines";
const COMPLETE_MARKER: &str = "catalog_complete.json";
const ENTRY_EXTENSION: &str = "json";

/// Contents of the "catalog complete" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub version: String,
    pub machines: usize,
    pub malformed: usize,
    pub completed_at: String,
}

/// Machine catalog for one authority version, with its persistent cache.
pub struct MachineCatalog {
    authority: Box<dyn Authority>,
    version: String,
    root: PathBuf,
}

impl MachineCatalog {
    /// Query the authority version and bind the cache namespace for it.
    ///
    /// Fails with `ToolUnavailable` when the authority cannot be invoked.
    pub fn open(authority: Box<dyn Authority>, cache_dir: &Path) -> Result<Self, SyncError> {
        let version = authority.version()?;
        let root = cache_dir.join(sanitize_path_component(&version));
        debug!(version = %version, cache = %root.display(), "Opened machine catalog");
        Ok(Self {
            authority,
            version,
            root,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cache directory for this version.
    pub fn cache_root(&self) -> &Path {
        &self.root
    }

    /// Whether a full materialization finished for this version.
    pub fn is_complete(&self) -> bool {
        self.completion_marker().is_some()
    }

    pub fn completion_marker(&self) -> Option<CompletionMarker> {
        let bytes = read_file_with_limit(&self.marker_path(), MAX_RECORD_BYTES).ok()?;
        let marker: CompletionMarker = serde_json::from_slice(&bytes).ok()?;
        (marker.version == self.version).then_some(marker)
    }

    /// Look up one machine.
    ///
    /// Served from the cache when possible. Otherwise the authority is asked
    /// for just this machine and the answer is cached. A basename missing
    /// from a complete cache is `NotFound` without consulting the authority.
    pub fn get(&self, basename: &str) -> Result<Machine, SyncError> {
        if !is_safe_path_component(basename) {
            return Err(SyncError::not_found("machine", basename));
        }

        let path = self.entry_path(basename);
        match read_entry(&path) {
            Ok(Some(machine)) => return Ok(machine),
            Ok(None) => {
                if self.is_complete() {
                    return Err(SyncError::not_found("machine", basename));
                }
            }
            Err(e) => warn!("Ignoring unreadable cache entry {}: {}", path.display(), e),
        }

        let machine = self.authority.describe(basename)?;
        if let Err(e) = self.persist(&machine) {
            warn!("Failed to cache machine '{}': {}", basename, e);
        }
        Ok(machine)
    }

    /// Ask the authority whether a machine's content set is present.
    pub fn verify(&self, basename: &str) -> Result<bool, SyncError> {
        self.authority.verify(basename)
    }

    /// All machines of this version, in basename order.
    ///
    /// Materializes the catalog first if no completion marker exists. The
    /// returned iterator reads cache entries lazily and cannot be restarted.
    pub fn iterate_all(&self) -> Result<MachineIter, SyncError> {
        if !self.is_complete() {
            self.materialize()?;
        }

        let dir = self.root.join(MACHINES_DIR);
        let entries = fs::read_dir(&dir).map_err(|source| SyncError::CacheIo {
            path: dir.clone(),
            source,
        })?;

        let mut basenames: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .collect();
        basenames.sort();

        Ok(MachineIter {
            dir,
            basenames: basenames.into_iter(),
        })
    }

    /// Invoke the authority once in streaming mode and persist every machine.
    ///
    /// Returns the number of machines persisted.
    pub fn materialize(&self) -> Result<usize, SyncError> {
        info!(version = %self.version, "Materializing machine catalog");

        let marker_path = self.marker_path();
        remove_if_exists(&marker_path)?;

        let dir = self.root.join(MACHINES_DIR);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| SyncError::CacheIo {
                path: dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&dir).map_err(|source| SyncError::CacheIo {
            path: dir.clone(),
            source,
        })?;

        let mut persisted = 0usize;
        let stats = self.authority.stream_all(&mut |machine| {
            if !is_safe_path_component(&machine.basename) {
                warn!("Skipping machine with unusable basename '{}'", machine.basename);
                return Ok(());
            }
            self.persist(&machine)?;
            persisted += 1;
            Ok(())
        })?;

        let marker = CompletionMarker {
            version: self.version.clone(),
            machines: persisted,
            malformed: stats.malformed,
            completed_at: chrono::Utc::now().to_rfc3339(),
        };
        let bytes = serde_json::to_vec_pretty(&marker).map_err(|e| SyncError::CacheIo {
            path: marker_path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        write_atomic(&marker_path, &bytes).map_err(|source| SyncError::CacheIo {
            path: marker_path.clone(),
            source,
        })?;

        info!(
            version = %self.version,
            machines = persisted,
            malformed = stats.malformed,
            "Machine catalog complete"
        );
        Ok(persisted)
    }

    fn persist(&self, machine: &Machine) -> Result<(), SyncError> {
        let path = self.entry_path(&machine.basename);
        let bytes = serde_json::to_vec_pretty(machine).map_err(|e| SyncError::CacheIo {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        write_atomic(&path, &bytes).map_err(|source| SyncError::CacheIo { path, source })
    }

    fn entry_path(&self, basename: &str) -> PathBuf {
        self.root
            .join(MACHINES_DIR)
            .join(format!("{}.{}", basename, ENTRY_EXTENSION))
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(COMPLETE_MARKER)
    }
}

/// Lazy, finite iterator over cached machines.
///
/// Unreadable entries are logged and skipped.
pub struct MachineIter {
    dir: PathBuf,
    basenames: std::vec::IntoIter<String>,
}

impl Iterator for MachineIter {
    type Item = Machine;

    fn next(&mut self) -> Option<Machine> {
        for basename in self.basenames.by_ref() {
            let path = self.dir.join(format!("{}.{}", basename, ENTRY_EXTENSION));
            match read_entry(&path) {
                Ok(Some(machine)) => return Some(machine),
                Ok(None) => debug!("Cache entry vanished: {}", path.display()),
                Err(e) => warn!("Skipping unreadable cache entry {}: {}", path.display(), e),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.basenames.len()))
    }
}

fn read_entry(path: &Path) -> anyhow::Result<Option<Machine>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = read_file_with_limit(path, MAX_RECORD_BYTES)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn remove_if_exists(path: &Path) -> Result<(), SyncError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SyncError::CacheIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}
