//! Checksum and serial index over merged software catalogs.
//!
//! For a list `L`, each catalog directory contributes `L.json` followed by
//! any `L.*.json` files in name order; directories are read in the order
//! given. Later files overwrite earlier ones on name, checksum or serial
//! collisions. Parent fields are merged once, at build time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use marquee_shared::fs::{MAX_RECORD_BYTES, read_file_with_limit};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::entry::SoftwareEntry;
use crate::error::SyncError;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    software: Vec<Value>,
}

/// Lookup index built from one or more software lists.
#[derive(Debug, Default)]
pub struct SoftwareIndex {
    by_checksum: HashMap<String, Arc<SoftwareEntry>>,
    by_serial: HashMap<String, Arc<SoftwareEntry>>,
    entries: usize,
    parse_errors: usize,
}

impl SoftwareIndex {
    /// An index that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index for `list_names` from catalog files under `dirs`.
    ///
    /// Malformed files and entries are logged, counted and skipped.
    pub fn build(dirs: &[PathBuf], list_names: &[String]) -> Self {
        let mut index = Self::default();

        for list in list_names {
            let files = catalog_files(dirs, list);
            if files.is_empty() {
                warn!("No catalog files found for software list '{}'", list);
                continue;
            }

            let mut merged = Merged::default();
            for file in &files {
                index.parse_errors += load_file(file, list, &mut merged);
            }
            index.parse_errors += apply_parents(list, &mut merged.entries);

            // Load order decides who owns each checksum and serial.
            let Merged { mut entries, order, .. } = merged;
            let mut by_load: Vec<(usize, String)> =
                order.into_iter().map(|(name, seq)| (seq, name)).collect();
            by_load.sort_unstable();
            for (_, name) in by_load {
                if let Some(entry) = entries.remove(&name) {
                    index.insert(entry);
                }
            }
        }

        info!(
            lists = list_names.len(),
            entries = index.entries,
            parse_errors = index.parse_errors,
            "Software catalog index built"
        );
        index
    }

    fn insert(&mut self, entry: SoftwareEntry) {
        let entry = Arc::new(entry);
        for checksum in &entry.checksums {
            let key = normalize_checksum(checksum);
            if !key.is_empty() {
                self.by_checksum.insert(key, Arc::clone(&entry));
            }
        }
        for serial in &entry.serials {
            let key = normalize_serial(serial);
            if !key.is_empty() {
                self.by_serial.insert(key, Arc::clone(&entry));
            }
        }
        self.entries += 1;
    }

    /// Look up by checksum first, then by serial.
    pub fn lookup(&self, checksum_or_serial: &str) -> Option<&SoftwareEntry> {
        self.lookup_checksum(checksum_or_serial)
            .or_else(|| self.lookup_serial(checksum_or_serial))
    }

    pub fn lookup_checksum(&self, checksum: &str) -> Option<&SoftwareEntry> {
        self.by_checksum
            .get(&normalize_checksum(checksum))
            .map(Arc::as_ref)
    }

    pub fn lookup_serial(&self, serial: &str) -> Option<&SoftwareEntry> {
        self.by_serial
            .get(&normalize_serial(serial))
            .map(Arc::as_ref)
    }

    /// Entries indexed (after name merging).
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Malformed files, entries and parent cycles skipped while building.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }
}

fn normalize_checksum(checksum: &str) -> String {
    checksum.trim().to_ascii_lowercase()
}

fn normalize_serial(serial: &str) -> String {
    serial.trim().to_ascii_uppercase()
}

/// Entries of one list merged across its catalog files.
#[derive(Debug, Default)]
struct Merged {
    entries: BTreeMap<String, SoftwareEntry>,
    /// Load sequence of the entry currently held under each name.
    order: BTreeMap<String, usize>,
    next_seq: usize,
}

impl Merged {
    fn insert(&mut self, entry: SoftwareEntry) {
        self.order.insert(entry.name.clone(), self.next_seq);
        self.next_seq += 1;
        self.entries.insert(entry.name.clone(), entry);
    }
}

/// Catalog files for one list, in merge order.
fn catalog_files(dirs: &[PathBuf], list: &str) -> Vec<PathBuf> {
    let primary = format!("{}.json", list);
    let prefix = format!("{}.", list);
    let mut files = Vec::new();

    for dir in dirs {
        let Ok(entries) = fs::read_dir(dir) else {
            debug!("Software list directory unreadable: {}", dir.display());
            continue;
        };

        let mut supplements: Vec<PathBuf> = Vec::new();
        let mut has_primary = false;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !name.ends_with(".json") {
                continue;
            }
            if name == primary {
                has_primary = true;
            } else if name.starts_with(&prefix) {
                supplements.push(path);
            }
        }
        supplements.sort();

        if has_primary {
            files.push(dir.join(&primary));
        }
        files.extend(supplements);
    }

    files
}

/// Merge one catalog file into `entries`. Returns the number of parse errors.
fn load_file(path: &Path, list: &str, merged: &mut Merged) -> usize {
    let parsed = read_file_with_limit(path, MAX_RECORD_BYTES)
        .and_then(|bytes| Ok(serde_json::from_slice::<CatalogFile>(&bytes)?));
    let file = match parsed {
        Ok(file) => file,
        Err(e) => {
            let err = SyncError::CatalogParse {
                origin: path.display().to_string(),
                message: e.to_string(),
            };
            warn!("Skipping software catalog: {}", err);
            return 1;
        }
    };

    let mut errors = 0;
    for (position, raw) in file.software.into_iter().enumerate() {
        match serde_json::from_value::<SoftwareEntry>(raw) {
            Ok(mut entry) if !entry.name.trim().is_empty() => {
                entry.list_name = list.to_string();
                merged.insert(entry);
            }
            Ok(_) => {
                warn!(
                    "Skipping unnamed software entry #{} in {}",
                    position,
                    path.display()
                );
                errors += 1;
            }
            Err(e) => {
                let err = SyncError::CatalogParse {
                    origin: format!("{} entry #{}", path.display(), position),
                    message: e.to_string(),
                };
                warn!("Skipping software entry: {}", err);
                errors += 1;
            }
        }
    }
    errors
}

/// Resolve parent references. Returns the number of entries with cyclic parents.
fn apply_parents(list: &str, entries: &mut BTreeMap<String, SoftwareEntry>) -> usize {
    let originals = entries.clone();
    let mut cycles = 0;

    for (name, entry) in entries.iter_mut() {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(name.as_str());
        let mut ancestors: Vec<&SoftwareEntry> = Vec::new();
        let mut next = originals.get(name.as_str()).and_then(|e| e.parent.as_deref());
        let mut cyclic = false;

        while let Some(parent_name) = next {
            if !seen.insert(parent_name) {
                cyclic = true;
                break;
            }
            let Some(parent) = originals.get(parent_name) else {
                debug!("Software '{}' in '{}' names missing parent '{}'", name, list, parent_name);
                break;
            };
            ancestors.push(parent);
            next = parent.parent.as_deref();
        }

        if cyclic {
            warn!("Software '{}' in '{}' has a cyclic parent chain", name, list);
            cycles += 1;
            continue;
        }
        for ancestor in ancestors {
            entry.inherit_from(ancestor);
        }
    }

    cycles
}
