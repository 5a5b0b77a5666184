//! Content sources
//!
//! A source reports candidate identities, derives launcher descriptors for
//! the ones the store has not seen, and answers liveness queries during the
//! removal sweep. Sources are selected by `source_type` through a
//! [`SourceRegistry`].

mod arcade;
mod installed;
mod rom_dir;
pub mod tags;

pub use arcade::{ARCADE_SOURCE_TYPE, ArcadeSource};
pub use installed::{InstalledPackage, InstalledSource, PackageManifest};
pub use rom_dir::RomDirSource;

use anyhow::bail;
use marquee_shared::{Facts, LauncherDescriptor};

use crate::error::SyncError;

/// One identity reported by a source, with whatever facts were cheap to get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub unique_id: String,
    pub facts: Facts,
}

impl Candidate {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            facts: Facts::new(),
        }
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }
}

/// Capability interface implemented once per kind of content source.
pub trait ContentSource {
    /// Key namespace of every descriptor this source owns.
    fn source_type(&self) -> &str;

    /// Every identity currently offered, in a stable order.
    fn iterate_candidates(&mut self) -> Result<Vec<Candidate>, SyncError>;

    /// Derive a descriptor for a new identity.
    ///
    /// This is the expensive path (file reads, catalog lookups, external tool
    /// calls). `Ok(None)` means the item exists but is not playable here.
    fn describe(&mut self, candidate: &Candidate)
    -> Result<Option<LauncherDescriptor>, SyncError>;

    /// Whether `unique_id` still resolves to something live.
    fn is_live(&mut self, unique_id: &str) -> Result<bool, SyncError>;
}

/// Registry of content sources, keyed by `source_type`.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn ContentSource>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. Source types must be unique.
    pub fn register(&mut self, source: Box<dyn ContentSource>) -> anyhow::Result<()> {
        if self.contains(source.source_type()) {
            bail!("Source type '{}' registered twice", source.source_type());
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn contains(&self, source_type: &str) -> bool {
        self.sources.iter().any(|s| s.source_type() == source_type)
    }

    /// Find a source by type.
    pub fn get_mut(&mut self, source_type: &str) -> Option<&mut Box<dyn ContentSource>> {
        self.sources
            .iter_mut()
            .find(|s| s.source_type() == source_type)
    }

    /// Registered source types, in registration order.
    pub fn source_types(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.source_type().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ContentSource for Named {
        fn source_type(&self) -> &str {
            self.0
        }
        fn iterate_candidates(&mut self) -> Result<Vec<Candidate>, SyncError> {
            Ok(vec![Candidate::new("only")])
        }
        fn describe(
            &mut self,
            _candidate: &Candidate,
        ) -> Result<Option<LauncherDescriptor>, SyncError> {
            Ok(None)
        }
        fn is_live(&mut self, _unique_id: &str) -> Result<bool, SyncError> {
            Ok(true)
        }
    }

    #[test]
    fn test_registry_lookup_by_type() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Named("arcade"))).unwrap();
        registry.register(Box::new(Named("snes"))).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.source_types(), vec!["arcade", "snes"]);
        assert!(registry.get_mut("snes").is_some());
        assert!(registry.get_mut("nes").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicate_type() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Named("snes"))).unwrap();
        assert!(registry.register(Box::new(Named("snes"))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_candidate_builder() {
        let candidate = Candidate::new("a.nes").with_fact("filename", "a.nes");
        assert_eq!(candidate.facts.get("filename").map(String::as_str), Some("a.nes"));
    }
}
