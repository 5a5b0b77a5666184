//! Per-run sync summary.

use std::collections::BTreeMap;

use super::RunMode;
use crate::disambiguate::DisambiguationReport;

/// One item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub unique_id: String,
    pub reason: String,
}

/// Outcome of one source's add phase and removal sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub source_type: String,
    /// Candidates reported by the source.
    pub candidates: usize,
    /// Repeated candidate ids ignored after the first.
    pub duplicates: usize,
    pub added: usize,
    /// Already in the store; not derived again.
    pub already_present: usize,
    /// Derived but not playable on this system.
    pub skipped: usize,
    pub failed: Vec<ItemFailure>,
    pub removed: usize,
    pub remove_failures: Vec<ItemFailure>,
    /// Set when the source could not enumerate; its sweep is skipped.
    pub source_error: Option<String>,
}

impl SourceReport {
    pub fn new(source_type: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            ..Default::default()
        }
    }

    pub fn sweep_skipped(&self) -> bool {
        self.source_error.is_some()
    }

    pub fn has_problems(&self) -> bool {
        self.source_error.is_some() || !self.failed.is_empty() || !self.remove_failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: RunMode,
    /// Records deleted by a full resync before any source ran.
    pub cleared: usize,
    pub sources: Vec<SourceReport>,
    /// Descriptors left alone because no registered source owns them.
    pub untouched_foreign: BTreeMap<String, usize>,
    pub disambiguation: Option<DisambiguationReport>,
}

impl SyncReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            cleared: 0,
            sources: Vec::new(),
            untouched_foreign: BTreeMap::new(),
            disambiguation: None,
        }
    }

    pub fn source(&self, source_type: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source_type == source_type)
    }

    pub(crate) fn source_mut(&mut self, source_type: &str) -> Option<&mut SourceReport> {
        self.sources.iter_mut().find(|s| s.source_type == source_type)
    }

    pub fn total_added(&self) -> usize {
        self.sources.iter().map(|s| s.added).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.sources.iter().map(|s| s.removed).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources
            .iter()
            .map(|s| s.failed.len() + s.remove_failures.len())
            .sum()
    }
}
