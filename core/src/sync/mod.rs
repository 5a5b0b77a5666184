//! Sync engine
//!
//! One run moves through:
//!
//! ```text
//! Idle -> FullReset | SkipReset -> Adding(source)... -> SkipSweep | RemovalSweep
//!      -> [Disambiguating] -> Done
//! ```
//!
//! Incremental runs derive descriptors only for identities the store does
//! not already hold, then remove descriptors whose source no longer reports
//! them live. Failures are isolated to the item (or source) that caused
//! them; only a failed store reset aborts a run.

mod report;

pub use report::{ItemFailure, SourceReport, SyncReport};

use hashbrown::HashSet;
use marquee_shared::LauncherKey;
use tracing::{debug, info, warn};

use crate::disambiguate::Disambiguator;
use crate::error::SyncError;
use crate::source::{ContentSource, SourceRegistry};
use crate::store::LauncherStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Keep existing descriptors, add new ones, sweep dead ones.
    Incremental,
    /// Discard the store and regenerate everything.
    FullResync,
}

impl RunMode {
    pub fn from_full_resync(full_resync: bool) -> Self {
        if full_resync {
            RunMode::FullResync
        } else {
            RunMode::Incremental
        }
    }

    pub fn is_full_resync(self) -> bool {
        self == RunMode::FullResync
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FullReset,
    SkipReset,
    Adding { source_type: String },
    SkipSweep,
    RemovalSweep,
    Disambiguating,
    Done,
}

pub struct SyncEngine<'a> {
    store: &'a mut LauncherStore,
    sources: &'a mut SourceRegistry,
    disambiguator: Option<&'a Disambiguator>,
    mode: RunMode,
    state: SyncState,
    history: Vec<SyncState>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a mut LauncherStore, sources: &'a mut SourceRegistry, mode: RunMode) -> Self {
        Self {
            store,
            sources,
            disambiguator: None,
            mode,
            state: SyncState::Idle,
            history: vec![SyncState::Idle],
        }
    }

    /// Run this disambiguator after every source has finished.
    pub fn with_disambiguator(mut self, disambiguator: &'a Disambiguator) -> Self {
        self.disambiguator = Some(disambiguator);
        self
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[SyncState] {
        &self.history
    }

    fn enter(&mut self, state: SyncState) {
        debug!(?state, "Sync state");
        self.history.push(state.clone());
        self.state = state;
    }

    /// Execute one run.
    ///
    /// Fails only when a full resync cannot clear the store.
    pub fn run(&mut self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(self.mode);
        info!(mode = ?self.mode, sources = self.sources.len(), "Starting sync");

        if self.mode.is_full_resync() {
            self.enter(SyncState::FullReset);
            report.cleared = self.store.clear()?;
        } else {
            self.enter(SyncState::SkipReset);
        }

        for source_type in self.sources.source_types() {
            self.enter(SyncState::Adding {
                source_type: source_type.clone(),
            });
            let Some(source) = self.sources.get_mut(&source_type) else {
                continue;
            };
            let source_report = add_phase(self.store, source.as_mut(), self.mode);
            info!(
                source = %source_type,
                candidates = source_report.candidates,
                added = source_report.added,
                already_present = source_report.already_present,
                skipped = source_report.skipped,
                failed = source_report.failed.len(),
                "Source scanned"
            );
            report.sources.push(source_report);
        }

        if self.mode.is_full_resync() {
            self.enter(SyncState::SkipSweep);
        } else {
            self.enter(SyncState::RemovalSweep);
            removal_sweep(self.store, self.sources, &mut report);
        }

        if let Some(disambiguator) = self.disambiguator {
            self.enter(SyncState::Disambiguating);
            report.disambiguation = Some(disambiguator.run(self.store, self.mode));
        }

        self.enter(SyncState::Done);
        info!(
            added = report.total_added(),
            removed = report.total_removed(),
            failed = report.total_failed(),
            launchers = self.store.len(),
            "Sync finished"
        );
        Ok(report)
    }
}

/// Derive and write descriptors for one source's new identities.
fn add_phase(
    store: &mut LauncherStore,
    source: &mut dyn ContentSource,
    mode: RunMode,
) -> SourceReport {
    let source_type = source.source_type().to_string();
    let mut report = SourceReport::new(&source_type);

    let candidates = match source.iterate_candidates() {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(source = %source_type, "Source unavailable for this run: {}", e);
            report.source_error = Some(e.to_string());
            return report;
        }
    };
    report.candidates = candidates.len();

    let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len());
    for candidate in &candidates {
        let unique_id = candidate.unique_id.as_str();
        if !seen.insert(unique_id) {
            debug!(source = %source_type, unique_id, "Duplicate candidate ignored");
            report.duplicates += 1;
            continue;
        }
        if !mode.is_full_resync() && store.exists(&source_type, unique_id) {
            report.already_present += 1;
            continue;
        }

        let descriptor = match source.describe(candidate) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!(source = %source_type, unique_id, "Not playable, skipping");
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(source = %source_type, unique_id, "Skipping item: {}", e);
                report.failed.push(ItemFailure {
                    unique_id: unique_id.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if descriptor.key() != &LauncherKey::new(&source_type, unique_id) {
            let reason = format!("source produced a descriptor keyed {}", descriptor.key());
            warn!(source = %source_type, unique_id, "Skipping item: {}", reason);
            report.failed.push(ItemFailure {
                unique_id: unique_id.to_string(),
                reason,
            });
            continue;
        }

        match store.write(&descriptor) {
            Ok(()) => report.added += 1,
            Err(e) => {
                warn!(source = %source_type, unique_id, "Failed to store launcher: {}", e);
                report.failed.push(ItemFailure {
                    unique_id: unique_id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

/// Remove descriptors whose owning source says they are gone.
///
/// Descriptors of unregistered source types, and of sources that failed to
/// enumerate this run, are left untouched.
fn removal_sweep(store: &mut LauncherStore, sources: &mut SourceRegistry, report: &mut SyncReport) {
    for key in store.keys() {
        let Some(source) = sources.get_mut(&key.source_type) else {
            *report
                .untouched_foreign
                .entry(key.source_type.clone())
                .or_default() += 1;
            continue;
        };
        let Some(source_report) = report.source_mut(&key.source_type) else {
            continue;
        };
        if source_report.sweep_skipped() {
            continue;
        }

        match source.is_live(&key.unique_id) {
            Ok(true) => {}
            Ok(false) => match store.remove(&key.source_type, &key.unique_id) {
                Ok(_) => {
                    debug!(key = %key, "Removed stale launcher");
                    source_report.removed += 1;
                }
                Err(e) => {
                    warn!(key = %key, "Failed to remove stale launcher: {}", e);
                    source_report.remove_failures.push(ItemFailure {
                        unique_id: key.unique_id.clone(),
                        reason: e.to_string(),
                    });
                }
            },
            Err(e) => {
                warn!(key = %key, "Liveness check failed, keeping launcher: {}", e);
                source_report.remove_failures.push(ItemFailure {
                    unique_id: key.unique_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for source_report in &report.sources {
        if source_report.removed > 0 {
            info!(
                source = %source_report.source_type,
                removed = source_report.removed,
                "Removal sweep"
            );
        }
    }
}
