//! Disambiguation engine
//!
//! Post-pass over the whole store that appends distinguishing suffixes to
//! descriptors sharing a display name. The only state carried between runs
//! is each descriptor's `ambiguous_name`, which the undo pass uses to strip
//! old suffixes before the strategies run again.

mod normalize;
mod strategy;

pub use normalize::normalize_name;
pub use strategy::{
    FieldFn, FieldSource, FieldStrategy, Strategy, TagStrategy, UNKNOWN_VALUE, release_year,
    standard_strategies,
};

use std::collections::BTreeMap;

use marquee_shared::{LauncherDescriptor, LauncherKey};
use tracing::{debug, info, warn};

use crate::store::LauncherStore;
use crate::sync::{ItemFailure, RunMode};

/// Names still shared after every strategy ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedGroup {
    pub name: String,
    pub members: Vec<LauncherKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisambiguationReport {
    /// Descriptors whose previous suffixes were stripped.
    pub undone: usize,
    /// Suffixes appended, across all strategies.
    pub suffixes_applied: usize,
    /// Records written back because they changed.
    pub rewritten: usize,
    pub write_failures: Vec<ItemFailure>,
    pub unresolved: Vec<UnresolvedGroup>,
}

pub struct Disambiguator {
    strategies: Vec<Strategy>,
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::standard()
    }
}

impl Disambiguator {
    /// The launcher pipeline: platform, arcade system, category, release
    /// date, publisher, developer, filename tags, status tags.
    pub fn standard() -> Self {
        Self::new(standard_strategies())
    }

    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Run the pass over `descriptors` in memory.
    ///
    /// The result depends only on descriptor contents and slice order.
    pub fn apply(&self, descriptors: &mut [LauncherDescriptor], mode: RunMode) -> DisambiguationReport {
        let mut report = DisambiguationReport::default();

        if !mode.is_full_resync() {
            for descriptor in descriptors.iter_mut() {
                if descriptor.undo_disambiguation() {
                    report.undone += 1;
                }
            }
        }

        for strategy in &self.strategies {
            for group in collisions(descriptors) {
                let suffixes = {
                    let members: Vec<&LauncherDescriptor> =
                        group.iter().map(|&i| &descriptors[i]).collect();
                    strategy.suffixes(&members)
                };
                for (&index, suffix) in group.iter().zip(suffixes) {
                    if let Some(suffix) = suffix {
                        descriptors[index].append_suffix(&suffix, strategy.name());
                        report.suffixes_applied += 1;
                    }
                }
            }
        }

        for group in collisions(descriptors) {
            let unresolved = UnresolvedGroup {
                name: descriptors[group[0]].display_name.clone(),
                members: group.iter().map(|&i| descriptors[i].key().clone()).collect(),
            };
            debug!(
                name = %unresolved.name,
                members = unresolved.members.len(),
                "Name collision unresolved"
            );
            report.unresolved.push(unresolved);
        }

        report
    }

    /// Run the pass over the whole store, rewriting changed descriptors only.
    pub fn run(&self, store: &mut LauncherStore, mode: RunMode) -> DisambiguationReport {
        let original = store.enumerate();
        let mut descriptors = original.clone();
        let mut report = self.apply(&mut descriptors, mode);

        for (before, after) in original.iter().zip(&descriptors) {
            if before == after {
                continue;
            }
            match store.write(after) {
                Ok(()) => report.rewritten += 1,
                Err(e) => {
                    warn!(key = %after.key(), "Failed to rewrite launcher: {}", e);
                    report.write_failures.push(ItemFailure {
                        unique_id: after.key().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            undone = report.undone,
            suffixes = report.suffixes_applied,
            rewritten = report.rewritten,
            unresolved = report.unresolved.len(),
            "Disambiguation finished"
        );
        report
    }
}

/// Indices of descriptors sharing a normalized name, for groups of two or more.
fn collisions(descriptors: &[LauncherDescriptor]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        groups
            .entry(normalize_name(&descriptor.display_name))
            .or_default()
            .push(index);
    }
    groups.into_values().filter(|g| g.len() > 1).collect()
}
