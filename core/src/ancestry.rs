//! Clone/parent and BIOS ancestry over catalog entries.
//!
//! Resolution is memoized per basename for the lifetime of one resolver,
//! which is constructed once per run. Missing references end a chain;
//! revisiting a basename is a `CycleDetected` error for that item.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use marquee_shared::{Facts, Machine, facts};
use tracing::debug;

use crate::catalog::MachineCatalog;
use crate::error::SyncError;

/// Facts that describe the machine entry itself and are never inherited.
const NON_INHERITABLE: &[&str] = &[facts::IS_BIOS, facts::IS_DEVICE, facts::RUNNABLE];

/// Machine lookup used while walking references.
///
/// `Ok(None)` means the reference is dangling.
pub trait MachineLookup {
    fn lookup(&self, basename: &str) -> Result<Option<Machine>, SyncError>;
}

impl MachineLookup for MachineCatalog {
    fn lookup(&self, basename: &str) -> Result<Option<Machine>, SyncError> {
        match self.get(basename) {
            Ok(machine) => Ok(Some(machine)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl MachineLookup for HashMap<String, Machine> {
    fn lookup(&self, basename: &str) -> Result<Option<Machine>, SyncError> {
        Ok(self.get(basename).cloned())
    }
}

/// Derived ancestry of one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAncestry {
    pub basename: String,
    /// Ultimate ancestor reached by following parents.
    pub family_root: String,
    /// Parents from nearest to the family root.
    pub lineage: Vec<String>,
    /// BIOS basenames in order, nearest first.
    pub bios_chain: Vec<String>,
    /// Facts taken from ancestors because the machine lacks them.
    pub inherited_facts: Facts,
    /// Own facts merged with inherited ones.
    pub facts: Facts,
}

impl ResolvedAncestry {
    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_clone(&self) -> bool {
        !self.lineage.is_empty()
    }
}

#[derive(Debug)]
struct BiosChain {
    basenames: Vec<String>,
    facts: Facts,
}

/// Per-run ancestry resolver.
#[derive(Debug, Default)]
pub struct AncestryResolver {
    resolved: HashMap<String, Arc<ResolvedAncestry>>,
    cyclic: HashMap<String, Vec<String>>,
    bios: HashMap<String, Result<Arc<BiosChain>, Vec<String>>>,
}

impl AncestryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized resolutions.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn resolve(
        &mut self,
        machine: &Machine,
        lookup: &dyn MachineLookup,
    ) -> Result<Arc<ResolvedAncestry>, SyncError> {
        if let Some(hit) = self.resolved.get(&machine.basename) {
            return Ok(Arc::clone(hit));
        }
        if let Some(chain) = self.cyclic.get(&machine.basename) {
            return Err(cycle(&machine.basename, chain.clone()));
        }

        // Walk parents until a memoized ancestor, a root, or a dangling reference.
        let mut lineage = vec![machine.clone()];
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(machine.basename.clone());
        let mut base: Option<Arc<ResolvedAncestry>> = None;

        loop {
            let Some(parent) = lineage.last().and_then(|m| m.parent_basename.clone()) else {
                break;
            };
            if seen.contains(&parent) {
                let mut chain: Vec<String> = lineage.iter().map(|m| m.basename.clone()).collect();
                chain.push(parent);
                return Err(self.mark_cyclic(&lineage, chain));
            }
            if let Some(hit) = self.resolved.get(&parent) {
                base = Some(Arc::clone(hit));
                break;
            }
            if let Some(known) = self.cyclic.get(&parent).cloned() {
                return Err(self.mark_cyclic(&lineage, known));
            }
            match lookup.lookup(&parent)? {
                Some(next) => {
                    seen.insert(parent);
                    lineage.push(next);
                }
                None => {
                    let child = lineage.last().map(|m| m.basename.as_str()).unwrap_or("");
                    debug!("Parent '{}' of '{}' is not in the catalog", parent, child);
                    break;
                }
            }
        }

        let mut above = base;
        for member in lineage.iter().rev() {
            let resolved = Arc::new(self.build(member, above.as_deref(), lookup)?);
            self.resolved
                .insert(member.basename.clone(), Arc::clone(&resolved));
            above = Some(resolved);
        }

        above.ok_or_else(|| SyncError::not_found("machine", &machine.basename))
    }

    fn build(
        &mut self,
        machine: &Machine,
        parent: Option<&ResolvedAncestry>,
        lookup: &dyn MachineLookup,
    ) -> Result<ResolvedAncestry, SyncError> {
        let family_root = parent
            .map(|p| p.family_root.clone())
            .unwrap_or_else(|| machine.basename.clone());

        let lineage = match parent {
            Some(p) => std::iter::once(p.basename.clone())
                .chain(p.lineage.iter().cloned())
                .collect(),
            None => Vec::new(),
        };

        let mut facts = machine.facts.clone();
        let mut inherited = Facts::new();
        if let Some(parent) = parent {
            inherit(&mut facts, &mut inherited, &parent.facts);
        }

        let bios_chain = match machine.bios_basename.as_deref() {
            Some(bios) if bios != machine.basename => {
                let chain = self.bios_chain(bios, lookup)?;
                inherit(&mut facts, &mut inherited, &chain.facts);
                chain.basenames.clone()
            }
            _ => parent.map(|p| p.bios_chain.clone()).unwrap_or_default(),
        };

        Ok(ResolvedAncestry {
            basename: machine.basename.clone(),
            family_root,
            lineage,
            bios_chain,
            inherited_facts: inherited,
            facts,
        })
    }

    fn bios_chain(
        &mut self,
        start: &str,
        lookup: &dyn MachineLookup,
    ) -> Result<Arc<BiosChain>, SyncError> {
        if let Some(memo) = self.bios.get(start) {
            return match memo {
                Ok(chain) => Ok(Arc::clone(chain)),
                Err(chain) => Err(cycle(start, chain.clone())),
            };
        }

        let mut basenames = Vec::new();
        let mut facts = Facts::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = Some(start.to_string());

        while let Some(bios) = current {
            if !seen.insert(bios.clone()) {
                let mut chain = basenames.clone();
                chain.push(bios);
                self.bios.insert(start.to_string(), Err(chain.clone()));
                return Err(cycle(start, chain));
            }
            let Some(machine) = lookup.lookup(&bios)? else {
                debug!("BIOS '{}' is not in the catalog", bios);
                break;
            };
            let mut unused = Facts::new();
            inherit(&mut facts, &mut unused, &machine.facts);
            current = machine
                .bios_basename
                .clone()
                .filter(|next| *next != machine.basename);
            basenames.push(bios);
        }

        let chain = Arc::new(BiosChain { basenames, facts });
        self.bios.insert(start.to_string(), Ok(Arc::clone(&chain)));
        Ok(chain)
    }

    fn mark_cyclic(&mut self, lineage: &[Machine], chain: Vec<String>) -> SyncError {
        for member in lineage {
            self.cyclic.insert(member.basename.clone(), chain.clone());
        }
        let head = lineage.first().map(|m| m.basename.as_str()).unwrap_or("");
        cycle(head, chain)
    }
}

fn inherit(facts: &mut Facts, inherited: &mut Facts, from: &Facts) {
    for (key, value) in from {
        if NON_INHERITABLE.contains(&key.as_str()) || value.trim().is_empty() {
            continue;
        }
        let missing = facts.get(key).is_none_or(|own| own.trim().is_empty());
        if missing {
            facts.insert(key.clone(), value.clone());
            inherited.insert(key.clone(), value.clone());
        }
    }
}

fn cycle(basename: &str, chain: Vec<String>) -> SyncError {
    SyncError::CycleDetected {
        basename: basename.to_string(),
        chain,
    }
}
