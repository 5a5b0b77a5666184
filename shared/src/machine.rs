//! Machine definitions as materialized from the catalog authority.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::facts;

/// Arbitrary string facts attached to a machine (source file, flags, players...).
///
/// A `BTreeMap` keeps serialized cache entries stable across runs.
pub type Facts = BTreeMap<String, String>;

/// One entry of the machine catalog.
///
/// Immutable once materialized for a given catalog version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Identity, unique within one catalog version.
    pub basename: String,
    /// Human readable name.
    pub name: String,
    /// Clone reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_basename: Option<String>,
    /// Shared-firmware reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bios_basename: Option<String>,
    #[serde(default)]
    pub facts: Facts,
}

impl Machine {
    pub fn new(basename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            name: name.into(),
            parent_basename: None,
            bios_basename: None,
            facts: Facts::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_basename = Some(parent.into());
        self
    }

    pub fn with_bios(mut self, bios: impl Into<String>) -> Self {
        self.bios_basename = Some(bios.into());
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Returns a fact value, treating empty strings as absent.
    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Interprets a fact as a yes/no flag. Absent means `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.fact(key).is_some_and(is_truthy)
    }

    pub fn is_bios(&self) -> bool {
        self.flag(facts::IS_BIOS)
    }

    pub fn is_device(&self) -> bool {
        self.flag(facts::IS_DEVICE)
    }

    pub fn is_mechanical(&self) -> bool {
        self.flag(facts::IS_MECHANICAL)
    }

    /// Machines are runnable unless the catalog says otherwise.
    pub fn is_runnable(&self) -> bool {
        self.fact(facts::RUNNABLE).is_none_or(is_truthy)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_treats_blank_as_absent() {
        let machine = Machine::new("pacman", "Pac-Man").with_fact("year", "  ");
        assert_eq!(machine.fact("year"), None);
    }

    #[test]
    fn test_flags() {
        let machine = Machine::new("neogeo", "Neo-Geo")
            .with_fact(facts::IS_BIOS, "yes")
            .with_fact(facts::RUNNABLE, "no");
        assert!(machine.is_bios());
        assert!(!machine.is_device());
        assert!(!machine.is_runnable());
    }

    #[test]
    fn test_runnable_by_default() {
        assert!(Machine::new("pacman", "Pac-Man").is_runnable());
    }

    #[test]
    fn test_serde_skips_missing_references() {
        let json = serde_json::to_string(&Machine::new("pacman", "Pac-Man")).unwrap();
        assert!(!json.contains("parent_basename"));
        let parsed: Machine = serde_json::from_str(r#"{"basename":"a","name":"A"}"#).unwrap();
        assert_eq!(parsed.parent_basename, None);
        assert!(parsed.facts.is_empty());
    }
}
