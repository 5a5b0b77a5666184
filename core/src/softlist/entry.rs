//! Software catalog entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One content item inside a named software list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftwareEntry {
    /// Name within the list; parents are referenced by it.
    pub name: String,
    /// List this entry was loaded from.
    #[serde(skip)]
    pub list_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub compatibility: Vec<String>,
    #[serde(default)]
    pub checksums: Vec<String>,
    #[serde(default)]
    pub serials: Vec<String>,
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

impl SoftwareEntry {
    /// Fill every field absent here from `parent`.
    ///
    /// Keys (checksums, serials) identify this entry and are never inherited.
    pub fn inherit_from(&mut self, parent: &SoftwareEntry) {
        fill(&mut self.description, &parent.description);
        fill(&mut self.year, &parent.year);
        fill(&mut self.publisher, &parent.publisher);
        fill(&mut self.developer, &parent.developer);
        if self.compatibility.is_empty() {
            self.compatibility = parent.compatibility.clone();
        }
        for (key, value) in &parent.info {
            self.info
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Display name: the description, falling back to the entry name.
    pub fn display_name(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.name)
    }
}

fn fill(own: &mut Option<String>, parent: &Option<String>) {
    let missing = own.as_deref().is_none_or(|v| v.trim().is_empty());
    if missing && parent.is_some() {
        *own = parent.clone();
    }
}
