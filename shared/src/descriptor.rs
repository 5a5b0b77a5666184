//! Launcher descriptors.
//!
//! A descriptor is the persisted record for one generated launcher. The key
//! is fixed at construction; only the display name and the disambiguation
//! bookkeeping change afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque metadata payload written by content sources.
///
/// Disambiguation reads a handful of well-known keys (see [`crate::facts`]);
/// nothing else in the engine interprets it.
pub type Metadata = BTreeMap<String, Value>;

/// Identity of a launcher descriptor: `(source_type, unique_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LauncherKey {
    pub source_type: String,
    pub unique_id: String,
}

impl LauncherKey {
    pub fn new(source_type: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            unique_id: unique_id.into(),
        }
    }
}

impl fmt::Display for LauncherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_type, self.unique_id)
    }
}

/// One generated launcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherDescriptor {
    key: LauncherKey,
    /// Name shown to the user; rewritten by disambiguation.
    pub display_name: String,
    /// Name before disambiguation touched it. Set once per pass, cleared by undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguous_name: Option<String>,
    /// Strategies that appended a suffix, in application order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disambiguated_by: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub launch_spec: Value,
}

impl LauncherDescriptor {
    pub fn new(key: LauncherKey, display_name: impl Into<String>) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            ambiguous_name: None,
            disambiguated_by: Vec::new(),
            metadata: Metadata::new(),
            launch_spec: Value::Null,
        }
    }

    pub fn key(&self) -> &LauncherKey {
        &self.key
    }

    pub fn source_type(&self) -> &str {
        &self.key.source_type
    }

    pub fn unique_id(&self) -> &str {
        &self.key.unique_id
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_metadata(key, value);
        self
    }

    pub fn with_launch_spec(mut self, launch_spec: Value) -> Self {
        self.launch_spec = launch_spec;
        self
    }

    /// Sets a metadata entry. `Null` and empty strings are not stored.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if !empty {
            self.metadata.insert(key.into(), value);
        }
    }

    /// Reads a metadata entry as a display string.
    ///
    /// Numbers and booleans are rendered; arrays, objects and blank strings
    /// count as absent.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Reads a metadata entry as a list of strings.
    ///
    /// A plain string is a one-element list.
    pub fn metadata_list(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    /// Appends a disambiguating suffix, remembering the original name once.
    pub fn append_suffix(&mut self, suffix: &str, strategy: &str) {
        if self.ambiguous_name.is_none() {
            self.ambiguous_name = Some(self.display_name.clone());
        }
        self.display_name = format!("{} ({})", self.display_name, suffix);
        self.disambiguated_by.push(strategy.to_string());
    }

    /// Reverts any disambiguation. Returns `true` if the descriptor changed.
    pub fn undo_disambiguation(&mut self) -> bool {
        let changed = self.ambiguous_name.is_some() || !self.disambiguated_by.is_empty();
        if let Some(original) = self.ambiguous_name.take()
            && !original.is_empty()
        {
            self.display_name = original;
        }
        self.disambiguated_by.clear();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> LauncherDescriptor {
        LauncherDescriptor::new(LauncherKey::new("arcade", "pacman"), name)
    }

    #[test]
    fn test_key_display() {
        assert_eq!(LauncherKey::new("snes", "a/b.sfc").to_string(), "snes:a/b.sfc");
    }

    #[test]
    fn test_keys_order_by_source_then_id() {
        let mut keys = vec![
            LauncherKey::new("snes", "b"),
            LauncherKey::new("arcade", "z"),
            LauncherKey::new("snes", "a"),
        ];
        keys.sort();
        assert_eq!(keys[0], LauncherKey::new("arcade", "z"));
        assert_eq!(keys[1], LauncherKey::new("snes", "a"));
    }

    #[test]
    fn test_set_metadata_skips_empty_values() {
        let d = descriptor("Pac-Man")
            .with_metadata("platform", "")
            .with_metadata("tags", Value::Array(vec![]))
            .with_metadata("year", "1980");
        assert_eq!(d.metadata.len(), 1);
        assert_eq!(d.metadata_str("year").as_deref(), Some("1980"));
        assert_eq!(d.metadata_str("platform"), None);
    }

    #[test]
    fn test_metadata_list_accepts_string_and_array() {
        let d = descriptor("Pac-Man")
            .with_metadata("single", "USA")
            .with_metadata("many", serde_json::json!(["USA", " ", "Rev 1"]));
        assert_eq!(d.metadata_list("single"), vec!["USA"]);
        assert_eq!(d.metadata_list("many"), vec!["USA", "Rev 1"]);
        assert!(d.metadata_list("missing").is_empty());
    }

    #[test]
    fn test_append_suffix_remembers_first_name_only() {
        let mut d = descriptor("Pac-Man");
        d.append_suffix("Arcade", "platform");
        d.append_suffix("1980", "release_date");
        assert_eq!(d.display_name, "Pac-Man (Arcade) (1980)");
        assert_eq!(d.ambiguous_name.as_deref(), Some("Pac-Man"));
        assert_eq!(d.disambiguated_by, vec!["platform", "release_date"]);
    }

    #[test]
    fn test_undo_restores_original_name() {
        let mut d = descriptor("Pac-Man");
        d.append_suffix("Arcade", "platform");
        assert!(d.undo_disambiguation());
        assert_eq!(d.display_name, "Pac-Man");
        assert_eq!(d.ambiguous_name, None);
        assert!(d.disambiguated_by.is_empty());
        assert!(!d.undo_disambiguation());
    }

    #[test]
    fn test_serialized_form_omits_bookkeeping_when_clean() {
        let json = serde_json::to_string(&descriptor("Pac-Man")).unwrap();
        assert!(!json.contains("ambiguous_name"));
        assert!(!json.contains("disambiguated_by"));
        let parsed: LauncherDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key(), &LauncherKey::new("arcade", "pacman"));
    }
}
