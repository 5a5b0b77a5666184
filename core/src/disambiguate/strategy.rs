//! Disambiguation strategies.

use marquee_shared::{LauncherDescriptor, facts};

/// Rendered in place of a missing field value.
pub const UNKNOWN_VALUE: &str = "Unknown";

pub type FieldFn = fn(&LauncherDescriptor) -> Option<String>;

/// Where a field strategy reads its value from.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    Metadata(&'static str),
    Custom(FieldFn),
}

impl FieldSource {
    fn value(&self, descriptor: &LauncherDescriptor) -> Option<String> {
        let value = match self {
            FieldSource::Metadata(key) => descriptor.metadata_str(key),
            FieldSource::Custom(f) => f(descriptor),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Suffix members whose value of one field is unique within the group.
#[derive(Debug, Clone, Copy)]
pub struct FieldStrategy {
    pub name: &'static str,
    pub source: FieldSource,
    /// Never suffix a missing value, and never suffix against a group whose
    /// other members all lack the value.
    pub ignore_missing_values: bool,
}

/// Suffix members with the tags no sibling carries.
#[derive(Debug, Clone, Copy)]
pub struct TagStrategy {
    pub name: &'static str,
    /// Metadata key holding a list of tags.
    pub key: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    Field(FieldStrategy),
    Tags(TagStrategy),
}

impl Strategy {
    pub const fn metadata(name: &'static str, key: &'static str) -> Self {
        Strategy::Field(FieldStrategy {
            name,
            source: FieldSource::Metadata(key),
            ignore_missing_values: false,
        })
    }

    pub const fn metadata_ignoring_missing(name: &'static str, key: &'static str) -> Self {
        Strategy::Field(FieldStrategy {
            name,
            source: FieldSource::Metadata(key),
            ignore_missing_values: true,
        })
    }

    pub const fn tags(name: &'static str, key: &'static str) -> Self {
        Strategy::Tags(TagStrategy { name, key })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Field(s) => s.name,
            Strategy::Tags(s) => s.name,
        }
    }

    /// Suffixes to append, one per group member (`None` leaves it alone).
    pub(crate) fn suffixes(&self, group: &[&LauncherDescriptor]) -> Vec<Option<String>> {
        match self {
            Strategy::Field(s) => s.suffixes(group),
            Strategy::Tags(s) => s.suffixes(group),
        }
    }
}

impl FieldStrategy {
    fn suffixes(&self, group: &[&LauncherDescriptor]) -> Vec<Option<String>> {
        if group.len() < 2 {
            return vec![None; group.len()];
        }
        let values: Vec<Option<String>> = group.iter().map(|d| self.source.value(d)).collect();
        let rendered: Vec<String> = values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| UNKNOWN_VALUE.to_string()))
            .collect();

        let constant = rendered
            .iter()
            .all(|v| v.eq_ignore_ascii_case(&rendered[0]));
        if constant {
            return vec![None; group.len()];
        }

        (0..group.len())
            .map(|i| {
                if self.ignore_missing_values {
                    if values[i].is_none() {
                        return None;
                    }
                    let others_missing = values
                        .iter()
                        .enumerate()
                        .all(|(j, v)| j == i || v.is_none());
                    if others_missing {
                        return None;
                    }
                }

                let value = &rendered[i];
                let unique = rendered
                    .iter()
                    .enumerate()
                    .all(|(j, other)| j == i || !other.eq_ignore_ascii_case(value));
                let differs = !value.eq_ignore_ascii_case(group[i].display_name.trim());
                (unique && differs).then(|| value.clone())
            })
            .collect()
    }
}

impl TagStrategy {
    fn suffixes(&self, group: &[&LauncherDescriptor]) -> Vec<Option<String>> {
        let tags: Vec<Vec<String>> = group.iter().map(|d| d.metadata_list(self.key)).collect();

        (0..group.len())
            .map(|i| {
                let mut own: Vec<&str> = Vec::new();
                for tag in &tags[i] {
                    let shared = tags
                        .iter()
                        .enumerate()
                        .any(|(j, other)| j != i && other.iter().any(|t| t.eq_ignore_ascii_case(tag)));
                    let repeated = own.iter().any(|t| t.eq_ignore_ascii_case(tag));
                    if !shared && !repeated {
                        own.push(tag);
                    }
                }
                (!own.is_empty()).then(|| own.join(") ("))
            })
            .collect()
    }
}

/// First four characters of a release date when they form a year.
pub fn release_year(descriptor: &LauncherDescriptor) -> Option<String> {
    let date = descriptor.metadata_str(facts::RELEASE_DATE)?;
    let year: String = date.chars().take(4).collect();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit() || c == '?') {
        Some(year)
    } else {
        Some(date)
    }
}

/// Pipeline used by the launcher sync.
pub fn standard_strategies() -> Vec<Strategy> {
    vec![
        Strategy::metadata("platform", facts::PLATFORM),
        Strategy::metadata("arcade_system", facts::ARCADE_SYSTEM),
        Strategy::metadata("category", facts::CATEGORY),
        Strategy::Field(FieldStrategy {
            name: "release_date",
            source: FieldSource::Custom(release_year),
            ignore_missing_values: true,
        }),
        Strategy::metadata_ignoring_missing("publisher", facts::PUBLISHER),
        Strategy::metadata_ignoring_missing("developer", facts::DEVELOPER),
        Strategy::tags("filename_tags", facts::FILENAME_TAGS),
        Strategy::tags("status_tags", facts::STATUS_TAGS),
    ]
}
