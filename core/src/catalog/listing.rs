//! Machine records as printed by the catalog authority.
//!
//! One JSON object per machine:
//!
//! ```json
//! {"name": "pacmanf", "description": "Pac-Man (speedup hack)",
//!  "cloneof": "puckman", "romof": "puckman",
//!  "facts": {"source_file": "pacman/pacman.cpp", "year": "1981"}}
//! ```
//!
//! `romof` names the BIOS only when it differs from `cloneof`; for clones it
//! normally repeats the parent.

use std::collections::BTreeMap;

use marquee_shared::{Facts, Machine};
use serde::Deserialize;
use serde::de::Error as _;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireMachine {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cloneof: Option<String>,
    #[serde(default)]
    romof: Option<String>,
    #[serde(default)]
    facts: BTreeMap<String, Value>,
}

/// Parse one listing line into a [`Machine`].
pub fn parse_machine(line: &str) -> Result<Machine, serde_json::Error> {
    let wire: WireMachine = serde_json::from_str(line)?;
    let basename = wire.name.trim().to_string();
    if basename.is_empty() {
        return Err(serde_json::Error::custom("machine has an empty name"));
    }

    let parent_basename = non_blank(wire.cloneof).filter(|p| *p != basename);
    let bios_basename = non_blank(wire.romof)
        .filter(|r| *r != basename && Some(r) != parent_basename.as_ref());
    let name = non_blank(wire.description).unwrap_or_else(|| basename.clone());

    let facts: Facts = wire
        .facts
        .into_iter()
        .filter_map(|(key, value)| fact_string(value).map(|v| (key, v)))
        .collect();

    Ok(Machine {
        basename,
        name,
        parent_basename,
        bios_basename,
        facts,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn fact_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "yes" } else { "no" }.to_string()),
        _ => None,
    }
}
