//! Arcade machines from the catalog authority.

use std::path::Path;

use marquee_shared::{LauncherDescriptor, LauncherKey, Machine, facts};
use serde_json::json;
use tracing::debug;

use super::{Candidate, ContentSource};
use crate::ancestry::AncestryResolver;
use crate::catalog::MachineCatalog;
use crate::config::ArcadeConfig;
use crate::error::SyncError;

pub const ARCADE_SOURCE_TYPE: &str = "arcade";

const PLATFORM: &str = "Arcade";

pub struct ArcadeSource {
    catalog: MachineCatalog,
    resolver: AncestryResolver,
    config: ArcadeConfig,
}

impl ArcadeSource {
    pub fn new(catalog: MachineCatalog, config: ArcadeConfig) -> Self {
        Self {
            catalog,
            resolver: AncestryResolver::new(),
            config,
        }
    }

    /// Whether a machine is something a player would launch.
    fn is_launchable(&self, machine: &Machine) -> bool {
        if machine.is_bios() || machine.is_device() {
            return false;
        }
        if machine.is_mechanical() && !self.config.include_mechanical {
            return false;
        }
        machine.is_runnable() || self.config.include_non_runnable
    }

    fn verified(&self, basename: &str) -> Result<bool, SyncError> {
        if !self.config.verify_romsets {
            return Ok(true);
        }
        self.catalog.verify(basename)
    }
}

impl ContentSource for ArcadeSource {
    fn source_type(&self) -> &str {
        ARCADE_SOURCE_TYPE
    }

    fn iterate_candidates(&mut self) -> Result<Vec<Candidate>, SyncError> {
        let mut candidates = Vec::new();
        for machine in self.catalog.iterate_all()? {
            if self.is_launchable(&machine) {
                candidates.push(Candidate {
                    unique_id: machine.basename,
                    facts: machine.facts,
                });
            }
        }
        Ok(candidates)
    }

    fn describe(
        &mut self,
        candidate: &Candidate,
    ) -> Result<Option<LauncherDescriptor>, SyncError> {
        let machine = self.catalog.get(&candidate.unique_id)?;
        if !self.verified(&machine.basename)? {
            debug!(basename = %machine.basename, "Romset missing or invalid, skipping");
            return Ok(None);
        }

        let ancestry = self.resolver.resolve(&machine, &self.catalog)?;

        let mut descriptor = LauncherDescriptor::new(
            LauncherKey::new(ARCADE_SOURCE_TYPE, &machine.basename),
            machine.name.clone(),
        )
        .with_metadata(facts::PLATFORM, PLATFORM)
        .with_launch_spec(json!({
            "emulator": self.config.executable,
            "args": [machine.basename],
        }));

        let source_file = ancestry.fact(facts::SOURCE_FILE);
        let arcade_system = source_file
            .and_then(|s| Path::new(s).file_stem())
            .and_then(|s| s.to_str());
        descriptor.set_metadata(facts::ARCADE_SYSTEM, arcade_system);
        descriptor.set_metadata(facts::CATEGORY, ancestry.fact(facts::GENRE));
        descriptor.set_metadata(facts::RELEASE_DATE, ancestry.fact(facts::YEAR));
        descriptor.set_metadata(facts::PUBLISHER, ancestry.fact(facts::MANUFACTURER));
        descriptor.set_metadata(facts::PLAYERS, ancestry.fact(facts::PLAYERS));
        descriptor.set_metadata(
            facts::EMULATION_STATUS,
            ancestry.fact(facts::DRIVER_STATUS),
        );
        descriptor.set_metadata(facts::FAMILY, ancestry.family_root.as_str());
        descriptor.set_metadata(facts::BIOS, ancestry.bios_chain.first().map(String::as_str));

        Ok(Some(descriptor))
    }

    fn is_live(&mut self, unique_id: &str) -> Result<bool, SyncError> {
        match self.catalog.get(unique_id) {
            Ok(machine) => Ok(self.is_launchable(&machine) && self.verified(unique_id)?),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeAuthority;
    use tempfile::TempDir;

    fn machines() -> Vec<Machine> {
        vec![
            Machine::new("pacman", "Pac-Man (Midway)")
                .with_fact(facts::SOURCE_FILE, "namco/pacman.cpp")
                .with_fact(facts::YEAR, "1980")
                .with_fact(facts::MANUFACTURER, "Namco (Midway license)")
                .with_fact(facts::GENRE, "Maze"),
            Machine::new("puckman", "Puck Man (Japan set 1)")
                .with_parent("pacman")
                .with_fact(facts::MANUFACTURER, "Namco"),
            Machine::new("neogeo", "Neo-Geo").with_fact(facts::IS_BIOS, "yes"),
            Machine::new("mslug", "Metal Slug")
                .with_bios("neogeo")
                .with_fact(facts::SOURCE_FILE, "neogeo/neogeo.cpp"),
            Machine::new("z80", "Zilog Z80").with_fact(facts::IS_DEVICE, "yes"),
            Machine::new("pinball", "Some Table").with_fact(facts::IS_MECHANICAL, "yes"),
            Machine::new("broken", "Not Runnable").with_fact(facts::RUNNABLE, "no"),
        ]
    }

    fn source(dir: &TempDir, authority: FakeAuthority, config: ArcadeConfig) -> ArcadeSource {
        let catalog = MachineCatalog::open(Box::new(authority), dir.path()).unwrap();
        ArcadeSource::new(catalog, config)
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.unique_id.as_str()).collect()
    }

    #[test]
    fn test_candidates_skip_unlaunchable_machines() {
        let dir = TempDir::new().unwrap();
        let mut source = source(
            &dir,
            FakeAuthority::new("0.261", machines()),
            ArcadeConfig::default(),
        );

        let candidates = source.iterate_candidates().unwrap();
        assert_eq!(ids(&candidates), vec!["mslug", "pacman", "puckman"]);
    }

    #[test]
    fn test_candidates_include_optional_kinds() {
        let dir = TempDir::new().unwrap();
        let config = ArcadeConfig {
            include_mechanical: true,
            include_non_runnable: true,
            ..ArcadeConfig::default()
        };
        let mut source = source(&dir, FakeAuthority::new("0.261", machines()), config);

        let candidates = source.iterate_candidates().unwrap();
        assert_eq!(
            ids(&candidates),
            vec!["broken", "mslug", "pacman", "pinball", "puckman"]
        );
    }

    #[test]
    fn test_describe_clone_inherits_parent_facts() {
        let dir = TempDir::new().unwrap();
        let mut source = source(
            &dir,
            FakeAuthority::new("0.261", machines()),
            ArcadeConfig::default(),
        );

        let descriptor = source
            .describe(&Candidate::new("puckman"))
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.display_name, "Puck Man (Japan set 1)");
        assert_eq!(descriptor.metadata_str(facts::PLATFORM).as_deref(), Some("Arcade"));
        assert_eq!(descriptor.metadata_str(facts::ARCADE_SYSTEM).as_deref(), Some("pacman"));
        assert_eq!(descriptor.metadata_str(facts::RELEASE_DATE).as_deref(), Some("1980"));
        assert_eq!(descriptor.metadata_str(facts::PUBLISHER).as_deref(), Some("Namco"));
        assert_eq!(descriptor.metadata_str(facts::FAMILY).as_deref(), Some("pacman"));
        assert_eq!(descriptor.launch_spec["args"][0], "puckman");
    }

    #[test]
    fn test_describe_records_bios() {
        let dir = TempDir::new().unwrap();
        let mut source = source(
            &dir,
            FakeAuthority::new("0.261", machines()),
            ArcadeConfig::default(),
        );

        let descriptor = source.describe(&Candidate::new("mslug")).unwrap().unwrap();
        assert_eq!(descriptor.metadata_str(facts::BIOS).as_deref(), Some("neogeo"));
        assert_eq!(descriptor.metadata_str(facts::ARCADE_SYSTEM).as_deref(), Some("neogeo"));
    }

    #[test]
    fn test_cycle_surfaces_as_item_error() {
        let dir = TempDir::new().unwrap();
        let machines = vec![
            Machine::new("a", "A").with_parent("b"),
            Machine::new("b", "B").with_parent("a"),
        ];
        let mut source = source(&dir, FakeAuthority::new("1", machines), ArcadeConfig::default());

        let err = source.describe(&Candidate::new("a")).unwrap_err();
        assert!(matches!(err, SyncError::CycleDetected { .. }));
    }

    #[test]
    fn test_verification_gates_describe_and_liveness() {
        let dir = TempDir::new().unwrap();
        let config = ArcadeConfig {
            verify_romsets: true,
            ..ArcadeConfig::default()
        };
        let authority = FakeAuthority::new("0.261", machines()).with_verified(&["pacman"]);
        let calls = authority.calls();
        let mut source = source(&dir, authority, config);

        assert!(source.describe(&Candidate::new("pacman")).unwrap().is_some());
        assert!(source.describe(&Candidate::new("puckman")).unwrap().is_none());
        assert!(source.is_live("pacman").unwrap());
        assert!(!source.is_live("puckman").unwrap());
        assert_eq!(calls.verifies(), 4);
    }

    #[test]
    fn test_no_verification_unless_configured() {
        let dir = TempDir::new().unwrap();
        let authority = FakeAuthority::new("0.261", machines()).with_verified(&[]);
        let calls = authority.calls();
        let mut source = source(&dir, authority, ArcadeConfig::default());

        assert!(source.describe(&Candidate::new("puckman")).unwrap().is_some());
        assert!(source.is_live("puckman").unwrap());
        assert_eq!(calls.verifies(), 0);
    }

    #[test]
    fn test_liveness_follows_catalog() {
        let dir = TempDir::new().unwrap();
        let mut source = source(
            &dir,
            FakeAuthority::new("0.261", machines()),
            ArcadeConfig::default(),
        );
        source.iterate_candidates().unwrap();

        assert!(source.is_live("pacman").unwrap());
        assert!(!source.is_live("removed_in_this_version").unwrap());
        assert!(!source.is_live("neogeo").unwrap());
    }
}
