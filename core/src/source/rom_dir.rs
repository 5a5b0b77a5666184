//! File-based ROM collections.
//!
//! Identity is the file's path relative to the collection root, with `/`
//! separators. Files are identified against the software catalogs by their
//! SHA-256 checksum, then by any filename tag that is a known serial.
//! Unidentified files are named after their filename.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, anyhow};
use marquee_shared::fs::{MAX_ROM_BYTES, read_file_with_limit};
use marquee_shared::{LauncherDescriptor, LauncherKey, facts};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::tags::{filename_tags, status_tags, strip_tags};
use super::{Candidate, ContentSource};
use crate::config::RomDirConfig;
use crate::error::SyncError;
use crate::softlist::SoftwareIndex;

const ROM_PLACEHOLDER: &str = "{rom}";

pub struct RomDirSource {
    config: RomDirConfig,
    extensions: Vec<String>,
    index: SoftwareIndex,
}

impl RomDirSource {
    pub fn new(config: RomDirConfig, index: SoftwareIndex) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            config,
            extensions,
            index,
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }

    /// Absolute path for a stored unique id, if it stays inside the root.
    fn resolve(&self, unique_id: &str) -> Option<PathBuf> {
        let relative = Path::new(unique_id);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (contained && !unique_id.is_empty()).then(|| self.config.path.join(relative))
    }

    fn launch_spec(&self, rom_path: &Path) -> Value {
        let rom = rom_path.to_string_lossy();
        let args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|arg| arg.replace(ROM_PLACEHOLDER, &rom))
            .collect();
        json!({
            "emulator": self.config.emulator,
            "args": args,
        })
    }
}

fn unique_id_for(relative: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    parts.map(|parts| parts.join("/"))
}

impl ContentSource for RomDirSource {
    fn source_type(&self) -> &str {
        &self.config.id
    }

    fn iterate_candidates(&mut self) -> Result<Vec<Candidate>, SyncError> {
        let root = &self.config.path;
        if !root.is_dir() {
            return Err(anyhow!("ROM directory not found: {}", root.display()).into());
        }

        let mut candidates = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(source = %self.config.id, "Skipping unreadable path: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches_extension(path) {
                continue;
            }

            let Some(unique_id) = path
                .strip_prefix(root)
                .ok()
                .and_then(unique_id_for)
            else {
                warn!(source = %self.config.id, "Skipping non UTF-8 path: {}", path.display());
                continue;
            };
            let filename = entry.file_name().to_string_lossy().into_owned();
            candidates.push(Candidate::new(unique_id).with_fact(facts::FILENAME, filename));
        }

        debug!(source = %self.config.id, files = candidates.len(), "Scanned ROM directory");
        Ok(candidates)
    }

    fn describe(
        &mut self,
        candidate: &Candidate,
    ) -> Result<Option<LauncherDescriptor>, SyncError> {
        let path = self
            .resolve(&candidate.unique_id)
            .ok_or_else(|| SyncError::not_found("ROM", &candidate.unique_id))?;
        let bytes = read_file_with_limit(&path, MAX_ROM_BYTES)
            .with_context(|| format!("Failed to checksum {}", path.display()))?;
        let checksum = hex::encode(Sha256::digest(&bytes));

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidate.unique_id.clone());
        let tags = filename_tags(&stem);
        let status = status_tags(&tags);
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned());

        // Checksum first; a filename tag naming a known serial is the fallback.
        let identified = self
            .index
            .lookup_checksum(&checksum)
            .map(|entry| (entry, "checksum"))
            .or_else(|| {
                tags.iter()
                    .find_map(|tag| self.index.lookup_serial(tag))
                    .map(|entry| (entry, "serial"))
            });
        let entry = identified.map(|(entry, _)| entry);
        let display_name = match entry {
            Some(entry) => entry.display_name().to_string(),
            None => strip_tags(&stem),
        };

        let mut descriptor = LauncherDescriptor::new(
            LauncherKey::new(&self.config.id, &candidate.unique_id),
            display_name,
        )
        .with_metadata(facts::PLATFORM, self.config.platform.as_str())
        .with_metadata(facts::CHECKSUM, checksum.as_str())
        .with_metadata(facts::FILENAME, filename)
        .with_metadata(facts::FILENAME_TAGS, tags)
        .with_metadata(facts::STATUS_TAGS, status)
        .with_launch_spec(self.launch_spec(&path));

        if let Some((entry, matched_by)) = identified {
            debug!(
                source = %self.config.id,
                unique_id = %candidate.unique_id,
                software = %entry.name,
                matched_by,
                "Identified software"
            );
            descriptor.set_metadata(facts::SOFTWARE_LIST, entry.list_name.as_str());
            descriptor.set_metadata(facts::SOFTWARE_NAME, entry.name.as_str());
            descriptor.set_metadata(facts::RELEASE_DATE, entry.year.clone());
            descriptor.set_metadata(facts::PUBLISHER, entry.publisher.clone());
            descriptor.set_metadata(facts::DEVELOPER, entry.developer.clone());
            descriptor.set_metadata(facts::COMPATIBILITY, entry.compatibility.clone());
        }

        Ok(Some(descriptor))
    }

    fn is_live(&mut self, unique_id: &str) -> Result<bool, SyncError> {
        Ok(self
            .resolve(unique_id)
            .is_some_and(|path| path.is_file() && self.matches_extension(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> RomDirConfig {
        RomDirConfig {
            id: "nes".to_string(),
            platform: "NES".to_string(),
            path: root.to_path_buf(),
            extensions: vec!["nes".to_string(), ".FDS".to_string()],
            software_lists: vec!["nes".to_string()],
            emulator: Some("mesen".to_string()),
            args: vec!["--fullscreen".to_string(), "{rom}".to_string()],
        }
    }

    fn write_rom(root: &Path, relative: &str, bytes: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_candidates_sorted_and_filtered_by_extension() {
        let dir = TempDir::new().unwrap();
        write_rom(dir.path(), "b/Zelda (USA).nes", b"zelda");
        write_rom(dir.path(), "Metroid (USA).NES", b"metroid");
        write_rom(dir.path(), "a/Doki Doki (Japan).fds", b"doki");
        write_rom(dir.path(), "readme.txt", b"notes");

        let mut source = RomDirSource::new(config(dir.path()), SoftwareIndex::empty());
        let ids: Vec<String> = source
            .iterate_candidates()
            .unwrap()
            .into_iter()
            .map(|c| c.unique_id)
            .collect();
        assert_eq!(
            ids,
            vec!["Metroid (USA).NES", "a/Doki Doki (Japan).fds", "b/Zelda (USA).nes"]
        );
    }

    #[test]
    fn test_missing_root_fails_enumeration() {
        let dir = TempDir::new().unwrap();
        let mut source =
            RomDirSource::new(config(&dir.path().join("unmounted")), SoftwareIndex::empty());
        assert!(source.iterate_candidates().is_err());
    }

    #[test]
    fn test_describe_unidentified_uses_filename() {
        let dir = TempDir::new().unwrap();
        write_rom(dir.path(), "Zelda (USA) (Beta) [!].nes", b"zelda");

        let mut source = RomDirSource::new(config(dir.path()), SoftwareIndex::empty());
        let candidate = Candidate::new("Zelda (USA) (Beta) [!].nes");
        let descriptor = source.describe(&candidate).unwrap().unwrap();

        assert_eq!(descriptor.display_name, "Zelda");
        assert_eq!(descriptor.metadata_str(facts::PLATFORM).as_deref(), Some("NES"));
        assert_eq!(
            descriptor.metadata_list(facts::FILENAME_TAGS),
            vec!["USA", "Beta", "!"]
        );
        assert_eq!(descriptor.metadata_list(facts::STATUS_TAGS), vec!["Beta"]);
        assert_eq!(
            descriptor.metadata_str(facts::CHECKSUM).unwrap(),
            hex::encode(Sha256::digest(b"zelda"))
        );

        let rom = dir.path().join("Zelda (USA) (Beta) [!].nes");
        assert_eq!(descriptor.launch_spec["emulator"], "mesen");
        assert_eq!(descriptor.launch_spec["args"][0], "--fullscreen");
        assert_eq!(descriptor.launch_spec["args"][1], &*rom.to_string_lossy());
    }

    #[test]
    fn test_describe_identified_by_checksum() {
        let dir = TempDir::new().unwrap();
        let roms = dir.path().join("roms");
        let hash = dir.path().join("hash");
        fs::create_dir_all(&hash).unwrap();
        write_rom(&roms, "smb.nes", b"mario");

        let checksum = hex::encode(Sha256::digest(b"mario")).to_uppercase();
        fs::write(
            hash.join("nes.json"),
            serde_json::to_string(&json!({
                "name": "nes",
                "software": [{
                    "name": "smb",
                    "description": "Super Mario Bros.",
                    "year": "1985",
                    "publisher": "Nintendo",
                    "checksums": [checksum],
                }]
            }))
            .unwrap(),
        )
        .unwrap();

        let index = SoftwareIndex::build(&[hash], &["nes".to_string()]);
        let mut source = RomDirSource::new(config(&roms), index);
        let descriptor = source.describe(&Candidate::new("smb.nes")).unwrap().unwrap();

        assert_eq!(descriptor.display_name, "Super Mario Bros.");
        assert_eq!(descriptor.metadata_str(facts::SOFTWARE_NAME).as_deref(), Some("smb"));
        assert_eq!(descriptor.metadata_str(facts::SOFTWARE_LIST).as_deref(), Some("nes"));
        assert_eq!(descriptor.metadata_str(facts::RELEASE_DATE).as_deref(), Some("1985"));
        assert_eq!(descriptor.metadata_str(facts::PUBLISHER).as_deref(), Some("Nintendo"));
    }

    #[test]
    fn test_describe_falls_back_to_serial_tag() {
        let dir = TempDir::new().unwrap();
        let roms = dir.path().join("roms");
        let hash = dir.path().join("hash");
        fs::create_dir_all(&hash).unwrap();
        write_rom(&roms, "Metroid (USA) (NES-MT-USA).nes", b"patched dump");

        fs::write(
            hash.join("nes.json"),
            serde_json::to_string(&json!({
                "name": "nes",
                "software": [{
                    "name": "metroid",
                    "description": "Metroid",
                    "developer": "Nintendo R&D1",
                    "checksums": ["0000"],
                    "serials": ["nes-mt-usa"],
                }]
            }))
            .unwrap(),
        )
        .unwrap();

        let index = SoftwareIndex::build(&[hash], &["nes".to_string()]);
        let mut source = RomDirSource::new(config(&roms), index);
        let descriptor = source
            .describe(&Candidate::new("Metroid (USA) (NES-MT-USA).nes"))
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.display_name, "Metroid");
        assert_eq!(descriptor.metadata_str(facts::SOFTWARE_NAME).as_deref(), Some("metroid"));
        assert_eq!(descriptor.metadata_str(facts::DEVELOPER).as_deref(), Some("Nintendo R&D1"));
    }

    #[test]
    fn test_describe_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut source = RomDirSource::new(config(dir.path()), SoftwareIndex::empty());
        assert!(source.describe(&Candidate::new("gone.nes")).is_err());
        assert!(source.describe(&Candidate::new("../escape.nes")).is_err());
    }

    #[test]
    fn test_is_live() {
        let dir = TempDir::new().unwrap();
        write_rom(dir.path(), "a/game.nes", b"game");

        let mut source = RomDirSource::new(config(dir.path()), SoftwareIndex::empty());
        assert!(source.is_live("a/game.nes").unwrap());
        assert!(!source.is_live("a/other.nes").unwrap());
        assert!(!source.is_live("../a/game.nes").unwrap());

        fs::remove_file(dir.path().join("a/game.nes")).unwrap();
        assert!(!source.is_live("a/game.nes").unwrap());
    }
}
