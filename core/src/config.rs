//! Configuration management (config.toml)
//!
//! Every section and field has a default, so an empty file (or no file at
//! all in the default location) yields a usable configuration with just the
//! arcade source enabled.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hashbrown::HashSet;
use marquee_shared::ids::is_safe_path_component;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::ARCADE_SOURCE_TYPE;

const CONFIG_FILE: &str = "config.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub arcade: ArcadeConfig,
    #[serde(default)]
    pub software_lists: SoftwareListsConfig,
    #[serde(default)]
    pub rom_dirs: Vec<RomDirConfig>,
    #[serde(default)]
    pub installed: Vec<InstalledConfig>,
    #[serde(default)]
    pub disambiguation: DisambiguationConfig,
}

/// Where launchers and cached catalog data live.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Launcher store directory (default: `<data dir>/launchers`)
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Machine cache directory (default: `<cache dir>/machines`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Arcade machine source backed by the catalog authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadeConfig {
    /// Whether to scan the arcade catalog (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Authority executable, a name on `PATH` or a path (default: "mame")
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Only generate launchers for machines whose romset verifies (default: false)
    #[serde(default)]
    pub verify_romsets: bool,
    /// Include mechanical machines such as pinball tables (default: false)
    #[serde(default)]
    pub include_mechanical: bool,
    /// Include machines the authority marks as not runnable (default: false)
    #[serde(default)]
    pub include_non_runnable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftwareListsConfig {
    /// Directories holding software catalog files, in merge order.
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
}

/// One scanned ROM directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomDirConfig {
    /// Source type of the generated launchers.
    pub id: String,
    /// Platform name recorded on each launcher.
    pub platform: String,
    pub path: PathBuf,
    /// File extensions to pick up, without the dot; matched case-insensitively.
    pub extensions: Vec<String>,
    /// Software lists used to identify files by checksum.
    #[serde(default)]
    pub software_lists: Vec<String>,
    #[serde(default)]
    pub emulator: Option<String>,
    /// Launch arguments; `{rom}` is replaced by the ROM path (default: ["{rom}"])
    #[serde(default = "default_rom_args")]
    pub args: Vec<String>,
}

/// One installed-package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledConfig {
    /// Source type of the generated launchers.
    pub id: String,
    pub manifest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationConfig {
    /// Run the disambiguation pass after sync (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}
fn default_executable() -> String {
    "mame".to_string()
}
fn default_rom_args() -> Vec<String> {
    vec!["{rom}".to_string()]
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            executable: default_executable(),
            verify_romsets: false,
            include_mechanical: false,
            include_non_runnable: false,
        }
    }
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io.marquee", "", "Marquee")
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Marquee\config`
/// On macOS: `~/Library/Application Support/io.marquee.Marquee`
/// On Linux: `~/.config/marquee`
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Loads and validates the configuration.
///
/// An explicit `path` must exist and parse. Without one, the default
/// location is used and a missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => read(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read(&path)?,
            _ => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };
    config.validate()?;
    Ok(config)
}

fn read(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

impl Config {
    /// Checks source ids and per-source settings.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(ARCADE_SOURCE_TYPE);

        let ids = self
            .rom_dirs
            .iter()
            .map(|d| d.id.as_str())
            .chain(self.installed.iter().map(|i| i.id.as_str()));
        for id in ids {
            if !is_safe_path_component(id) {
                bail!("Invalid source id '{}': must be a plain directory name", id);
            }
            if !seen.insert(id) {
                bail!("Source id '{}' is reserved or used more than once", id);
            }
        }

        for rom_dir in &self.rom_dirs {
            if rom_dir.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
                bail!("ROM directory '{}' lists no file extensions", rom_dir.id);
            }
        }
        Ok(())
    }

    /// Launcher store directory.
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.store_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("launchers"))
            .context("Could not determine a data directory; set paths.store_dir")
    }

    /// Machine cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.cache_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.cache_dir().join("machines"))
            .context("Could not determine a cache directory; set paths.cache_dir")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.arcade.enabled);
        assert_eq!(config.arcade.executable, "mame");
        assert!(config.disambiguation.enabled);
        assert!(config.rom_dirs.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            store_dir = "/tmp/launchers"

            [arcade]
            enabled = false
            verify_romsets = true

            [software_lists]
            dirs = ["/usr/share/hash"]

            [[rom_dirs]]
            id = "snes"
            platform = "Super Nintendo"
            path = "/roms/snes"
            extensions = ["sfc", "smc"]
            software_lists = ["snes"]
            emulator = "snes9x"

            [[installed]]
            id = "pc"
            manifest = "/games/manifest.json"
            "#,
        )
        .unwrap();

        assert!(!config.arcade.enabled);
        assert!(config.arcade.verify_romsets);
        assert_eq!(config.paths.store_dir, Some(PathBuf::from("/tmp/launchers")));
        assert_eq!(config.rom_dirs[0].args, vec!["{rom}"]);
        assert_eq!(config.rom_dirs[0].software_lists, vec!["snes"]);
        assert_eq!(config.installed[0].id, "pc");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_and_reserved_ids_rejected() {
        let mut config = Config::default();
        config.installed.push(InstalledConfig {
            id: "arcade".to_string(),
            manifest: PathBuf::from("m.json"),
        });
        assert!(config.validate().is_err());

        config.installed[0].id = "pc".to_string();
        config.installed.push(InstalledConfig {
            id: "pc".to_string(),
            manifest: PathBuf::from("other.json"),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsafe_id_rejected() {
        let mut config = Config::default();
        config.installed.push(InstalledConfig {
            id: "../pc".to_string(),
            manifest: PathBuf::from("m.json"),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[arcade]\nexecutable = \"/opt/mame/mame\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.arcade.executable, "/opt/mame/mame");
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[arcade\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn test_explicit_dirs_override_defaults() {
        let mut config = Config::default();
        config.paths.cache_dir = Some(PathBuf::from("/var/cache/marquee"));
        assert_eq!(
            config.cache_dir().unwrap(),
            PathBuf::from("/var/cache/marquee")
        );
    }
}
