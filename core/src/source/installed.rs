//! Installed packages listed in a JSON manifest.

use std::path::{Path, PathBuf};

use anyhow::Context;
use hashbrown::HashMap;
use marquee_shared::fs::{MAX_RECORD_BYTES, read_file_with_limit};
use marquee_shared::{LauncherDescriptor, LauncherKey, facts};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{Candidate, ContentSource};
use crate::config::InstalledConfig;
use crate::error::SyncError;

const DEFAULT_PLATFORM: &str = "PC";

/// On-disk manifest format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub packages: Vec<InstalledPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub id: String,
    pub name: String,
    /// Relative paths are resolved against the manifest's directory.
    pub install_dir: PathBuf,
    /// Executable inside `install_dir`.
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

pub struct InstalledSource {
    config: InstalledConfig,
    /// Packages from the last manifest read, by id.
    packages: Option<HashMap<String, InstalledPackage>>,
}

impl InstalledSource {
    pub fn new(config: InstalledConfig) -> Self {
        Self {
            config,
            packages: None,
        }
    }

    fn read_manifest(&self) -> anyhow::Result<Vec<InstalledPackage>> {
        let path = &self.config.manifest;
        let bytes = read_file_with_limit(path, MAX_RECORD_BYTES)?;
        let manifest: PackageManifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid package manifest: {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new(""));
        Ok(manifest
            .packages
            .into_iter()
            .filter(|p| {
                let valid = !p.id.trim().is_empty();
                if !valid {
                    warn!(source = %self.config.id, "Skipping package without an id");
                }
                valid
            })
            .map(|mut p| {
                if p.install_dir.is_relative() {
                    p.install_dir = base.join(&p.install_dir);
                }
                p
            })
            .collect())
    }

    /// Cached packages, reading the manifest on first use.
    fn packages(&mut self) -> Result<&HashMap<String, InstalledPackage>, SyncError> {
        let packages = match self.packages.take() {
            Some(packages) => packages,
            None => self
                .read_manifest()?
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        };
        Ok(self.packages.insert(packages))
    }
}

impl ContentSource for InstalledSource {
    fn source_type(&self) -> &str {
        &self.config.id
    }

    fn iterate_candidates(&mut self) -> Result<Vec<Candidate>, SyncError> {
        self.packages = None;
        let packages = self.read_manifest()?;
        let candidates = packages
            .iter()
            .map(|p| Candidate::new(&p.id).with_fact(facts::FILENAME, p.name.as_str()))
            .collect();
        self.packages = Some(packages.into_iter().map(|p| (p.id.clone(), p)).collect());
        Ok(candidates)
    }

    fn describe(
        &mut self,
        candidate: &Candidate,
    ) -> Result<Option<LauncherDescriptor>, SyncError> {
        let source_type = self.config.id.clone();
        let Some(package) = self.packages()?.get(&candidate.unique_id) else {
            return Err(SyncError::not_found("package", &candidate.unique_id));
        };
        if !package.install_dir.is_dir() {
            debug!(
                source = %source_type,
                unique_id = %package.id,
                "Install directory missing, skipping"
            );
            return Ok(None);
        }

        let program = match &package.executable {
            Some(exe) => package.install_dir.join(exe),
            None => package.install_dir.clone(),
        };
        let platform = package.platform.as_deref().unwrap_or(DEFAULT_PLATFORM);

        let descriptor = LauncherDescriptor::new(
            LauncherKey::new(source_type, &package.id),
            package.name.trim(),
        )
        .with_metadata(facts::PLATFORM, platform)
        .with_metadata(facts::DEVELOPER, package.developer.clone())
        .with_metadata(facts::PUBLISHER, package.publisher.clone())
        .with_metadata(facts::RELEASE_DATE, package.release_date.clone())
        .with_launch_spec(json!({
            "executable": program.to_string_lossy(),
            "working_dir": package.install_dir.to_string_lossy(),
            "args": package.args,
        }));
        Ok(Some(descriptor))
    }

    fn is_live(&mut self, unique_id: &str) -> Result<bool, SyncError> {
        Ok(self
            .packages()?
            .get(unique_id)
            .is_some_and(|p| p.install_dir.is_dir()))
    }
}
