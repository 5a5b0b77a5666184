//! Content source registry construction.

use std::path::Path;

use anyhow::Result;
use marquee_core::catalog::{MachineCatalog, ProcessAuthority};
use marquee_core::config::Config;
use marquee_core::softlist::SoftwareIndex;
use marquee_core::source::{ArcadeSource, InstalledSource, RomDirSource, SourceRegistry};
use tracing::{info, warn};

/// Create a source registry with every source the configuration enables.
///
/// An arcade authority that cannot be found or invoked disables the arcade
/// source for this run; everything else still syncs.
pub fn create_source_registry(config: &Config) -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();

    if config.arcade.enabled {
        if let Some(source) = arcade_source(config, &config.cache_dir()?) {
            registry.register(Box::new(source))?;
        }
    } else {
        info!("Arcade source disabled in config");
    }

    for rom_dir in &config.rom_dirs {
        let index = if rom_dir.software_lists.is_empty() {
            SoftwareIndex::empty()
        } else {
            SoftwareIndex::build(&config.software_lists.dirs, &rom_dir.software_lists)
        };
        registry.register(Box::new(RomDirSource::new(rom_dir.clone(), index)))?;
    }

    for installed in &config.installed {
        registry.register(Box::new(InstalledSource::new(installed.clone())))?;
    }

    Ok(registry)
}

fn arcade_source(config: &Config, cache_dir: &Path) -> Option<ArcadeSource> {
    let authority = match ProcessAuthority::locate(&config.arcade.executable) {
        Ok(authority) => authority,
        Err(e) => {
            warn!("Arcade source disabled for this run: {}", e);
            return None;
        }
    };

    match MachineCatalog::open(Box::new(authority), cache_dir) {
        Ok(catalog) => {
            info!(version = %catalog.version(), "Arcade catalog ready");
            Some(ArcadeSource::new(catalog, config.arcade.clone()))
        }
        Err(e) => {
            warn!("Arcade source disabled for this run: {}", e);
            None
        }
    }
}
