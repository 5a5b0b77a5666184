//! Marquee CLI - launcher generator
//!
//! # Commands
//!
//! - `marquee sync` - Add launchers for new content and remove launchers whose content is gone
//! - `marquee sync --full-resync` - Delete every launcher and rebuild from scratch
//! - `marquee list` - Print stored launchers
//! - `marquee machine <basename>` - Show a catalog machine and its resolved ancestry
//!
//! Configuration is read from `config.toml` in the platform config
//! directory unless `--config` points elsewhere. `RUST_LOG` overrides the
//! log filter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marquee_core::ancestry::AncestryResolver;
use marquee_core::catalog::{MachineCatalog, ProcessAuthority};
use marquee_core::config::{self, Config};
use marquee_core::disambiguate::Disambiguator;
use marquee_core::store::LauncherStore;
use marquee_core::sync::{RunMode, SyncEngine};
use marquee_library::{registry, summary};

/// Marquee - launcher generator for arcade machines, ROMs and installed games
#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Generate launchers and keep them in sync with your content")]
#[command(version)]
struct Cli {
    /// Config file (default: config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync launchers with every configured source
    Sync {
        /// Delete all launchers first and regenerate everything
        #[arg(long)]
        full_resync: bool,

        /// Skip the name disambiguation pass
        #[arg(long)]
        no_disambiguate: bool,
    },

    /// List stored launchers
    List {
        /// Only show launchers of this source type
        #[arg(long)]
        source: Option<String>,
    },

    /// Show a machine from the arcade catalog
    Machine {
        /// Machine basename
        basename: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            full_resync,
            no_disambiguate,
        } => sync(&config, RunMode::from_full_resync(full_resync), no_disambiguate),
        Commands::List { source } => list(&config, source.as_deref()),
        Commands::Machine { basename } => machine(&config, &basename),
    }
}

fn sync(config: &Config, mode: RunMode, no_disambiguate: bool) -> Result<()> {
    let mut store = LauncherStore::open(config.store_dir()?).context("Failed to open launcher store")?;
    let mut sources = registry::create_source_registry(config)?;
    let disambiguator = Disambiguator::standard();

    let mut engine = SyncEngine::new(&mut store, &mut sources, mode);
    if config.disambiguation.enabled && !no_disambiguate {
        engine = engine.with_disambiguator(&disambiguator);
    }
    let report = engine.run()?;

    print!("{}", summary::render(&report));
    Ok(())
}

fn list(config: &Config, source: Option<&str>) -> Result<()> {
    let store = LauncherStore::open(config.store_dir()?).context("Failed to open launcher store")?;
    for descriptor in store.enumerate() {
        if source.is_some_and(|s| s != descriptor.source_type()) {
            continue;
        }
        println!("{}\t{}", descriptor.key(), descriptor.display_name);
    }
    Ok(())
}

fn machine(config: &Config, basename: &str) -> Result<()> {
    let authority = ProcessAuthority::locate(&config.arcade.executable)?;
    let catalog = MachineCatalog::open(Box::new(authority), &config.cache_dir()?)?;
    let machine = catalog
        .get(basename)
        .with_context(|| format!("Machine '{}' not found in catalog {}", basename, catalog.version()))?;
    let ancestry = AncestryResolver::new().resolve(&machine, &catalog)?;

    println!("{} - {}", machine.basename, machine.name);
    println!("  catalog version: {}", catalog.version());
    println!("  family root: {}", ancestry.family_root);
    if ancestry.is_clone() {
        println!("  parents: {}", ancestry.lineage.join(" -> "));
    }
    if !ancestry.bios_chain.is_empty() {
        println!("  bios: {}", ancestry.bios_chain.join(" -> "));
    }
    for (key, value) in &ancestry.facts {
        let marker = if ancestry.inherited_facts.contains_key(key) { " (inherited)" } else { "" };
        println!("  {}: {}{}", key, value, marker);
    }
    Ok(())
}
