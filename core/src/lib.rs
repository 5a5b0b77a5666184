//! Marquee Core - launcher sync and resolution engine
//!
//! Discovers playable content across heterogeneous sources and keeps a
//! persisted set of launcher descriptors in step with them.
//!
//! # Architecture
//!
//! - [`MachineCatalog`] - versioned machine catalog backed by an external authority, with an on-disk cache
//! - [`AncestryResolver`] - clone/parent and BIOS chains, memoized per run
//! - [`SoftwareIndex`] - checksum and serial lookup over merged software catalogs
//! - [`LauncherStore`] - one persisted record per launcher descriptor
//! - [`SyncEngine`] - per-source add phase and removal sweep
//! - [`Disambiguator`] - post-pass that separates colliding display names

pub mod ancestry;
pub mod catalog;
pub mod config;
pub mod disambiguate;
pub mod error;
pub mod softlist;
pub mod source;
pub mod store;
pub mod sync;

pub use ancestry::{AncestryResolver, MachineLookup, ResolvedAncestry};
pub use catalog::{Authority, MachineCatalog, ProcessAuthority};
pub use config::Config;
pub use disambiguate::{DisambiguationReport, Disambiguator, Strategy};
pub use error::{StoreError, SyncError};
pub use softlist::{SoftwareEntry, SoftwareIndex};
pub use source::{Candidate, ContentSource, SourceRegistry};
pub use store::LauncherStore;
pub use sync::{RunMode, SyncEngine, SyncReport, SyncState};
