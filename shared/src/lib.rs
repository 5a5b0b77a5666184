//! Shared types for the Marquee launcher generator.
//!
//! Everything here is plain data: machines as reported by the catalog
//! authority, launcher descriptors as persisted by the launcher store, and
//! the small filesystem helpers both sides need.

pub mod descriptor;
pub mod facts;
pub mod fs;
pub mod ids;
pub mod machine;

pub use descriptor::{LauncherDescriptor, LauncherKey, Metadata};
pub use machine::{Facts, Machine};
