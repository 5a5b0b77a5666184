//! Marquee launcher generator
//!
//! Wires configuration to the sync engine: builds the content source
//! registry and renders end-of-run summaries for the `marquee` binary.

pub mod registry;
pub mod summary;
