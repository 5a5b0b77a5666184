//! Machine catalog and cache.
//!
//! Wraps the external, versioned catalog authority and persists one cache
//! entry per machine, namespaced by authority version.

mod authority;
mod cache;
#[cfg(test)]
pub(crate) mod fake;
mod listing;

pub use authority::{Authority, ProcessAuthority, StreamStats};
pub use cache::{CompletionMarker, MachineCatalog, MachineIter};
pub use listing::parse_machine;
