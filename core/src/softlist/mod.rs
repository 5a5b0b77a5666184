//! Software catalogs: checksum-indexed descriptions of playable content.

mod entry;
mod index;

pub use entry::SoftwareEntry;
pub use index::SoftwareIndex;
