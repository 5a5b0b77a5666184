//! Well-known fact and metadata keys.
//!
//! Machine facts come from the catalog authority; metadata keys are what
//! content sources write into launcher descriptors and what disambiguation
//! strategies read back.

// Machine facts reported by the catalog authority
pub const SOURCE_FILE: &str = "source_file";
pub const YEAR: &str = "year";
pub const MANUFACTURER: &str = "manufacturer";
pub const IS_BIOS: &str = "is_bios";
pub const IS_DEVICE: &str = "is_device";
pub const IS_MECHANICAL: &str = "is_mechanical";
pub const RUNNABLE: &str = "runnable";
pub const DRIVER_STATUS: &str = "driver_status";
pub const PLAYERS: &str = "players";
pub const GENRE: &str = "genre";

// Descriptor metadata
pub const PLATFORM: &str = "platform";
pub const CATEGORY: &str = "category";
pub const ARCADE_SYSTEM: &str = "arcade_system";
pub const RELEASE_DATE: &str = "release_date";
pub const PUBLISHER: &str = "publisher";
pub const DEVELOPER: &str = "developer";
pub const FILENAME_TAGS: &str = "filename_tags";
pub const STATUS_TAGS: &str = "status_tags";
pub const FAMILY: &str = "family";
pub const BIOS: &str = "bios";
pub const CHECKSUM: &str = "checksum";
pub const SOFTWARE_LIST: &str = "software_list";
pub const SOFTWARE_NAME: &str = "software_name";
pub const COMPATIBILITY: &str = "compatibility";
pub const EMULATION_STATUS: &str = "emulation_status";
pub const FILENAME: &str = "filename";
