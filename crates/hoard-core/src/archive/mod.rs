//! # Archive
//!
//! Backup and restore of the whole catalog as a single zip file:
//!
//! ```text
//! manifest.json
//! photos/location-<id>-<n>.<ext>
//! photos/item-<id>-<n>.<ext>
//! ```
//!
//! The manifest carries a `version` tag. Export always writes the current
//! version; import reads every version back to the first and upgrades it
//! step by step (see [`migrate`]).

#[cfg(feature = "crypto-hash")]
pub mod digest;
pub mod export;
pub mod import;
pub mod manifest;
pub mod migrate;

#[cfg(feature = "crypto-hash")]
pub use digest::{archive_digest, catalog_digest};
pub use export::{export_archive, photo_filename};
pub use import::{
    ArchivePreview, ImportFailure, ImportResult, KindCounts, ManifestCounts, import_archive,
    preview_archive,
};
pub use manifest::Manifest;
