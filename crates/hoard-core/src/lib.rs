//! # hoard-core
//!
//! The hierarchical entity store behind Hoard, a home-inventory catalog.
//!
//! Locations nest inside Locations; Items sit in a Location, inside a
//! container Item, or nowhere (unassigned). This crate keeps that graph
//! consistent and derives everything computed from it:
//!
//! - `store` / `storage`: record-level persistence (in-memory or redb)
//! - `catalog`: validated create/read/update/delete, the single writer
//! - `hierarchy`: cascading delete and ancestor paths
//! - `aggregate`: recursive totals, valuation and the tag index
//! - `archive`: zip export, preview, and versioned import
//! - `ident`: short label-friendly identifiers
//!
//! ## Architectural Constraints
//!
//! - Synchronous. No async, no network.
//! - Money is integer minor units; there is no floating point.
//! - Every keyed collection is ordered (`BTreeMap`/`BTreeSet`).

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregate;
pub mod archive;
pub mod catalog;
pub mod clock;
pub mod hierarchy;
pub mod ident;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Entity, EntityId, EntityKind, HoardError, IntegrityWarning, Item, ItemPatch, Location,
    LocationPatch, Money, NewItem, NewLocation, PHOTO_TYPES, ParentRef, Photo,
    extension_for_mime, mime_for_extension,
};

// =============================================================================
// RE-EXPORTS: Store and Engines
// =============================================================================

pub use aggregate::{
    ChildCounts, TagCount, TagRewriteReport, Valuation, delete_tag, direct_child_counts,
    rename_tag, tag_index, total_item_count, total_value,
};
pub use archive::{
    ArchivePreview, ImportResult, KindCounts, export_archive, import_archive, preview_archive,
};
pub use catalog::{Catalog, CatalogStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hierarchy::{
    AncestorPath, CascadeReport, PathSegment, delete_cascade, delete_item_cascade,
    delete_location_cascade, resolve_ancestor_path,
};
pub use ident::{IdAllocator, normalize_label};
pub use storage::{RedbStore, StorageBackend};
pub use store::{EntityStore, MemoryStore};
