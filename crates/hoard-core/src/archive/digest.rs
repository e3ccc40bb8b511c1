//! # Content Digests
//!
//! BLAKE3 digests for archives and catalog contents.
//!
//! An archive's own bytes change with every export (the manifest carries
//! the export time), so [`catalog_digest`] hashes the records themselves:
//! two catalogs with identical records hash identically, which is how a
//! restore is checked against its source.
//!
//! Only available with the `crypto-hash` feature enabled.

use crate::catalog::Catalog;
use crate::store::EntityStore;
use crate::HoardError;

/// BLAKE3 hex digest of raw bytes (64 characters).
#[must_use]
pub fn archive_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// BLAKE3 hex digest over every record, Locations then Items, in id order.
pub fn catalog_digest(catalog: &Catalog) -> Result<String, HoardError> {
    let mut locations = catalog.backend().locations()?;
    let mut items = catalog.backend().items()?;
    locations.sort_by(|a, b| a.id.cmp(&b.id));
    items.sort_by(|a, b| a.id.cmp(&b.id));

    let encode = |e: postcard::Error| HoardError::Serialization(e.to_string());
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"locations");
    for location in &locations {
        hasher.update(&postcard::to_allocvec(location).map_err(encode)?);
    }
    hasher.update(b"items");
    for item in &items {
        hasher.update(&postcard::to_allocvec(item).map_err(encode)?);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
