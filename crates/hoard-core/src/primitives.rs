//! # Store Primitives
//!
//! Hardcoded limits and format constants for the Hoard store.
//!
//! These are compiled into the binary and are immutable at runtime.

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Alphabet for allocated identifiers (Crockford base32).
///
/// Excludes `I`, `L`, `O` and `U` so a handwritten or printed label cannot be
/// misread as a different id; [`crate::ident::normalize_label`] maps those
/// letters back onto their lookalikes.
pub const ID_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of an allocated identifier.
///
/// 32^6 is roughly one billion ids, far above any household catalog.
pub const ID_LENGTH: usize = 6;

/// How many candidates the allocator tries before giving up.
pub const MAX_ID_ATTEMPTS: usize = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for location and item names, in bytes.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length for descriptions, in bytes.
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;

/// Maximum length of a single tag, in bytes.
pub const MAX_TAG_LENGTH: usize = 64;

/// Maximum number of tags on one item.
pub const MAX_TAGS_PER_ITEM: usize = 64;

/// Maximum number of photos on one record.
pub const MAX_PHOTOS_PER_ENTITY: usize = 32;

/// Maximum size of a single photo (20 MB).
pub const MAX_PHOTO_BYTES: usize = 20 * 1024 * 1024;

// =============================================================================
// ARCHIVE FORMAT
// =============================================================================

/// Manifest version written by this build.
pub const FORMAT_VERSION: u32 = 3;

/// Oldest manifest version this build can upgrade.
pub const OLDEST_FORMAT_VERSION: u32 = 1;

/// Name of the manifest inside an archive.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory holding photo payloads inside an archive.
pub const PHOTO_DIR: &str = "photos";

/// Maximum accepted archive size (1 GB).
///
/// Checked before the zip directory is parsed.
pub const MAX_ARCHIVE_BYTES: usize = 1024 * 1024 * 1024;

/// Maximum accepted manifest size (64 MB).
pub const MAX_MANIFEST_BYTES: u64 = 64 * 1024 * 1024;

// =============================================================================
// STORE SCHEMA
// =============================================================================

/// Schema version of the on-disk store written by this build.
pub const SCHEMA_VERSION: u64 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_no_confusable_letters() {
        for banned in [b'I', b'L', b'O', b'U'] {
            assert!(!ID_ALPHABET.contains(&banned));
        }
    }

    #[test]
    fn alphabet_is_unique() {
        let mut sorted = ID_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ID_ALPHABET.len());
    }
}
