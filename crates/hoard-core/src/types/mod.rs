//! # Core Type Definitions
//!
//! This module contains all core types for the Hoard inventory store:
//! - Identifiers and kinds (`EntityId`, `EntityKind`, `ParentRef`)
//! - Records (`Location`, `Item`, `Entity`, `Photo`, `Money`)
//! - Create/update inputs (`NewLocation`, `NewItem`, `LocationPatch`, `ItemPatch`)
//! - Error and warning types (`HoardError`, `IntegrityWarning`)
//!
//! ## Ordering Guarantees
//!
//! Every keyed collection uses `BTreeMap`/`BTreeSet` so listings, exports
//! and tag indexes come out in the same order on every run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a Location or an Item.
///
/// Locations and Items share a single namespace: an id is never used by
/// both kinds at once. Allocated ids are short Crockford-style labels
/// (see [`crate::ident`]); imported ids may be any non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap a string as an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The two entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Location,
    Item,
}

impl EntityKind {
    /// Lowercase name used in archives, filenames and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Item => "item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = HoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "location" | "locations" => Ok(Self::Location),
            "item" | "items" => Ok(Self::Item),
            other => Err(HoardError::Validation(format!(
                "unknown entity kind '{}' (expected location or item)",
                other
            ))),
        }
    }
}

/// Where an Item lives.
///
/// Locations only ever nest inside Locations, so their parent is a bare
/// `EntityId`. Items can sit in a Location or inside a container Item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParentRef {
    Location(EntityId),
    Item(EntityId),
}

impl ParentRef {
    /// The parent's identifier.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Location(id) | Self::Item(id) => id,
        }
    }

    /// The parent's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Location(_) => EntityKind::Location,
            Self::Item(_) => EntityKind::Item,
        }
    }

    /// Build a parent reference from an id and a kind.
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        match kind {
            EntityKind::Location => Self::Location(id),
            EntityKind::Item => Self::Item(id),
        }
    }
}

// =============================================================================
// MONEY
// =============================================================================

/// A monetary amount in integer minor units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    /// Raw minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Multiply by a quantity, saturating at the `i64` bounds.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// Add two amounts, saturating at the `i64` bounds.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Parse a decimal string such as `"12.5"` or `"-3.999"`.
    ///
    /// Digits past the second decimal place are rounded half-up. The
    /// returned flag is `true` when rounding changed the value. Exponent
    /// notation and anything else non-decimal yields `None`.
    #[must_use]
    pub fn parse_decimal(text: &str) -> Option<(Self, bool)> {
        let text = text.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let mut units: i64 = 0;
        for digit in whole.bytes() {
            units = units
                .checked_mul(10)?
                .checked_add(i64::from(digit - b'0'))?;
        }
        let mut frac_digits = frac.bytes();
        for _ in 0..2 {
            let digit = frac_digits.next().map_or(0, |d| i64::from(d - b'0'));
            units = units.checked_mul(10)?.checked_add(digit)?;
        }
        let rest: Vec<u8> = frac_digits.collect();
        let lossy = rest.iter().any(|&d| d != b'0');
        if rest.first().is_some_and(|&d| d >= b'5') {
            units = units.checked_add(1)?;
        }

        Some((Self(if negative { -units } else { units }), lossy))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// PHOTOS
// =============================================================================

/// Photo mime types accepted by the store, with their archive file extension.
///
/// The mapping is one-to-one so a photo's mime type survives an
/// export/import cycle through its filename alone.
pub const PHOTO_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/heic", "heic"),
];

/// File extension for a supported photo mime type.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    PHOTO_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(mime_type))
        .map(|(_, ext)| *ext)
}

/// Mime type for an archive file extension. `jpeg` is accepted as an alias.
#[must_use]
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    let extension = if extension == "jpeg" { "jpg" } else { extension.as_str() };
    PHOTO_TYPES
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| *mime)
}

/// A binary photo attachment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Photo {
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Photo")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A named place. Locations nest only inside other Locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<EntityId>,
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A unit of inventory, optionally a container for other Items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: EntityId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub can_hold_items: bool,
    /// Always 1 for containers.
    pub quantity: u32,
    pub include_in_total: bool,
    pub tags: BTreeSet<String>,
    pub purchase_price: Option<Money>,
    pub current_value: Option<Money>,
    pub acquired_on: Option<NaiveDate>,
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Name for display; unnamed items fall back to their id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Item {}", self.id))
    }

    /// Whether this item sits in the given parent.
    #[must_use]
    pub fn is_child_of(&self, parent_id: &EntityId) -> bool {
        self.parent.as_ref().is_some_and(|p| p.id() == parent_id)
    }
}

/// Either kind of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Location(Location),
    Item(Item),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Location(l) => &l.id,
            Self::Item(i) => &i.id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Location(_) => EntityKind::Location,
            Self::Item(_) => EntityKind::Item,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Location(l) => l.name.clone(),
            Self::Item(i) => i.display_name(),
        }
    }

    /// The parent's identifier, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<&EntityId> {
        match self {
            Self::Location(l) => l.parent_id.as_ref(),
            Self::Item(i) => i.parent.as_ref().map(ParentRef::id),
        }
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Self::Location(l) => l.updated_at,
            Self::Item(i) => i.updated_at,
        }
    }
}

// =============================================================================
// INPUTS
// =============================================================================

/// Fields for creating a Location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLocation {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<EntityId>,
    pub photos: Vec<Photo>,
}

/// Fields for creating an Item.
///
/// `quantity` is signed so that a negative value coming from a form or a
/// request body is rejected as a validation failure instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub can_hold_items: bool,
    pub quantity: i64,
    pub include_in_total: bool,
    pub tags: Vec<String>,
    pub purchase_price: Option<Money>,
    pub current_value: Option<Money>,
    pub acquired_on: Option<NaiveDate>,
    pub photos: Vec<Photo>,
}

impl Default for NewItem {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            parent: None,
            can_hold_items: false,
            quantity: 1,
            include_in_total: true,
            tags: Vec::new(),
            purchase_price: None,
            current_value: None,
            acquired_on: None,
            photos: Vec::new(),
        }
    }
}

/// Partial update for a Location. `None` leaves a field untouched;
/// `Some(None)` clears a clearable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<EntityId>>,
    pub photos: Option<Vec<Photo>>,
}

/// Partial update for an Item. Same conventions as [`LocationPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub parent: Option<Option<ParentRef>>,
    pub can_hold_items: Option<bool>,
    pub quantity: Option<i64>,
    pub include_in_total: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub purchase_price: Option<Option<Money>>,
    pub current_value: Option<Option<Money>>,
    pub acquired_on: Option<Option<NaiveDate>>,
    pub photos: Option<Vec<Photo>>,
}

// =============================================================================
// WARNINGS
// =============================================================================

/// A non-fatal anomaly found while cascading, resolving paths or importing.
///
/// Warnings are always collected and handed back to the caller, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// An archive record references a photo file the archive does not contain.
    MissingPhoto { id: EntityId, file: String },
    /// A parent reference points at a record that does not exist.
    DanglingParent {
        id: EntityId,
        parent_id: EntityId,
    },
    /// A traversal reached an id it had already visited.
    CycleDetected { id: EntityId },
    /// The id is already used by the other entity kind.
    IdCollision { id: EntityId, kind: EntityKind },
    /// The parent exists but cannot hold this record.
    InvalidParent {
        id: EntityId,
        parent_id: EntityId,
        reason: String,
    },
    /// Upgrading an older archive changed a value.
    LossyMigration { id: EntityId, detail: String },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPhoto { id, file } => {
                write!(f, "{}: photo '{}' missing from archive", id, file)
            }
            Self::DanglingParent { id, parent_id } => {
                write!(f, "{}: parent {} does not exist", id, parent_id)
            }
            Self::CycleDetected { id } => write!(f, "{}: cycle in parent chain", id),
            Self::IdCollision { id, kind } => {
                write!(f, "{}: id already used by a {}", id, kind)
            }
            Self::InvalidParent {
                id,
                parent_id,
                reason,
            } => write!(f, "{}: parent {} rejected ({})", id, parent_id, reason),
            Self::LossyMigration { id, detail } => write!(f, "{}: {}", id, detail),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Hoard store.
///
/// Single-record operations return these. Batch operations (cascades,
/// imports, tag rewrites) collect per-record failures in their reports
/// instead of aborting.
#[derive(Debug, Error)]
pub enum HoardError {
    /// The target record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// Create/update input was rejected before any write.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The archive could not be parsed or has an unsupported version.
    #[error("Archive format error: {0}")]
    ArchiveFormat(String),

    /// No collision-free identifier was found within the attempt budget.
    #[error("Identifier allocation exhausted after {attempts} attempts")]
    IdentifierExhausted { attempts: usize },

    /// The underlying store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl HoardError {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: EntityKind, id: &EntityId) -> Self {
        Self::NotFound {
            kind,
            id: id.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
