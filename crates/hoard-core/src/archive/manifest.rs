//! # Manifest Wire Format
//!
//! JSON shapes of `manifest.json` for every archive generation this build
//! reads. Field names are camelCase on the wire.
//!
//! - v1: Locations, a separate `containers` collection, and Items that
//!   point at a Location plus an optional container.
//! - v2: containers folded into Items (`canHoldItems`); every Item has a
//!   required `parentId`/`parentType`; prices are decimal numbers.
//! - v3: optional Item parent, `includeInTotal`, prices in integer minor
//!   units. This is what [`super::export_archive`] writes.

use crate::primitives::{FORMAT_VERSION, OLDEST_FORMAT_VERSION};
use crate::{EntityId, EntityKind, HoardError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_quantity() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

// =============================================================================
// SHARED
// =============================================================================

/// A Location record. Unchanged across all generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// VERSION 3 (CURRENT)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub parent_type: Option<EntityKind>,
    #[serde(default)]
    pub can_hold_items: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default = "default_true")]
    pub include_in_total: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Minor units.
    #[serde(default)]
    pub purchase_price: Option<i64>,
    /// Minor units.
    #[serde(default)]
    pub current_value: Option<i64>,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV3 {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

// =============================================================================
// VERSION 2
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecordV2 {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub parent_id: EntityId,
    pub parent_type: EntityKind,
    #[serde(default)]
    pub can_hold_items: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Decimal major units, e.g. `12.5`.
    #[serde(default)]
    pub purchase_price: Option<serde_json::Number>,
    #[serde(default)]
    pub current_value: Option<serde_json::Number>,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV2 {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecordV2>,
}

// =============================================================================
// VERSION 1
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecordV1 {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location_id: EntityId,
    #[serde(default)]
    pub parent_container_id: Option<EntityId>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecordV1 {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub location_id: EntityId,
    #[serde(default)]
    pub container_id: Option<EntityId>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub purchase_price: Option<serde_json::Number>,
    #[serde(default)]
    pub current_value: Option<serde_json::Number>,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV1 {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub containers: Vec<ContainerRecordV1>,
    #[serde(default)]
    pub items: Vec<ItemRecordV1>,
}

// =============================================================================
// VERSION DISPATCH
// =============================================================================

/// A parsed manifest of any supported generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    V1(ManifestV1),
    V2(ManifestV2),
    V3(ManifestV3),
}

impl Manifest {
    /// Select the wire shape by the `version` tag and parse into it.
    ///
    /// # Errors
    ///
    /// `ArchiveFormat` when the tag is missing, names a version this build
    /// does not read, or the body does not match that version's shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, HoardError> {
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                HoardError::ArchiveFormat("manifest has no numeric version tag".to_string())
            })?;

        let malformed = |e: serde_json::Error| {
            HoardError::ArchiveFormat(format!("manifest v{} is malformed: {}", version, e))
        };
        match version {
            1 => serde_json::from_value(value).map(Self::V1).map_err(malformed),
            2 => serde_json::from_value(value).map(Self::V2).map_err(malformed),
            3 => serde_json::from_value(value).map(Self::V3).map_err(malformed),
            other => Err(HoardError::ArchiveFormat(format!(
                "unsupported archive version {} (this build reads {} to {})",
                other, OLDEST_FORMAT_VERSION, FORMAT_VERSION
            ))),
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        match self {
            Self::V1(m) => m.version,
            Self::V2(m) => m.version,
            Self::V3(m) => m.version,
        }
    }

    #[must_use]
    pub fn exported_at(&self) -> DateTime<Utc> {
        match self {
            Self::V1(m) => m.exported_at,
            Self::V2(m) => m.exported_at,
            Self::V3(m) => m.exported_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_version_tag() {
        let v2 = json!({
            "version": 2,
            "exportedAt": "2023-02-01T10:00:00Z",
            "locations": [],
            "items": [{
                "id": "a1", "parentId": "l1", "parentType": "location",
                "purchasePrice": 12.5,
                "createdAt": "2023-01-01T00:00:00Z", "updatedAt": "2023-01-01T00:00:00Z"
            }]
        });
        let manifest = Manifest::from_json(v2).expect("parse");
        assert_eq!(manifest.version(), 2);
        assert!(matches!(manifest, Manifest::V2(ref m) if m.items[0].quantity == 1));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let result = Manifest::from_json(json!({ "version": 9, "exportedAt": "2023-01-01T00:00:00Z" }));
        assert!(matches!(result, Err(HoardError::ArchiveFormat(_))));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        // v2 requires a parent on every item.
        let result = Manifest::from_json(json!({
            "version": 2,
            "exportedAt": "2023-01-01T00:00:00Z",
            "items": [{ "id": "x", "createdAt": "2023-01-01T00:00:00Z", "updatedAt": "2023-01-01T00:00:00Z" }]
        }));
        assert!(matches!(result, Err(HoardError::ArchiveFormat(_))));

        let no_tag = Manifest::from_json(json!({ "locations": [] }));
        assert!(matches!(no_tag, Err(HoardError::ArchiveFormat(_))));
    }

    #[test]
    fn current_prices_must_be_integers() {
        let result = Manifest::from_json(json!({
            "version": 3,
            "exportedAt": "2023-01-01T00:00:00Z",
            "items": [{
                "id": "x", "purchasePrice": 1.5,
                "createdAt": "2023-01-01T00:00:00Z", "updatedAt": "2023-01-01T00:00:00Z"
            }]
        }));
        assert!(matches!(result, Err(HoardError::ArchiveFormat(_))));
    }
}
