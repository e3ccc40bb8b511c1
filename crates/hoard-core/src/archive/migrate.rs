//! # Manifest Migration
//!
//! Older manifests are brought to the current shape one version at a time:
//! v1 -> v2 -> v3. Each step only knows its own two versions.
//!
//! Conversions that change a value (a price with sub-cent digits, a price
//! that cannot be read) are reported as `LossyMigration` warnings.

use super::manifest::{ItemRecord, ItemRecordV2, Manifest, ManifestV1, ManifestV2, ManifestV3};
use crate::primitives::FORMAT_VERSION;
use crate::{EntityId, EntityKind, IntegrityWarning, Money};

/// Apply migration steps until the manifest is current.
pub fn upgrade(mut manifest: Manifest, warnings: &mut Vec<IntegrityWarning>) -> ManifestV3 {
    loop {
        manifest = match manifest {
            Manifest::V1(m) => Manifest::V2(v1_to_v2(m)),
            Manifest::V2(m) => Manifest::V3(v2_to_v3(m, warnings)),
            Manifest::V3(m) => return m,
        };
    }
}

/// Fold containers into items.
///
/// A container becomes an Item with `canHoldItems` whose parent is its
/// parent container, or its Location when it had none. Items move into
/// their container when they named one, otherwise into their Location.
fn v1_to_v2(manifest: ManifestV1) -> ManifestV2 {
    let mut items = Vec::with_capacity(manifest.containers.len() + manifest.items.len());

    for container in manifest.containers {
        let (parent_id, parent_type) = match container.parent_container_id {
            Some(parent) => (parent, EntityKind::Item),
            None => (container.location_id, EntityKind::Location),
        };
        items.push(ItemRecordV2 {
            id: container.id,
            name: Some(container.name),
            description: container.description,
            parent_id,
            parent_type,
            can_hold_items: true,
            quantity: 1,
            tags: Vec::new(),
            purchase_price: None,
            current_value: None,
            acquired_on: None,
            photos: container.photos,
            created_at: container.created_at,
            updated_at: container.updated_at,
        });
    }

    for item in manifest.items {
        let (parent_id, parent_type) = match item.container_id {
            Some(container) => (container, EntityKind::Item),
            None => (item.location_id, EntityKind::Location),
        };
        items.push(ItemRecordV2 {
            id: item.id,
            name: item.name,
            description: item.description,
            parent_id,
            parent_type,
            can_hold_items: false,
            quantity: item.quantity,
            tags: item.tags,
            purchase_price: item.purchase_price,
            current_value: item.current_value,
            acquired_on: item.acquired_on,
            photos: item.photos,
            created_at: item.created_at,
            updated_at: item.updated_at,
        });
    }

    ManifestV2 {
        version: 2,
        exported_at: manifest.exported_at,
        locations: manifest.locations,
        items,
    }
}

/// Make parents optional, add `includeInTotal`, and convert decimal prices
/// to minor units.
fn v2_to_v3(manifest: ManifestV2, warnings: &mut Vec<IntegrityWarning>) -> ManifestV3 {
    let items = manifest
        .items
        .into_iter()
        .map(|item| {
            let purchase_price =
                minor_units(&item.id, "purchase price", item.purchase_price, warnings);
            let current_value =
                minor_units(&item.id, "current value", item.current_value, warnings);
            let has_parent = !item.parent_id.as_str().is_empty();
            ItemRecord {
                id: item.id,
                name: item.name,
                description: item.description,
                parent_id: has_parent.then_some(item.parent_id),
                parent_type: has_parent.then_some(item.parent_type),
                can_hold_items: item.can_hold_items,
                quantity: item.quantity,
                include_in_total: true,
                tags: item.tags,
                purchase_price,
                current_value,
                acquired_on: item.acquired_on,
                photos: item.photos,
                created_at: item.created_at,
                updated_at: item.updated_at,
            }
        })
        .collect();

    ManifestV3 {
        version: FORMAT_VERSION,
        exported_at: manifest.exported_at,
        locations: manifest.locations,
        items,
    }
}

fn minor_units(
    id: &EntityId,
    field: &str,
    price: Option<serde_json::Number>,
    warnings: &mut Vec<IntegrityWarning>,
) -> Option<i64> {
    let text = price?.to_string();
    match Money::parse_decimal(&text) {
        Some((money, lossy)) => {
            if lossy {
                warnings.push(IntegrityWarning::LossyMigration {
                    id: id.clone(),
                    detail: format!("{} {} rounded to {}", field, text, money),
                });
            }
            Some(money.minor_units())
        }
        None => {
            warnings.push(IntegrityWarning::LossyMigration {
                id: id.clone(),
                detail: format!("{} {} could not be converted and was dropped", field, text),
            });
            None
        }
    }
}
