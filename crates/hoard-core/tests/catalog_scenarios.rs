//! # Catalog Scenario Tests
//!
//! End-to-end walks through the public API:
//!
//! - Rollups over a mixed hierarchy
//! - Backup and restore, including re-import over existing records
//! - Legacy archive generations
//! - Durable storage across reopen

use chrono::{TimeZone, Utc};
use hoard_core::{
    Catalog, EntityId, EntityKind, EntityStore, HoardError, IdAllocator, IntegrityWarning,
    ManualClock, Money, NewItem, NewLocation, ParentRef, Photo, delete_location_cascade,
    export_archive, import_archive, preview_archive, resolve_ancestor_path, total_item_count,
    total_value,
};
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// =============================================================================
// HELPERS
// =============================================================================

fn catalog(seed: u64) -> Catalog {
    let start = Utc
        .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .expect("valid time");
    Catalog::in_memory()
        .with_clock(ManualClock::starting_at(start))
        .with_allocator(IdAllocator::seeded(seed))
}

fn location(catalog: &mut Catalog, name: &str, parent: Option<&EntityId>) -> EntityId {
    catalog
        .create_location(NewLocation {
            name: name.to_string(),
            parent_id: parent.cloned(),
            ..NewLocation::default()
        })
        .expect("create location")
        .id
}

fn item(catalog: &mut Catalog, parent: Option<ParentRef>, quantity: i64) -> EntityId {
    catalog
        .create_item(NewItem {
            parent,
            quantity,
            ..NewItem::default()
        })
        .expect("create item")
        .id
}

fn zip_archive(manifest: &Value, photos: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        zip.start_file("manifest.json", options).expect("start");
        zip.write_all(manifest.to_string().as_bytes())
            .expect("write");
        for (name, data) in photos {
            zip.start_file(format!("photos/{}", name), options)
                .expect("start");
            zip.write_all(data).expect("write");
        }
        zip.finish().expect("finish");
    }
    cursor.into_inner()
}

const STAMP: &str = "2023-03-04T05:06:07Z";

// =============================================================================
// ROLLUPS
// =============================================================================

mod rollups {
    use super::*;

    /// Room holds items of 3 and 1, a closet with 5, and a container kept
    /// out of totals that holds 2 more.
    #[test]
    fn room_total_counts_nested_items() {
        let mut catalog = catalog(1);
        let room = location(&mut catalog, "Living Room", None);
        let closet = location(&mut catalog, "Closet", Some(&room));

        item(&mut catalog, Some(ParentRef::Location(room.clone())), 3);
        item(&mut catalog, Some(ParentRef::Location(room.clone())), 1);
        item(&mut catalog, Some(ParentRef::Location(closet.clone())), 5);
        let bin = catalog
            .create_item(NewItem {
                name: Some("Bin".to_string()),
                parent: Some(ParentRef::Location(room.clone())),
                can_hold_items: true,
                include_in_total: false,
                ..NewItem::default()
            })
            .expect("bin")
            .id;
        item(&mut catalog, Some(ParentRef::Item(bin.clone())), 2);

        assert_eq!(
            total_item_count(&catalog, &room, EntityKind::Location).expect("total"),
            11
        );
        assert_eq!(
            total_item_count(&catalog, &closet, EntityKind::Location).expect("total"),
            5
        );
        assert_eq!(
            total_item_count(&catalog, &bin, EntityKind::Item).expect("total"),
            2
        );
    }

    #[test]
    fn valuation_multiplies_by_quantity() {
        let mut catalog = catalog(2);
        let shed = location(&mut catalog, "Shed", None);
        catalog
            .create_item(NewItem {
                parent: Some(ParentRef::Location(shed.clone())),
                quantity: 4,
                purchase_price: Some(Money::from_minor(250)),
                current_value: Some(Money::from_minor(100)),
                ..NewItem::default()
            })
            .expect("item");
        item(&mut catalog, Some(ParentRef::Location(shed.clone())), 9);

        let value = total_value(&catalog, &shed, EntityKind::Location).expect("value");
        assert_eq!(value.purchase, Money::from_minor(1000));
        assert_eq!(value.current, Money::from_minor(400));
        assert_eq!(value.priced_items, 1);
    }

    #[test]
    fn path_and_cascade_agree_on_the_tree() {
        let mut catalog = catalog(3);
        let house = location(&mut catalog, "House", None);
        let attic = location(&mut catalog, "Attic", Some(&house));
        let trunk = catalog
            .create_item(NewItem {
                name: Some("Trunk".to_string()),
                parent: Some(ParentRef::Location(attic.clone())),
                can_hold_items: true,
                ..NewItem::default()
            })
            .expect("trunk")
            .id;
        let quilt = item(&mut catalog, Some(ParentRef::Item(trunk.clone())), 1);

        let path = resolve_ancestor_path(&catalog, &quilt, EntityKind::Item).expect("path");
        assert!(path.complete);
        let ids: Vec<_> = path.segments.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![house.clone(), attic, trunk, quilt]);

        let report = delete_location_cascade(&mut catalog, &house).expect("cascade");
        assert!(report.is_complete());
        assert_eq!(report.removed(), 4);
        assert_eq!(catalog.stats().expect("stats").items, 0);
    }
}

// =============================================================================
// BACKUP AND RESTORE
// =============================================================================

mod backup {
    use super::*;

    fn populated() -> Catalog {
        let mut source = catalog(40);
        let garage = location(&mut source, "Garage", None);
        let toolbox = source
            .create_item(NewItem {
                name: Some("Toolbox".to_string()),
                parent: Some(ParentRef::Location(garage.clone())),
                can_hold_items: true,
                tags: vec!["tools".to_string()],
                photos: vec![Photo::new("image/jpeg", vec![0xFF, 0xD8, 0xFF])],
                ..NewItem::default()
            })
            .expect("toolbox")
            .id;
        source
            .create_item(NewItem {
                name: Some("Hammer".to_string()),
                parent: Some(ParentRef::Item(toolbox)),
                purchase_price: Some(Money::from_minor(1899)),
                ..NewItem::default()
            })
            .expect("hammer");
        item(&mut source, None, 2);
        source
    }

    #[test]
    fn restore_reproduces_every_record() {
        let source = populated();
        let bytes = export_archive(&source).expect("export");

        let preview = preview_archive(&bytes);
        assert!(preview.valid);
        assert_eq!(preview.counts.locations, 1);
        assert_eq!(preview.counts.items, 3);
        assert_eq!(preview.counts.photos, 1);

        let mut restored = Catalog::in_memory();
        let result = import_archive(&mut restored, &bytes).expect("import");
        assert!(result.success());
        assert!(result.warnings.is_empty());
        assert_eq!(result.locations.added, 1);
        assert_eq!(result.items.added, 3);

        let mut expected = source.backend().items().expect("items");
        let mut actual = restored.backend().items().expect("items");
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        actual.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(expected, actual);
    }

    #[test]
    fn second_import_updates_in_place() {
        let source = populated();
        let bytes = export_archive(&source).expect("export");

        let mut restored = Catalog::in_memory();
        import_archive(&mut restored, &bytes).expect("first import");
        let before = restored.backend().items().expect("items");

        let again = import_archive(&mut restored, &bytes).expect("second import");
        assert!(again.success());
        assert_eq!(again.locations.added, 0);
        assert_eq!(again.locations.updated, 1);
        assert_eq!(again.items.added, 0);
        assert_eq!(again.items.updated, 3);

        let mut after = restored.backend().items().expect("items");
        let mut before = before;
        before.sort_by(|a, b| a.id.cmp(&b.id));
        after.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(before, after);
    }

    #[test]
    fn unsupported_version_is_reported_not_applied() {
        let bytes = zip_archive(&json!({ "version": 7, "exportedAt": STAMP }), &[]);

        let preview = preview_archive(&bytes);
        assert!(!preview.valid);
        assert_eq!(preview.format_version, None);

        let mut target = Catalog::in_memory();
        assert!(matches!(
            import_archive(&mut target, &bytes),
            Err(HoardError::ArchiveFormat(_))
        ));
    }
}

// =============================================================================
// LEGACY ARCHIVES
// =============================================================================

mod legacy {
    use super::*;

    #[test]
    fn first_generation_containers_become_items() {
        let bytes = zip_archive(
            &json!({
                "version": 1,
                "exportedAt": STAMP,
                "locations": [
                    { "id": "KITCH", "name": "Kitchen", "createdAt": STAMP, "updatedAt": STAMP }
                ],
                "containers": [
                    { "id": "DRAWR", "name": "Drawer", "locationId": "KITCH",
                      "photos": ["item-DRAWR-0.png"],
                      "createdAt": STAMP, "updatedAt": STAMP }
                ],
                "items": [
                    { "id": "SPOON", "name": "Spoons", "locationId": "KITCH",
                      "containerId": "DRAWR", "quantity": 6,
                      "createdAt": STAMP, "updatedAt": STAMP },
                    { "id": "KETTL", "name": "Kettle", "locationId": "KITCH",
                      "purchasePrice": 24.99,
                      "createdAt": STAMP, "updatedAt": STAMP }
                ]
            }),
            &[("item-DRAWR-0.png", b"\x89PNG".as_slice())],
        );

        let mut target = Catalog::in_memory();
        let result = import_archive(&mut target, &bytes).expect("import");
        assert_eq!(result.format_version, 1);
        assert!(result.success());
        assert_eq!(result.locations.added, 1);
        assert_eq!(result.items.added, 3);

        let drawer = target.item(&"DRAWR".into()).expect("get").expect("drawer");
        assert!(drawer.can_hold_items);
        assert_eq!(drawer.parent, Some(ParentRef::Location("KITCH".into())));
        assert_eq!(drawer.photos.len(), 1);
        assert_eq!(drawer.photos[0].mime_type, "image/png");

        let spoons = target.item(&"SPOON".into()).expect("get").expect("spoons");
        assert_eq!(spoons.parent, Some(ParentRef::Item("DRAWR".into())));
        assert_eq!(spoons.quantity, 6);
        assert!(spoons.include_in_total);

        let kettle = target.item(&"KETTL".into()).expect("get").expect("kettle");
        assert_eq!(kettle.purchase_price, Some(Money::from_minor(2499)));

        assert_eq!(
            total_item_count(&target, &"KITCH".into(), EntityKind::Location).expect("total"),
            8
        );
    }

    #[test]
    fn second_generation_prices_and_parents_upgrade() {
        let bytes = zip_archive(
            &json!({
                "version": 2,
                "exportedAt": STAMP,
                "locations": [],
                "items": [
                    { "id": "LAMP1", "parentId": "", "parentType": "location",
                      "purchasePrice": 12.5, "currentValue": 3.333,
                      "createdAt": STAMP, "updatedAt": STAMP }
                ]
            }),
            &[],
        );

        let preview = preview_archive(&bytes);
        assert!(preview.valid);
        assert!(preview.warnings.iter().any(|w| matches!(
            w,
            IntegrityWarning::LossyMigration { id, .. } if id.as_str() == "LAMP1"
        )));

        let mut target = Catalog::in_memory();
        let result = import_archive(&mut target, &bytes).expect("import");
        assert_eq!(result.format_version, 2);
        assert_eq!(result.items.added, 1);
        assert!(result.warnings.iter().any(|w| matches!(
            w,
            IntegrityWarning::LossyMigration { id, .. } if id.as_str() == "LAMP1"
        )));

        let lamp = target.item(&"LAMP1".into()).expect("get").expect("lamp");
        assert_eq!(lamp.parent, None);
        assert_eq!(lamp.purchase_price, Some(Money::from_minor(1250)));
        assert_eq!(lamp.current_value, Some(Money::from_minor(333)));
        assert_eq!(target.unassigned_items().expect("unassigned").len(), 1);
    }
}

// =============================================================================
// DURABLE STORAGE
// =============================================================================

mod durable {
    use super::*;

    #[test]
    fn redb_catalog_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hoard.redb");

        let (pantry, jar) = {
            let mut catalog = Catalog::with_redb(&path)
                .expect("open")
                .with_allocator(IdAllocator::seeded(77));
            let pantry = location(&mut catalog, "Pantry", None);
            let jar = item(&mut catalog, Some(ParentRef::Location(pantry.clone())), 12);
            catalog.close().expect("close");
            (pantry, jar)
        };

        let catalog = Catalog::with_redb(&path).expect("reopen");
        assert!(catalog.is_persistent());
        let stats = catalog.stats().expect("stats");
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.items, 1);
        assert!(stats.persistent);

        let children = catalog
            .list_by_parent(&pantry, Some(EntityKind::Item))
            .expect("children");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id(), &jar);
        assert_eq!(
            total_item_count(&catalog, &pantry, EntityKind::Location).expect("total"),
            12
        );
    }

    #[test]
    fn archive_moves_between_backends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut source = catalog(90);
        let cellar = location(&mut source, "Cellar", None);
        item(&mut source, Some(ParentRef::Location(cellar.clone())), 24);
        let bytes = export_archive(&source).expect("export");

        let mut durable = Catalog::with_redb(dir.path().join("restore.redb")).expect("open");
        let result = import_archive(&mut durable, &bytes).expect("import");
        assert!(result.success());
        assert_eq!(
            total_item_count(&durable, &cellar, EntityKind::Location).expect("total"),
            24
        );
    }
}
