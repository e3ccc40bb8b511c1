//! # Property-Based Tests
//!
//! Hierarchy and identifier invariants checked with proptest over randomly
//! shaped catalogs.

use chrono::{TimeZone, Utc};
use hoard_core::{
    Catalog, EntityId, EntityKind, EntityStore, IdAllocator, ManualClock, NewItem, NewLocation,
    ParentRef, delete_item_cascade, delete_location_cascade, rename_tag,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// HELPERS
// =============================================================================

struct Built {
    root: EntityId,
    locations: Vec<EntityId>,
    containers: Vec<EntityId>,
}

/// Grow a tree under one root Location.
///
/// Each step is `(pick, shape)`: shape 0 adds a Location, 1 a container
/// Item, 2 a plain Item; `pick` chooses the parent among valid candidates.
fn build(catalog: &mut Catalog, steps: &[(usize, u8)]) -> Built {
    let root = catalog
        .create_location(NewLocation {
            name: "Root".to_string(),
            ..NewLocation::default()
        })
        .expect("root")
        .id;
    let mut locations = vec![root.clone()];
    let mut containers: Vec<EntityId> = Vec::new();

    for &(pick, shape) in steps {
        match shape % 3 {
            0 => {
                let parent = locations[pick % locations.len()].clone();
                let id = catalog
                    .create_location(NewLocation {
                        name: "Nested".to_string(),
                        parent_id: Some(parent),
                        ..NewLocation::default()
                    })
                    .expect("location")
                    .id;
                locations.push(id);
            }
            kind => {
                let pool = locations.len() + containers.len();
                let index = pick % pool;
                let parent = if index < locations.len() {
                    ParentRef::Location(locations[index].clone())
                } else {
                    ParentRef::Item(containers[index - locations.len()].clone())
                };
                let container = kind == 1;
                let id = catalog
                    .create_item(NewItem {
                        parent: Some(parent),
                        can_hold_items: container,
                        quantity: i64::try_from(pick % 7).expect("small"),
                        ..NewItem::default()
                    })
                    .expect("item")
                    .id;
                if container {
                    containers.push(id);
                }
            }
        }
    }

    Built {
        root,
        locations,
        containers,
    }
}

/// Every parent reference resolves to an existing record of the right kind.
fn assert_no_orphans(catalog: &Catalog) -> Result<(), TestCaseError> {
    let store = catalog.backend();
    for location in store.locations().expect("locations") {
        if let Some(parent) = &location.parent_id {
            prop_assert!(
                store.location(parent).expect("get").is_some(),
                "location {} has missing parent {}",
                location.id,
                parent
            );
        }
    }
    for item in store.items().expect("items") {
        match &item.parent {
            None => {}
            Some(ParentRef::Location(parent)) => {
                prop_assert!(store.location(parent).expect("get").is_some());
            }
            Some(ParentRef::Item(parent)) => {
                let container = store.item(parent).expect("get");
                prop_assert!(container.is_some_and(|c| c.can_hold_items));
            }
        }
    }
    Ok(())
}

fn steps() -> impl Strategy<Value = Vec<(usize, u8)>> {
    vec((0usize..1000, 0u8..3), 0..40)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Cascading the root leaves nothing that pointed into the tree.
    #[test]
    fn cascade_from_root_removes_everything(plan in steps(), seed in any::<u64>()) {
        let mut catalog = Catalog::in_memory().with_allocator(IdAllocator::seeded(seed));
        let built = build(&mut catalog, &plan);

        let report = delete_location_cascade(&mut catalog, &built.root).expect("cascade");

        prop_assert!(report.is_complete());
        prop_assert!(report.warnings.is_empty());
        prop_assert_eq!(report.removed(), plan.len() + 1);
        prop_assert_eq!(catalog.backend().location_count().expect("count"), 0);
        prop_assert_eq!(catalog.backend().item_count().expect("count"), 0);
    }

    /// Cascading any inner node keeps every remaining parent reference valid.
    #[test]
    fn cascade_of_subtree_leaves_no_orphans(
        plan in steps(),
        seed in any::<u64>(),
        target in 0usize..1000,
    ) {
        let mut catalog = Catalog::in_memory().with_allocator(IdAllocator::seeded(seed));
        let built = build(&mut catalog, &plan);

        let pool = built.locations.len() + built.containers.len();
        let index = target % pool;
        if index < built.locations.len() {
            delete_location_cascade(&mut catalog, &built.locations[index]).expect("cascade");
        } else {
            delete_item_cascade(&mut catalog, &built.containers[index - built.locations.len()])
                .expect("cascade");
        }

        assert_no_orphans(&catalog)?;
    }

    /// Renaming a tag moves every usage and advances each touched record.
    #[test]
    fn tag_rename_is_consistent(flags in vec((any::<bool>(), any::<bool>()), 1..30)) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time");
        let mut catalog = Catalog::in_memory()
            .with_clock(ManualClock::starting_at(start))
            .with_allocator(IdAllocator::seeded(17));

        let mut created = Vec::new();
        for (kitchen, cooking) in &flags {
            let mut tags = vec!["misc".to_string()];
            if *kitchen {
                tags.push("kitchen".to_string());
            }
            if *cooking {
                tags.push("cooking".to_string());
            }
            let item = catalog
                .create_item(NewItem { tags, ..NewItem::default() })
                .expect("item");
            created.push(item);
        }
        let expected_holders = flags.iter().filter(|(k, c)| *k || *c).count();

        let report = rename_tag(&mut catalog, "kitchen", "cooking").expect("rename");
        prop_assert!(report.errors.is_empty());
        prop_assert_eq!(report.updated.len(), flags.iter().filter(|(k, _)| *k).count());

        let items = catalog.backend().items().expect("items");
        prop_assert!(items.iter().all(|i| !i.tags.contains("kitchen")));
        prop_assert_eq!(
            items.iter().filter(|i| i.tags.contains("cooking")).count(),
            expected_holders
        );

        for before in &created {
            let after = catalog.item(&before.id).expect("get").expect("exists");
            if report.updated.contains(&before.id) {
                prop_assert!(after.updated_at > before.updated_at);
                prop_assert_eq!(after.created_at, before.created_at);
            } else {
                prop_assert_eq!(after.updated_at, before.updated_at);
            }
        }
    }

    /// Totals never count items switched out of totals.
    #[test]
    fn excluded_items_never_count(quantities in vec((0i64..50, any::<bool>()), 0..30)) {
        let mut catalog = Catalog::in_memory().with_allocator(IdAllocator::seeded(3));
        let room = catalog
            .create_location(NewLocation { name: "Room".to_string(), ..NewLocation::default() })
            .expect("room")
            .id;
        for (quantity, counted) in &quantities {
            catalog
                .create_item(NewItem {
                    parent: Some(ParentRef::Location(room.clone())),
                    quantity: *quantity,
                    include_in_total: *counted,
                    ..NewItem::default()
                })
                .expect("item");
        }

        let expected: i64 = quantities.iter().filter(|(_, c)| *c).map(|(q, _)| *q).sum();
        let total = hoard_core::total_item_count(&catalog, &room, EntityKind::Location)
            .expect("total");
        prop_assert_eq!(i64::try_from(total).expect("fits"), expected);
    }
}

// =============================================================================
// IDENTIFIER LOAD
// =============================================================================

#[test]
fn hundred_thousand_identifiers_are_unique() {
    let mut allocator = IdAllocator::seeded(2024);
    let mut taken = BTreeSet::new();
    for _ in 0..100_000 {
        let id = allocator
            .allocate(|candidate| Ok(taken.contains(candidate)))
            .expect("allocation must not exhaust");
        assert!(taken.insert(id));
    }
    assert_eq!(taken.len(), 100_000);
}
