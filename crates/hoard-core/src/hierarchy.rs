//! # Hierarchy Integrity
//!
//! Cascading deletion and ancestor-path resolution across the
//! Location/Item graph.
//!
//! ## Cascade Order
//!
//! Cascades are an iterative depth-first post-order walk: every child is
//! removed before its parent, so a failure part-way never leaves a child
//! pointing at a record that is already gone. A record whose subtree could
//! not be fully removed is kept and reported.
//!
//! Each walk keeps a visited set. Reaching an id twice means the stored
//! parent graph has a cycle; the repeat edge is skipped and reported as an
//! [`IntegrityWarning::CycleDetected`].

use crate::catalog::Catalog;
use crate::store::EntityStore;
use crate::{Entity, EntityId, EntityKind, HoardError, IntegrityWarning, ParentRef};
use serde::Serialize;
use std::collections::HashSet;

// =============================================================================
// CASCADE DELETE
// =============================================================================

/// A record the cascade could not remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeFailure {
    pub id: EntityId,
    pub kind: EntityKind,
    pub reason: String,
}

/// Outcome of a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Removed Locations, in removal order.
    pub removed_locations: Vec<EntityId>,
    /// Removed Items, in removal order.
    pub removed_items: Vec<EntityId>,
    pub warnings: Vec<IntegrityWarning>,
    pub errors: Vec<CascadeFailure>,
}

impl CascadeReport {
    /// Total number of removed records.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.removed_locations.len() + self.removed_items.len()
    }

    /// Whether every record in the subtree was removed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

struct Frame {
    kind: EntityKind,
    id: EntityId,
    parent: Option<EntityId>,
    expanded: bool,
}

/// Remove a Location and everything nested under it.
///
/// # Errors
///
/// `NotFound` if the Location does not exist. Failures on individual
/// descendants are collected in the report.
pub fn delete_location_cascade(
    catalog: &mut Catalog,
    id: &EntityId,
) -> Result<CascadeReport, HoardError> {
    if catalog.location(id)?.is_none() {
        return Err(HoardError::not_found(EntityKind::Location, id));
    }
    Ok(cascade(catalog, EntityKind::Location, id))
}

/// Remove an Item and, for containers, everything inside it.
///
/// # Errors
///
/// `NotFound` if the Item does not exist.
pub fn delete_item_cascade(
    catalog: &mut Catalog,
    id: &EntityId,
) -> Result<CascadeReport, HoardError> {
    if catalog.item(id)?.is_none() {
        return Err(HoardError::not_found(EntityKind::Item, id));
    }
    Ok(cascade(catalog, EntityKind::Item, id))
}

/// Dispatch on kind.
pub fn delete_cascade(
    catalog: &mut Catalog,
    kind: EntityKind,
    id: &EntityId,
) -> Result<CascadeReport, HoardError> {
    match kind {
        EntityKind::Location => delete_location_cascade(catalog, id),
        EntityKind::Item => delete_item_cascade(catalog, id),
    }
}

/// Children of one record as (kind, id) pairs.
///
/// Items are expanded through the item parent index whatever their
/// capability flag; a non-container normally has no entries there, and
/// following stray ones keeps them from being orphaned.
fn children_of(
    catalog: &Catalog,
    kind: EntityKind,
    id: &EntityId,
) -> Result<Vec<(EntityKind, EntityId)>, HoardError> {
    let store = catalog.backend();
    let mut children = Vec::new();
    if kind == EntityKind::Location {
        children.extend(
            store
                .child_locations(Some(id))?
                .into_iter()
                .map(|l| (EntityKind::Location, l.id)),
        );
    }
    children.extend(
        store
            .child_items(Some(id))?
            .into_iter()
            .map(|i| (EntityKind::Item, i.id)),
    );
    Ok(children)
}

fn cascade(catalog: &mut Catalog, kind: EntityKind, root: &EntityId) -> CascadeReport {
    let mut report = CascadeReport::default();
    let mut visited: HashSet<EntityId> = HashSet::from([root.clone()]);
    let mut blocked: HashSet<EntityId> = HashSet::new();
    let mut stack = vec![Frame {
        kind,
        id: root.clone(),
        parent: None,
        expanded: false,
    }];

    while let Some(frame) = stack.pop() {
        if !frame.expanded {
            let children = match children_of(catalog, frame.kind, &frame.id) {
                Ok(children) => children,
                Err(e) => {
                    report.errors.push(CascadeFailure {
                        id: frame.id.clone(),
                        kind: frame.kind,
                        reason: format!("could not list children: {}", e),
                    });
                    if let Some(parent) = frame.parent {
                        blocked.insert(parent);
                    }
                    continue;
                }
            };

            let parent_id = frame.id.clone();
            stack.push(Frame {
                expanded: true,
                ..frame
            });
            for (child_kind, child_id) in children.into_iter().rev() {
                if !visited.insert(child_id.clone()) {
                    tracing::warn!(id = %child_id, "cycle reached during cascade");
                    report
                        .warnings
                        .push(IntegrityWarning::CycleDetected { id: child_id });
                    continue;
                }
                stack.push(Frame {
                    kind: child_kind,
                    id: child_id,
                    parent: Some(parent_id.clone()),
                    expanded: false,
                });
            }
            continue;
        }

        if blocked.contains(&frame.id) {
            report.errors.push(CascadeFailure {
                id: frame.id.clone(),
                kind: frame.kind,
                reason: "kept because a descendant could not be removed".to_string(),
            });
            if let Some(parent) = frame.parent {
                blocked.insert(parent);
            }
            continue;
        }

        match catalog.remove_record(frame.kind, &frame.id) {
            Ok(()) => match frame.kind {
                EntityKind::Location => report.removed_locations.push(frame.id),
                EntityKind::Item => report.removed_items.push(frame.id),
            },
            Err(e) => {
                tracing::warn!(id = %frame.id, error = %e, "cascade step failed");
                report.errors.push(CascadeFailure {
                    id: frame.id,
                    kind: frame.kind,
                    reason: e.to_string(),
                });
                if let Some(parent) = frame.parent {
                    blocked.insert(parent);
                }
            }
        }
    }

    tracing::info!(
        root = %root,
        removed = report.removed(),
        errors = report.errors.len(),
        "cascade finished"
    );
    report
}

// =============================================================================
// ANCESTOR PATH
// =============================================================================

/// One step of an ancestor path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSegment {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
}

/// Root-to-self chain of an entity's parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorPath {
    pub segments: Vec<PathSegment>,
    /// False when the walk stopped at a missing ancestor or a cycle.
    pub complete: bool,
    pub warnings: Vec<IntegrityWarning>,
}

fn parent_of(entity: &Entity) -> Option<ParentRef> {
    match entity {
        Entity::Location(l) => l.parent_id.clone().map(ParentRef::Location),
        Entity::Item(i) => i.parent.clone(),
    }
}

fn segment(entity: &Entity) -> PathSegment {
    PathSegment {
        id: entity.id().clone(),
        name: entity.display_name(),
        kind: entity.kind(),
    }
}

/// Walk parent references from `id` up to a root.
///
/// A missing ancestor ends the walk; the partial path is returned with a
/// `DanglingParent` warning.
///
/// # Errors
///
/// `NotFound` if the starting entity does not exist.
pub fn resolve_ancestor_path(
    catalog: &Catalog,
    id: &EntityId,
    kind: EntityKind,
) -> Result<AncestorPath, HoardError> {
    let start = catalog
        .get(kind, id)?
        .ok_or_else(|| HoardError::not_found(kind, id))?;

    let mut segments = vec![segment(&start)];
    let mut warnings = Vec::new();
    let mut complete = true;
    let mut visited: HashSet<EntityId> = HashSet::from([id.clone()]);
    let mut child_id = id.clone();
    let mut next = parent_of(&start);

    while let Some(parent) = next {
        let parent_id = parent.id().clone();
        if !visited.insert(parent_id.clone()) {
            warnings.push(IntegrityWarning::CycleDetected { id: parent_id });
            complete = false;
            break;
        }
        match catalog.get(parent.kind(), &parent_id)? {
            Some(entity) => {
                segments.push(segment(&entity));
                next = parent_of(&entity);
                child_id = parent_id;
            }
            None => {
                tracing::warn!(id = %child_id, parent = %parent_id, "dangling parent in path");
                warnings.push(IntegrityWarning::DanglingParent {
                    id: child_id,
                    parent_id,
                });
                complete = false;
                break;
            }
        }
    }

    segments.reverse();
    Ok(AncestorPath {
        segments,
        complete,
        warnings,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdAllocator;
    use crate::{Item, Location, NewItem, NewLocation};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn catalog() -> Catalog {
        Catalog::in_memory().with_allocator(IdAllocator::seeded(21))
    }

    fn add_location(catalog: &mut Catalog, name: &str, parent: Option<&EntityId>) -> EntityId {
        catalog
            .create_location(NewLocation {
                name: name.to_string(),
                parent_id: parent.cloned(),
                ..NewLocation::default()
            })
            .expect("location")
            .id
    }

    fn add_item(catalog: &mut Catalog, parent: Option<ParentRef>, container: bool) -> EntityId {
        catalog
            .create_item(NewItem {
                parent,
                can_hold_items: container,
                ..NewItem::default()
            })
            .expect("item")
            .id
    }

    #[test]
    fn location_cascade_removes_whole_subtree() {
        let mut catalog = catalog();
        let house = add_location(&mut catalog, "House", None);
        let kitchen = add_location(&mut catalog, "Kitchen", Some(&house));
        let drawer = add_item(&mut catalog, Some(ParentRef::Location(kitchen.clone())), true);
        add_item(&mut catalog, Some(ParentRef::Item(drawer.clone())), false);
        add_item(&mut catalog, Some(ParentRef::Location(house.clone())), false);
        let other = add_location(&mut catalog, "Shed", None);

        let report = delete_location_cascade(&mut catalog, &house).expect("cascade");
        assert!(report.is_complete());
        assert_eq!(report.removed_locations.len(), 2);
        assert_eq!(report.removed_items.len(), 3);
        assert_eq!(report.removed_locations.last(), Some(&house));

        let stats = catalog.stats().expect("stats");
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.items, 0);
        assert!(catalog.location(&other).expect("get").is_some());
    }

    #[test]
    fn plain_item_cascade_removes_only_itself() {
        let mut catalog = catalog();
        let room = add_location(&mut catalog, "Room", None);
        let lamp = add_item(&mut catalog, Some(ParentRef::Location(room.clone())), false);

        let report = delete_item_cascade(&mut catalog, &lamp).expect("cascade");
        assert_eq!(report.removed_items, vec![lamp]);
        assert!(catalog.location(&room).expect("get").is_some());
    }

    #[test]
    fn missing_root_is_not_found() {
        let mut catalog = catalog();
        let result = delete_location_cascade(&mut catalog, &"GONE00".into());
        assert!(matches!(result, Err(HoardError::NotFound { .. })));
    }

    #[test]
    fn cycle_is_skipped_with_warning() {
        let mut catalog = catalog();
        let now = Utc::now();
        let record = |id: &str, parent: &str| Location {
            id: EntityId::new(id),
            name: id.to_string(),
            description: None,
            parent_id: Some(EntityId::new(parent)),
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        // A and B name each other as parent; only reachable by writing raw records.
        catalog
            .backend_mut()
            .put_location(&record("A", "B"))
            .expect("put");
        catalog
            .backend_mut()
            .put_location(&record("B", "A"))
            .expect("put");

        let report = delete_location_cascade(&mut catalog, &"A".into()).expect("cascade");
        assert_eq!(report.removed(), 2);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| matches!(w, IntegrityWarning::CycleDetected { .. }))
        );
    }

    #[test]
    fn ancestor_path_is_root_to_self() {
        let mut catalog = catalog();
        let house = add_location(&mut catalog, "House", None);
        let garage = add_location(&mut catalog, "Garage", Some(&house));
        let bin = add_item(&mut catalog, Some(ParentRef::Location(garage.clone())), true);
        let drill = add_item(&mut catalog, Some(ParentRef::Item(bin.clone())), false);

        let path = resolve_ancestor_path(&catalog, &drill, EntityKind::Item).expect("path");
        assert!(path.complete);
        let ids: Vec<_> = path.segments.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![house, garage, bin, drill.clone()]);
        assert_eq!(path.segments[3].name, format!("Item {}", drill));
        assert_eq!(path.segments[0].kind, EntityKind::Location);
    }

    #[test]
    fn ancestor_path_degrades_on_missing_parent() {
        let mut catalog = catalog();
        let now = Utc::now();
        let orphan = Item {
            id: EntityId::new("ORPHAN"),
            name: Some("Orphan".to_string()),
            description: None,
            parent: Some(ParentRef::Location(EntityId::new("GHOST1"))),
            can_hold_items: false,
            quantity: 1,
            include_in_total: true,
            tags: BTreeSet::new(),
            purchase_price: None,
            current_value: None,
            acquired_on: None,
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        catalog.backend_mut().put_item(&orphan).expect("put");

        let path =
            resolve_ancestor_path(&catalog, &"ORPHAN".into(), EntityKind::Item).expect("path");
        assert!(!path.complete);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(
            path.warnings,
            vec![IntegrityWarning::DanglingParent {
                id: "ORPHAN".into(),
                parent_id: "GHOST1".into(),
            }]
        );
    }
}
