//! # Entity Store
//!
//! The primitive record layer for Hoard.
//!
//! This module defines the `EntityStore` trait and its in-memory
//! implementation. Records are kept in id-keyed maps and relationships are
//! resolved by lookup through per-collection parent indexes; nothing holds
//! a reference to another record.
//!
//! The trait knows nothing about validation, timestamps or cascades. Those
//! live in [`crate::catalog::Catalog`], which is the only caller that writes.

use crate::{EntityId, EntityKind, HoardError, Item, Location};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ENTITYSTORE TRAIT
// =============================================================================

/// Record-level storage for Locations and Items.
///
/// Every method is atomic for the single record it touches, index entries
/// included. No guarantee spans two calls.
///
/// Child lookups go through a parent index keyed by the parent's id; `None`
/// selects root Locations or unassigned Items.
pub trait EntityStore {
    /// Fetch one Location.
    fn location(&self, id: &EntityId) -> Result<Option<Location>, HoardError>;

    /// Fetch one Item.
    fn item(&self, id: &EntityId) -> Result<Option<Item>, HoardError>;

    /// Insert or replace a Location, keeping the parent index current.
    fn put_location(&mut self, location: &Location) -> Result<(), HoardError>;

    /// Insert or replace an Item, keeping the parent index current.
    fn put_item(&mut self, item: &Item) -> Result<(), HoardError>;

    /// Remove one Location. Returns whether it existed.
    fn remove_location(&mut self, id: &EntityId) -> Result<bool, HoardError>;

    /// Remove one Item. Returns whether it existed.
    fn remove_item(&mut self, id: &EntityId) -> Result<bool, HoardError>;

    /// Locations whose parent is `parent` (index-backed).
    fn child_locations(&self, parent: Option<&EntityId>) -> Result<Vec<Location>, HoardError>;

    /// Items whose parent id is `parent`, whatever the parent's kind (index-backed).
    fn child_items(&self, parent: Option<&EntityId>) -> Result<Vec<Item>, HoardError>;

    /// Every Location, ordered by id.
    fn locations(&self) -> Result<Vec<Location>, HoardError>;

    /// Every Item, ordered by id.
    fn items(&self) -> Result<Vec<Item>, HoardError>;

    /// Number of stored Locations.
    fn location_count(&self) -> Result<usize, HoardError>;

    /// Number of stored Items.
    fn item_count(&self) -> Result<usize, HoardError>;

    /// Which collection, if any, holds `id`.
    fn kind_of(&self, id: &EntityId) -> Result<Option<EntityKind>, HoardError> {
        if self.location(id)?.is_some() {
            return Ok(Some(EntityKind::Location));
        }
        if self.item(id)?.is_some() {
            return Ok(Some(EntityKind::Item));
        }
        Ok(None)
    }
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

type ParentIndex = BTreeMap<Option<EntityId>, BTreeSet<EntityId>>;

/// Volatile store backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    locations: BTreeMap<EntityId, Location>,
    items: BTreeMap<EntityId, Item>,
    locations_by_parent: ParentIndex,
    items_by_parent: ParentIndex,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn index_insert(index: &mut ParentIndex, parent: Option<&EntityId>, child: &EntityId) {
    index
        .entry(parent.cloned())
        .or_default()
        .insert(child.clone());
}

fn index_remove(index: &mut ParentIndex, parent: Option<&EntityId>, child: &EntityId) {
    let key = parent.cloned();
    if let Some(children) = index.get_mut(&key) {
        children.remove(child);
        if children.is_empty() {
            index.remove(&key);
        }
    }
}

impl EntityStore for MemoryStore {
    fn location(&self, id: &EntityId) -> Result<Option<Location>, HoardError> {
        Ok(self.locations.get(id).cloned())
    }

    fn item(&self, id: &EntityId) -> Result<Option<Item>, HoardError> {
        Ok(self.items.get(id).cloned())
    }

    fn put_location(&mut self, location: &Location) -> Result<(), HoardError> {
        if let Some(old) = self.locations.get(&location.id) {
            let old_parent = old.parent_id.clone();
            index_remove(
                &mut self.locations_by_parent,
                old_parent.as_ref(),
                &location.id,
            );
        }
        index_insert(
            &mut self.locations_by_parent,
            location.parent_id.as_ref(),
            &location.id,
        );
        self.locations
            .insert(location.id.clone(), location.clone());
        Ok(())
    }

    fn put_item(&mut self, item: &Item) -> Result<(), HoardError> {
        if let Some(old) = self.items.get(&item.id) {
            let old_parent = old.parent.as_ref().map(|p| p.id().clone());
            index_remove(&mut self.items_by_parent, old_parent.as_ref(), &item.id);
        }
        index_insert(
            &mut self.items_by_parent,
            item.parent.as_ref().map(|p| p.id()),
            &item.id,
        );
        self.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn remove_location(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        match self.locations.remove(id) {
            Some(old) => {
                index_remove(&mut self.locations_by_parent, old.parent_id.as_ref(), id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_item(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        match self.items.remove(id) {
            Some(old) => {
                index_remove(
                    &mut self.items_by_parent,
                    old.parent.as_ref().map(|p| p.id()),
                    id,
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn child_locations(&self, parent: Option<&EntityId>) -> Result<Vec<Location>, HoardError> {
        Ok(self
            .locations_by_parent
            .get(&parent.cloned())
            .into_iter()
            .flatten()
            .filter_map(|id| self.locations.get(id).cloned())
            .collect())
    }

    fn child_items(&self, parent: Option<&EntityId>) -> Result<Vec<Item>, HoardError> {
        Ok(self
            .items_by_parent
            .get(&parent.cloned())
            .into_iter()
            .flatten()
            .filter_map(|id| self.items.get(id).cloned())
            .collect())
    }

    fn locations(&self) -> Result<Vec<Location>, HoardError> {
        Ok(self.locations.values().cloned().collect())
    }

    fn items(&self) -> Result<Vec<Item>, HoardError> {
        Ok(self.items.values().cloned().collect())
    }

    fn location_count(&self) -> Result<usize, HoardError> {
        Ok(self.locations.len())
    }

    fn item_count(&self) -> Result<usize, HoardError> {
        Ok(self.items.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
