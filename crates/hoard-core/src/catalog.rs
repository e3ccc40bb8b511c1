//! # Catalog
//!
//! The single writer of entity state.
//!
//! `Catalog` owns a [`StorageBackend`], a [`Clock`] and an [`IdAllocator`].
//! Every create and update passes through here: input is validated before
//! any store write, ids are allocated against both collections, and
//! timestamps come from the injected clock.
//!
//! Destructive multi-record operations live in [`crate::hierarchy`];
//! rollups live in [`crate::aggregate`]; backup and restore live in
//! [`crate::archive`]. All of them go through the methods here or through
//! the single-record store primitives.

use crate::clock::{Clock, SystemClock};
use crate::ident::{IdAllocator, normalize_label};
use crate::primitives::{
    MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, MAX_PHOTO_BYTES, MAX_PHOTOS_PER_ENTITY,
    MAX_TAG_LENGTH, MAX_TAGS_PER_ITEM,
};
use crate::storage::{RedbStore, StorageBackend};
use crate::store::{EntityStore, MemoryStore};
use crate::{
    Entity, EntityId, EntityKind, HoardError, Item, ItemPatch, Location, LocationPatch, Money,
    NewItem, NewLocation, ParentRef, Photo, extension_for_mime, mime_for_extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Record counts for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub locations: usize,
    pub items: usize,
    pub root_locations: usize,
    pub unassigned_items: usize,
    pub persistent: bool,
}

/// The entity store facade.
#[derive(Debug)]
pub struct Catalog {
    backend: StorageBackend,
    clock: Box<dyn Clock + Send + Sync>,
    ids: IdAllocator,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Catalog {
    /// Create an empty, volatile catalog.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(StorageBackend::InMemory(MemoryStore::new()))
    }

    /// Open or create a persistent catalog backed by a redb file.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, HoardError> {
        let store = RedbStore::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened catalog");
        Ok(Self::with_backend(StorageBackend::Persistent(store)))
    }

    /// Wrap an existing backend with the system clock and an entropy-seeded allocator.
    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            clock: Box::new(SystemClock),
            ids: IdAllocator::new(),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the identifier allocator.
    #[must_use]
    pub fn with_allocator(mut self, ids: IdAllocator) -> Self {
        self.ids = ids;
        self
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Read access to the store primitives.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut StorageBackend {
        &mut self.backend
    }

    /// Current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Tear down the catalog, releasing the store handle.
    pub fn close(self) -> Result<(), HoardError> {
        let persistent = self.is_persistent();
        drop(self.backend);
        tracing::debug!(persistent, "catalog closed");
        Ok(())
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Validate, allocate an id, stamp timestamps and persist a new Location.
    pub fn create_location(&mut self, input: NewLocation) -> Result<Location, HoardError> {
        let name = required_name(&input.name)?;
        let description = optional_text(input.description, "description", MAX_DESCRIPTION_LENGTH)?;
        let photos = checked_photos(input.photos)?;
        self.check_location_parent(None, input.parent_id.as_ref())?;

        let id = self.allocate_id()?;
        let now = self.clock.now();
        let location = Location {
            id,
            name,
            description,
            parent_id: input.parent_id,
            photos,
            created_at: now,
            updated_at: now,
        };
        self.backend.put_location(&location)?;
        tracing::debug!(id = %location.id, "created location");
        Ok(location)
    }

    /// Validate, allocate an id, stamp timestamps and persist a new Item.
    pub fn create_item(&mut self, input: NewItem) -> Result<Item, HoardError> {
        let name = optional_text(input.name, "name", MAX_NAME_LENGTH)?;
        let description = optional_text(input.description, "description", MAX_DESCRIPTION_LENGTH)?;
        let quantity = checked_quantity(input.quantity, input.can_hold_items)?;
        let tags = clean_tags(input.tags)?;
        let purchase_price = checked_price(input.purchase_price, "purchase price")?;
        let current_value = checked_price(input.current_value, "current value")?;
        let photos = checked_photos(input.photos)?;
        self.check_item_parent(None, input.parent.as_ref())?;

        let id = self.allocate_id()?;
        let now = self.clock.now();
        let item = Item {
            id,
            name,
            description,
            parent: input.parent,
            can_hold_items: input.can_hold_items,
            quantity,
            include_in_total: input.include_in_total,
            tags,
            purchase_price,
            current_value,
            acquired_on: input.acquired_on,
            photos,
            created_at: now,
            updated_at: now,
        };
        self.backend.put_item(&item)?;
        tracing::debug!(id = %item.id, "created item");
        Ok(item)
    }

    fn allocate_id(&mut self) -> Result<EntityId, HoardError> {
        let backend = &self.backend;
        self.ids
            .allocate(|candidate| Ok(backend.kind_of(candidate)?.is_some()))
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Fetch one entity of the given kind.
    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, HoardError> {
        Ok(match kind {
            EntityKind::Location => self.backend.location(id)?.map(Entity::Location),
            EntityKind::Item => self.backend.item(id)?.map(Entity::Item),
        })
    }

    /// Fetch one Location.
    pub fn location(&self, id: &EntityId) -> Result<Option<Location>, HoardError> {
        self.backend.location(id)
    }

    /// Fetch one Item.
    pub fn item(&self, id: &EntityId) -> Result<Option<Item>, HoardError> {
        self.backend.item(id)
    }

    /// Fetch an entity of either kind.
    pub fn lookup(&self, id: &EntityId) -> Result<Option<Entity>, HoardError> {
        if let Some(location) = self.backend.location(id)? {
            return Ok(Some(Entity::Location(location)));
        }
        Ok(self.backend.item(id)?.map(Entity::Item))
    }

    /// Whether either collection holds `id`.
    pub fn id_in_use(&self, id: &EntityId) -> Result<bool, HoardError> {
        Ok(self.backend.kind_of(id)?.is_some())
    }

    /// Direct children of `parent_id`, served from the parent index.
    ///
    /// With `parent_kind` set to `Item`, only Items are returned (Locations
    /// never sit inside Items); with `Location`, Items are limited to those
    /// whose parent reference is a Location.
    pub fn list_by_parent(
        &self,
        parent_id: &EntityId,
        parent_kind: Option<EntityKind>,
    ) -> Result<Vec<Entity>, HoardError> {
        let mut children = Vec::new();
        if parent_kind != Some(EntityKind::Item) {
            children.extend(
                self.backend
                    .child_locations(Some(parent_id))?
                    .into_iter()
                    .map(Entity::Location),
            );
        }
        children.extend(
            self.backend
                .child_items(Some(parent_id))?
                .into_iter()
                .filter(|item| {
                    parent_kind.is_none_or(|kind| {
                        item.parent.as_ref().is_some_and(|p| p.kind() == kind)
                    })
                })
                .map(Entity::Item),
        );
        Ok(children)
    }

    /// Every record of one kind.
    pub fn list_all(&self, kind: EntityKind) -> Result<Vec<Entity>, HoardError> {
        Ok(match kind {
            EntityKind::Location => self
                .backend
                .locations()?
                .into_iter()
                .map(Entity::Location)
                .collect(),
            EntityKind::Item => self
                .backend
                .items()?
                .into_iter()
                .map(Entity::Item)
                .collect(),
        })
    }

    /// Locations without a parent.
    pub fn root_locations(&self) -> Result<Vec<Location>, HoardError> {
        self.backend.child_locations(None)
    }

    /// Items without a parent.
    pub fn unassigned_items(&self) -> Result<Vec<Item>, HoardError> {
        self.backend.child_items(None)
    }

    /// Look an entity up by a printed or typed label.
    ///
    /// The label is tried verbatim first, then in normalized form, so both
    /// imported ids and misread allocator ids resolve.
    pub fn resolve(&self, label: &str) -> Result<Option<Entity>, HoardError> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        if let Some(entity) = self.lookup(&EntityId::new(label))? {
            return Ok(Some(entity));
        }
        let normalized = normalize_label(label);
        if normalized == label {
            return Ok(None);
        }
        self.lookup(&EntityId::new(normalized))
    }

    /// Case-insensitive substring search over ids, names, descriptions and tags.
    pub fn search(&self, query: &str) -> Result<Vec<Entity>, HoardError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);

        let mut found: Vec<Entity> = self
            .backend
            .locations()?
            .into_iter()
            .filter(|l| {
                hit(l.id.as_str())
                    || hit(&l.name)
                    || l.description.as_deref().is_some_and(hit)
            })
            .map(Entity::Location)
            .collect();
        found.extend(
            self.backend
                .items()?
                .into_iter()
                .filter(|i| {
                    hit(i.id.as_str())
                        || i.name.as_deref().is_some_and(hit)
                        || i.description.as_deref().is_some_and(hit)
                        || i.tags.iter().any(|t| hit(t))
                })
                .map(Entity::Item),
        );
        Ok(found)
    }

    /// Record counts.
    pub fn stats(&self) -> Result<CatalogStats, HoardError> {
        Ok(CatalogStats {
            locations: self.backend.location_count()?,
            items: self.backend.item_count()?,
            root_locations: self.backend.child_locations(None)?.len(),
            unassigned_items: self.backend.child_items(None)?.len(),
            persistent: self.is_persistent(),
        })
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Merge `patch` over an existing Location and refresh `updated_at`.
    pub fn update_location(
        &mut self,
        id: &EntityId,
        patch: LocationPatch,
    ) -> Result<Location, HoardError> {
        let mut location = self
            .backend
            .location(id)?
            .ok_or_else(|| HoardError::not_found(EntityKind::Location, id))?;

        if let Some(name) = patch.name {
            location.name = required_name(&name)?;
        }
        if let Some(description) = patch.description {
            location.description =
                optional_text(description, "description", MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(parent_id) = patch.parent_id {
            self.check_location_parent(Some(id), parent_id.as_ref())?;
            location.parent_id = parent_id;
        }
        if let Some(photos) = patch.photos {
            location.photos = checked_photos(photos)?;
        }

        location.updated_at = self.clock.now();
        self.backend.put_location(&location)?;
        tracing::debug!(id = %id, "updated location");
        Ok(location)
    }

    /// Merge `patch` over an existing Item and refresh `updated_at`.
    ///
    /// Clearing `can_hold_items` is refused while the item still holds
    /// other items.
    pub fn update_item(&mut self, id: &EntityId, patch: ItemPatch) -> Result<Item, HoardError> {
        let mut item = self
            .backend
            .item(id)?
            .ok_or_else(|| HoardError::not_found(EntityKind::Item, id))?;

        if let Some(name) = patch.name {
            item.name = optional_text(name, "name", MAX_NAME_LENGTH)?;
        }
        if let Some(description) = patch.description {
            item.description = optional_text(description, "description", MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(parent) = patch.parent {
            self.check_item_parent(Some(id), parent.as_ref())?;
            item.parent = parent;
        }
        if let Some(can_hold) = patch.can_hold_items {
            if item.can_hold_items
                && !can_hold
                && !self.backend.child_items(Some(id))?.is_empty()
            {
                return Err(HoardError::Validation(format!(
                    "item {} still holds items; move or delete them first",
                    id
                )));
            }
            item.can_hold_items = can_hold;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = checked_quantity(quantity, item.can_hold_items)?;
        } else if item.can_hold_items {
            item.quantity = 1;
        }
        if let Some(include) = patch.include_in_total {
            item.include_in_total = include;
        }
        if let Some(tags) = patch.tags {
            item.tags = clean_tags(tags)?;
        }
        if let Some(price) = patch.purchase_price {
            item.purchase_price = checked_price(price, "purchase price")?;
        }
        if let Some(value) = patch.current_value {
            item.current_value = checked_price(value, "current value")?;
        }
        if let Some(acquired_on) = patch.acquired_on {
            item.acquired_on = acquired_on;
        }
        if let Some(photos) = patch.photos {
            item.photos = checked_photos(photos)?;
        }

        item.updated_at = self.clock.now();
        self.backend.put_item(&item)?;
        tracing::debug!(id = %id, "updated item");
        Ok(item)
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Remove exactly one record that holds nothing.
    ///
    /// A record with children is refused with `Validation`; removing it
    /// together with its subtree is [`crate::hierarchy::delete_cascade`].
    pub fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<(), HoardError> {
        if self.get(kind, id)?.is_none() {
            return Err(HoardError::not_found(kind, id));
        }
        let children = self.list_by_parent(id, Some(kind))?.len();
        if children > 0 {
            return Err(HoardError::Validation(format!(
                "{} {} still holds {} record(s); use a cascading delete",
                kind, id, children
            )));
        }
        self.remove_record(kind, id)
    }

    /// Remove one record without looking at its children. Only the cascade
    /// calls this, after the subtree is gone.
    pub(crate) fn remove_record(
        &mut self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), HoardError> {
        let removed = match kind {
            EntityKind::Location => self.backend.remove_location(id)?,
            EntityKind::Item => self.backend.remove_item(id)?,
        };
        if !removed {
            return Err(HoardError::not_found(kind, id));
        }
        tracing::debug!(kind = %kind, id = %id, "deleted record");
        Ok(())
    }

    // =========================================================================
    // PARENT CHECKS
    // =========================================================================

    /// Check that `parent` may hold the Location `id` (`None` for a new record).
    fn check_location_parent(
        &self,
        id: Option<&EntityId>,
        parent: Option<&EntityId>,
    ) -> Result<(), HoardError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if id == Some(parent) {
            return Err(HoardError::Validation(format!(
                "location {} cannot be its own parent",
                parent
            )));
        }

        let Some(mut cursor) = self.backend.location(parent)? else {
            return Err(HoardError::Validation(match self.backend.item(parent)? {
                Some(_) => format!("{} is an item; locations nest only in locations", parent),
                None => format!("parent location {} does not exist", parent),
            }));
        };

        if let Some(id) = id {
            let mut visited = HashSet::new();
            while let Some(next) = cursor.parent_id.take() {
                if &next == id {
                    return Err(HoardError::Validation(format!(
                        "moving location {} under {} would create a cycle",
                        id, parent
                    )));
                }
                if !visited.insert(next.clone()) {
                    break;
                }
                match self.backend.location(&next)? {
                    Some(location) => cursor = location,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Check that `parent` may hold the Item `id` (`None` for a new record).
    fn check_item_parent(
        &self,
        id: Option<&EntityId>,
        parent: Option<&ParentRef>,
    ) -> Result<(), HoardError> {
        match parent {
            None => Ok(()),
            Some(ParentRef::Location(parent_id)) => {
                if self.backend.location(parent_id)?.is_some() {
                    return Ok(());
                }
                Err(HoardError::Validation(match self.backend.item(parent_id)? {
                    Some(_) => format!("parent {} is an item, not a location", parent_id),
                    None => format!("parent location {} does not exist", parent_id),
                }))
            }
            Some(ParentRef::Item(parent_id)) => {
                if id == Some(parent_id) {
                    return Err(HoardError::Validation(format!(
                        "item {} cannot be its own parent",
                        parent_id
                    )));
                }
                let Some(container) = self.backend.item(parent_id)? else {
                    return Err(HoardError::Validation(match self.backend.location(parent_id)? {
                        Some(_) => format!("parent {} is a location, not an item", parent_id),
                        None => format!("parent item {} does not exist", parent_id),
                    }));
                };
                if !container.can_hold_items {
                    return Err(HoardError::Validation(format!(
                        "item {} cannot hold items",
                        parent_id
                    )));
                }
                if let Some(id) = id {
                    self.check_item_chain(id, container)?;
                }
                Ok(())
            }
        }
    }

    /// Walk up from `start` through container items; fail if `id` appears.
    fn check_item_chain(&self, id: &EntityId, start: Item) -> Result<(), HoardError> {
        let mut visited = HashSet::new();
        let mut cursor = start;
        while let Some(ParentRef::Item(next)) = cursor.parent.take() {
            if &next == id {
                return Err(HoardError::Validation(format!(
                    "moving item {} under {} would create a cycle",
                    id, next
                )));
            }
            if !visited.insert(next.clone()) {
                break;
            }
            match self.backend.item(&next)? {
                Some(item) => cursor = item,
                None => break,
            }
        }
        Ok(())
    }
}

// =============================================================================
// INPUT VALIDATION
// =============================================================================

pub(crate) fn required_name(name: &str) -> Result<String, HoardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HoardError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(HoardError::Validation(format!(
            "name exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Trim optional free text; blank becomes `None`.
pub(crate) fn optional_text(
    text: Option<String>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, HoardError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.len() > max_len {
        return Err(HoardError::Validation(format!(
            "{} exceeds {} bytes",
            field, max_len
        )));
    }
    Ok(Some(text.to_string()))
}

fn checked_quantity(quantity: i64, can_hold_items: bool) -> Result<u32, HoardError> {
    if quantity < 0 {
        return Err(HoardError::Validation(format!(
            "quantity must not be negative (got {})",
            quantity
        )));
    }
    let quantity = u32::try_from(quantity)
        .map_err(|_| HoardError::Validation(format!("quantity {} is too large", quantity)))?;
    Ok(if can_hold_items { 1 } else { quantity })
}

pub(crate) fn checked_price(
    price: Option<Money>,
    field: &str,
) -> Result<Option<Money>, HoardError> {
    match price {
        Some(money) if money.minor_units() < 0 => Err(HoardError::Validation(format!(
            "{} must not be negative",
            field
        ))),
        other => Ok(other),
    }
}

/// Trim tags, drop blanks and collapse duplicates.
pub(crate) fn clean_tags<I>(tags: I) -> Result<BTreeSet<String>, HoardError>
where
    I: IntoIterator<Item = String>,
{
    let mut cleaned = BTreeSet::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.len() > MAX_TAG_LENGTH {
            return Err(HoardError::Validation(format!(
                "tag '{}' exceeds {} bytes",
                tag, MAX_TAG_LENGTH
            )));
        }
        cleaned.insert(tag.to_string());
    }
    if cleaned.len() > MAX_TAGS_PER_ITEM {
        return Err(HoardError::Validation(format!(
            "too many tags ({} > {})",
            cleaned.len(),
            MAX_TAGS_PER_ITEM
        )));
    }
    Ok(cleaned)
}

/// Check photo count, size and type; mime types are stored in canonical form.
pub(crate) fn checked_photos(photos: Vec<Photo>) -> Result<Vec<Photo>, HoardError> {
    if photos.len() > MAX_PHOTOS_PER_ENTITY {
        return Err(HoardError::Validation(format!(
            "too many photos ({} > {})",
            photos.len(),
            MAX_PHOTOS_PER_ENTITY
        )));
    }
    photos
        .into_iter()
        .map(|photo| {
            let mime = extension_for_mime(&photo.mime_type)
                .and_then(mime_for_extension)
                .ok_or_else(|| {
                    HoardError::Validation(format!(
                        "unsupported photo type '{}'",
                        photo.mime_type
                    ))
                })?;
            if photo.data.is_empty() {
                return Err(HoardError::Validation("photo is empty".to_string()));
            }
            if photo.data.len() > MAX_PHOTO_BYTES {
                return Err(HoardError::Validation(format!(
                    "photo exceeds {} bytes",
                    MAX_PHOTO_BYTES
                )));
            }
            Ok(Photo::new(mime, photo.data))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn catalog() -> Catalog {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().expect("time");
        Catalog::in_memory()
            .with_clock(ManualClock::starting_at(start))
            .with_allocator(IdAllocator::seeded(11))
    }

    fn new_location(name: &str, parent: Option<&EntityId>) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            parent_id: parent.cloned(),
            ..NewLocation::default()
        }
    }

    fn container(parent: ParentRef) -> NewItem {
        NewItem {
            name: Some("Bin".to_string()),
            parent: Some(parent),
            can_hold_items: true,
            ..NewItem::default()
        }
    }

    #[test]
    fn create_stamps_matching_timestamps() {
        let mut catalog = catalog();
        let garage = catalog
            .create_location(new_location("  Garage ", None))
            .expect("create");
        assert_eq!(garage.name, "Garage");
        assert_eq!(garage.created_at, garage.updated_at);
        assert!(crate::ident::is_canonical(garage.id.as_str()));
    }

    #[test]
    fn update_refreshes_only_updated_at() {
        let mut catalog = catalog();
        let garage = catalog
            .create_location(new_location("Garage", None))
            .expect("create");
        let updated = catalog
            .update_location(
                &garage.id,
                LocationPatch {
                    description: Some(Some("cold".to_string())),
                    ..LocationPatch::default()
                },
            )
            .expect("update");
        assert_eq!(updated.created_at, garage.created_at);
        assert!(updated.updated_at > garage.updated_at);
        assert_eq!(updated.name, "Garage");
        assert_eq!(updated.description.as_deref(), Some("cold"));
    }

    #[test]
    fn update_missing_is_not_found() {
        let mut catalog = catalog();
        let result = catalog.update_item(&"NOPE00".into(), ItemPatch::default());
        assert!(matches!(result, Err(HoardError::NotFound { kind: EntityKind::Item, .. })));
    }

    #[test]
    fn negative_quantity_is_rejected_before_write() {
        let mut catalog = catalog();
        let result = catalog.create_item(NewItem {
            quantity: -3,
            ..NewItem::default()
        });
        assert!(matches!(result, Err(HoardError::Validation(_))));
        assert_eq!(catalog.stats().expect("stats").items, 0);
    }

    #[test]
    fn containers_have_quantity_one() {
        let mut catalog = catalog();
        let item = catalog
            .create_item(NewItem {
                can_hold_items: true,
                quantity: 12,
                ..NewItem::default()
            })
            .expect("create");
        assert_eq!(item.quantity, 1);

        let plain = catalog
            .create_item(NewItem {
                quantity: 5,
                ..NewItem::default()
            })
            .expect("create");
        let promoted = catalog
            .update_item(
                &plain.id,
                ItemPatch {
                    can_hold_items: Some(true),
                    ..ItemPatch::default()
                },
            )
            .expect("update");
        assert_eq!(promoted.quantity, 1);
    }

    #[test]
    fn item_parent_must_be_container() {
        let mut catalog = catalog();
        let plain = catalog.create_item(NewItem::default()).expect("create");
        let result = catalog.create_item(NewItem {
            parent: Some(ParentRef::Item(plain.id.clone())),
            ..NewItem::default()
        });
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }

    #[test]
    fn parent_kind_must_match() {
        let mut catalog = catalog();
        let garage = catalog
            .create_location(new_location("Garage", None))
            .expect("create");
        let as_item = catalog.create_item(NewItem {
            parent: Some(ParentRef::Item(garage.id.clone())),
            ..NewItem::default()
        });
        assert!(matches!(as_item, Err(HoardError::Validation(_))));

        let missing = catalog.create_location(new_location("Shelf", Some(&"ZZZZZZ".into())));
        assert!(matches!(missing, Err(HoardError::Validation(_))));
    }

    #[test]
    fn location_cycles_are_refused() {
        let mut catalog = catalog();
        let a = catalog.create_location(new_location("A", None)).expect("a");
        let b = catalog
            .create_location(new_location("B", Some(&a.id)))
            .expect("b");
        let c = catalog
            .create_location(new_location("C", Some(&b.id)))
            .expect("c");

        let result = catalog.update_location(
            &a.id,
            LocationPatch {
                parent_id: Some(Some(c.id.clone())),
                ..LocationPatch::default()
            },
        );
        assert!(matches!(result, Err(HoardError::Validation(_))));

        let self_parent = catalog.update_location(
            &a.id,
            LocationPatch {
                parent_id: Some(Some(a.id.clone())),
                ..LocationPatch::default()
            },
        );
        assert!(matches!(self_parent, Err(HoardError::Validation(_))));
    }

    #[test]
    fn item_cycles_are_refused() {
        let mut catalog = catalog();
        let room = catalog
            .create_location(new_location("Room", None))
            .expect("room");
        let outer = catalog
            .create_item(container(ParentRef::Location(room.id.clone())))
            .expect("outer");
        let inner = catalog
            .create_item(container(ParentRef::Item(outer.id.clone())))
            .expect("inner");

        let result = catalog.update_item(
            &outer.id,
            ItemPatch {
                parent: Some(Some(ParentRef::Item(inner.id.clone()))),
                ..ItemPatch::default()
            },
        );
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }

    #[test]
    fn clearing_capability_with_children_is_refused() {
        let mut catalog = catalog();
        let bin = catalog
            .create_item(NewItem {
                can_hold_items: true,
                ..NewItem::default()
            })
            .expect("bin");
        catalog
            .create_item(NewItem {
                parent: Some(ParentRef::Item(bin.id.clone())),
                ..NewItem::default()
            })
            .expect("child");

        let result = catalog.update_item(
            &bin.id,
            ItemPatch {
                can_hold_items: Some(false),
                ..ItemPatch::default()
            },
        );
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }

    #[test]
    fn list_by_parent_filters_kind() {
        let mut catalog = catalog();
        let house = catalog
            .create_location(new_location("House", None))
            .expect("house");
        catalog
            .create_location(new_location("Kitchen", Some(&house.id)))
            .expect("kitchen");
        catalog
            .create_item(NewItem {
                parent: Some(ParentRef::Location(house.id.clone())),
                ..NewItem::default()
            })
            .expect("item");

        assert_eq!(catalog.list_by_parent(&house.id, None).expect("list").len(), 2);
        assert_eq!(
            catalog
                .list_by_parent(&house.id, Some(EntityKind::Item))
                .expect("list")
                .len(),
            0
        );
        assert_eq!(
            catalog
                .list_by_parent(&house.id, Some(EntityKind::Location))
                .expect("list")
                .len(),
            2
        );
    }

    #[test]
    fn unassigned_items_are_listed_separately() {
        let mut catalog = catalog();
        catalog.create_item(NewItem::default()).expect("loose");
        let stats = catalog.stats().expect("stats");
        assert_eq!(stats.unassigned_items, 1);
        assert_eq!(catalog.unassigned_items().expect("list").len(), 1);
    }

    #[test]
    fn delete_removes_exactly_one_record() {
        let mut catalog = catalog();
        let house = catalog
            .create_location(new_location("House", None))
            .expect("house");
        catalog.delete(EntityKind::Location, &house.id).expect("delete");
        assert!(catalog.location(&house.id).expect("get").is_none());
        assert!(matches!(
            catalog.delete(EntityKind::Location, &house.id),
            Err(HoardError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_refuses_records_that_hold_children() {
        let mut catalog = catalog();
        let room = catalog
            .create_location(new_location("Room", None))
            .expect("room");
        let lamp = catalog
            .create_item(NewItem {
                name: Some("Lamp".into()),
                parent: Some(ParentRef::Location(room.id.clone())),
                ..NewItem::default()
            })
            .expect("lamp");

        assert!(matches!(
            catalog.delete(EntityKind::Location, &room.id),
            Err(HoardError::Validation(_))
        ));
        assert!(catalog.location(&room.id).expect("get").is_some());
        assert!(catalog.item(&lamp.id).expect("get").is_some());

        catalog.delete(EntityKind::Item, &lamp.id).expect("lamp");
        catalog.delete(EntityKind::Location, &room.id).expect("room");
        assert_eq!(catalog.stats().expect("stats").locations, 0);
    }

    #[test]
    fn resolve_accepts_misread_labels() {
        let mut catalog = catalog().with_allocator(IdAllocator::seeded(5));
        let shelf = catalog
            .create_location(new_location("Shelf", None))
            .expect("shelf");
        let typed: String = shelf
            .id
            .as_str()
            .chars()
            .map(|c| match c {
                '0' => 'o',
                '1' => 'l',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        let found = catalog.resolve(&typed).expect("resolve").expect("found");
        assert_eq!(found.id(), &shelf.id);
    }

    #[test]
    fn search_matches_tags_and_names() {
        let mut catalog = catalog();
        catalog
            .create_item(NewItem {
                name: Some("Cordless Drill".to_string()),
                tags: vec!["Tools".to_string()],
                ..NewItem::default()
            })
            .expect("drill");
        catalog
            .create_item(NewItem {
                name: Some("Hammer".to_string()),
                tags: vec!["tools".to_string(), " ".to_string()],
                ..NewItem::default()
            })
            .expect("hammer");

        assert_eq!(catalog.search("drill").expect("search").len(), 1);
        assert_eq!(catalog.search("TOOLS").expect("search").len(), 2);
        assert!(catalog.search("  ").expect("search").is_empty());
    }

    #[test]
    fn photos_are_checked_and_canonicalized() {
        let mut catalog = catalog();
        let ok = catalog
            .create_item(NewItem {
                photos: vec![Photo::new("IMAGE/PNG", vec![1])],
                ..NewItem::default()
            })
            .expect("create");
        assert_eq!(ok.photos[0].mime_type, "image/png");

        let bad = catalog.create_item(NewItem {
            photos: vec![Photo::new("application/pdf", vec![1])],
            ..NewItem::default()
        });
        assert!(matches!(bad, Err(HoardError::Validation(_))));
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = clean_tags(vec![" a ".to_string(), "a".to_string(), "".to_string()])
            .expect("tags");
        assert_eq!(tags.len(), 1);
        assert!(tags.contains("a"));
    }
}
