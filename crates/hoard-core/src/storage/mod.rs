//! # Storage Backends
//!
//! `StorageBackend` selects between the volatile [`MemoryStore`] and the
//! disk-backed [`RedbStore`]; both sit behind the [`EntityStore`] trait.

pub mod redb_store;

pub use redb_store::RedbStore;

use crate::store::{EntityStore, MemoryStore};
use crate::{EntityId, HoardError, Item, Location};

/// Storage backend for a Catalog.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Whether records survive a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn EntityStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn EntityStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

impl EntityStore for StorageBackend {
    fn location(&self, id: &EntityId) -> Result<Option<Location>, HoardError> {
        self.store().location(id)
    }

    fn item(&self, id: &EntityId) -> Result<Option<Item>, HoardError> {
        self.store().item(id)
    }

    fn put_location(&mut self, location: &Location) -> Result<(), HoardError> {
        self.store_mut().put_location(location)
    }

    fn put_item(&mut self, item: &Item) -> Result<(), HoardError> {
        self.store_mut().put_item(item)
    }

    fn remove_location(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        self.store_mut().remove_location(id)
    }

    fn remove_item(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        self.store_mut().remove_item(id)
    }

    fn child_locations(&self, parent: Option<&EntityId>) -> Result<Vec<Location>, HoardError> {
        self.store().child_locations(parent)
    }

    fn child_items(&self, parent: Option<&EntityId>) -> Result<Vec<Item>, HoardError> {
        self.store().child_items(parent)
    }

    fn locations(&self) -> Result<Vec<Location>, HoardError> {
        self.store().locations()
    }

    fn items(&self) -> Result<Vec<Item>, HoardError> {
        self.store().items()
    }

    fn location_count(&self) -> Result<usize, HoardError> {
        self.store().location_count()
    }

    fn item_count(&self) -> Result<usize, HoardError> {
        self.store().item_count()
    }
}
