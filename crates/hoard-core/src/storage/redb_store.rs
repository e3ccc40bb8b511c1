//! # redb-backed Entity Storage
//!
//! A disk-backed `EntityStore` using the redb embedded database.
//!
//! redb provides:
//! - ACID transactions (one write transaction per record operation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Layout
//!
//! - `locations`, `items`: id -> postcard-encoded record
//! - `locations_by_parent`, `items_by_parent`: parent id -> child ids
//!   (multimap; roots and unassigned items live under the empty key)
//! - `metadata`: `schema_version`
//!
//! ## Schema Steps
//!
//! Every open runs the schema steps newer than the stored version inside one
//! write transaction. Steps only create tables or rebuild indexes from the
//! records, so re-running one never loses data.

use crate::primitives::SCHEMA_VERSION;
use crate::store::EntityStore;
use crate::{EntityId, HoardError, Item, Location};
use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for locations: id -> serialized Location bytes
const LOCATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("locations");

/// Table for items: id -> serialized Item bytes
const ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("items");

/// Parent index for locations: parent id -> child location ids
const LOCATIONS_BY_PARENT: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("locations_by_parent");

/// Parent index for items: parent id -> child item ids
const ITEMS_BY_PARENT: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("items_by_parent");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const SCHEMA_KEY: &str = "schema_version";

/// Index key for records without a parent.
const ROOT_KEY: &str = "";

fn storage_err(e: impl std::fmt::Display) -> HoardError {
    HoardError::Storage(e.to_string())
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, HoardError> {
    postcard::to_allocvec(record).map_err(|e| HoardError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HoardError> {
    postcard::from_bytes(bytes).map_err(|e| HoardError::Serialization(e.to_string()))
}

fn parent_key(parent: Option<&EntityId>) -> &str {
    parent.map_or(ROOT_KEY, EntityId::as_str)
}

fn item_parent(item: &Item) -> Option<&EntityId> {
    item.parent.as_ref().map(|p| p.id())
}

// =============================================================================
// SCHEMA STEPS
// =============================================================================

struct SchemaStep {
    version: u64,
    name: &'static str,
    apply: fn(&WriteTransaction) -> Result<(), HoardError>,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "create record tables",
        apply: create_record_tables,
    },
    SchemaStep {
        version: 2,
        name: "index items by parent",
        apply: rebuild_item_index,
    },
    SchemaStep {
        version: 3,
        name: "index locations by parent",
        apply: rebuild_location_index,
    },
];

fn create_record_tables(txn: &WriteTransaction) -> Result<(), HoardError> {
    let _ = txn.open_table(LOCATIONS).map_err(storage_err)?;
    let _ = txn.open_table(ITEMS).map_err(storage_err)?;
    Ok(())
}

fn rebuild_item_index(txn: &WriteTransaction) -> Result<(), HoardError> {
    let mut entries = Vec::new();
    {
        let table = txn.open_table(ITEMS).map_err(storage_err)?;
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            let item: Item = decode(value.value())?;
            entries.push((parent_key(item_parent(&item)).to_string(), item.id));
        }
    }

    txn.delete_multimap_table(ITEMS_BY_PARENT)
        .map_err(storage_err)?;
    let mut index = txn
        .open_multimap_table(ITEMS_BY_PARENT)
        .map_err(storage_err)?;
    for (parent, child) in &entries {
        index
            .insert(parent.as_str(), child.as_str())
            .map_err(storage_err)?;
    }
    Ok(())
}

fn rebuild_location_index(txn: &WriteTransaction) -> Result<(), HoardError> {
    let mut entries = Vec::new();
    {
        let table = txn.open_table(LOCATIONS).map_err(storage_err)?;
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            let location: Location = decode(value.value())?;
            entries.push((
                parent_key(location.parent_id.as_ref()).to_string(),
                location.id,
            ));
        }
    }

    txn.delete_multimap_table(LOCATIONS_BY_PARENT)
        .map_err(storage_err)?;
    let mut index = txn
        .open_multimap_table(LOCATIONS_BY_PARENT)
        .map_err(storage_err)?;
    for (parent, child) in &entries {
        index
            .insert(parent.as_str(), child.as_str())
            .map_err(storage_err)?;
    }
    Ok(())
}

// =============================================================================
// REDB STORE
// =============================================================================

/// A disk-backed entity store using redb.
pub struct RedbStore {
    db: Database,
    schema_version: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HoardError> {
        let db = Database::create(path.as_ref()).map_err(|e| HoardError::Io(e.to_string()))?;
        let schema_version = Self::apply_schema_steps(&db)?;
        Ok(Self { db, schema_version })
    }

    /// Schema version recorded in the file after open.
    #[must_use]
    pub fn schema_version(&self) -> u64 {
        self.schema_version
    }

    fn apply_schema_steps(db: &Database) -> Result<u64, HoardError> {
        let txn = db.begin_write().map_err(storage_err)?;
        {
            let mut meta = txn.open_table(METADATA).map_err(storage_err)?;
            let stored = meta
                .get(SCHEMA_KEY)
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0);

            if stored > SCHEMA_VERSION {
                return Err(HoardError::Storage(format!(
                    "store schema v{} is newer than this build (v{})",
                    stored, SCHEMA_VERSION
                )));
            }

            for step in SCHEMA_STEPS.iter().filter(|s| s.version > stored) {
                (step.apply)(&txn)?;
                tracing::info!(version = step.version, step = step.name, "applied schema step");
            }

            // Tables every later call expects, whatever the starting version.
            create_record_tables(&txn)?;
            let _ = txn
                .open_multimap_table(LOCATIONS_BY_PARENT)
                .map_err(storage_err)?;
            let _ = txn
                .open_multimap_table(ITEMS_BY_PARENT)
                .map_err(storage_err)?;

            meta.insert(SCHEMA_KEY, SCHEMA_VERSION)
                .map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(SCHEMA_VERSION)
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        id: &EntityId,
    ) -> Result<Option<T>, HoardError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        match table.get(id.as_str()).map_err(storage_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn all_records<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
    ) -> Result<Vec<T>, HoardError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        let mut records = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    fn children<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        index: MultimapTableDefinition<&str, &str>,
        parent: Option<&EntityId>,
    ) -> Result<Vec<T>, HoardError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let index = read_txn.open_multimap_table(index).map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;

        let mut records = Vec::new();
        for child in index.get(parent_key(parent)).map_err(storage_err)? {
            let child = child.map_err(storage_err)?;
            if let Some(data) = table.get(child.value()).map_err(storage_err)? {
                records.push(decode(data.value())?);
            }
        }
        Ok(records)
    }

    fn count(&self, table: TableDefinition<&str, &[u8]>) -> Result<usize, HoardError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        Ok(table.len().map_err(storage_err)? as usize)
    }
}

// =============================================================================
// ENTITYSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl EntityStore for RedbStore {
    fn location(&self, id: &EntityId) -> Result<Option<Location>, HoardError> {
        self.get_record(LOCATIONS, id)
    }

    fn item(&self, id: &EntityId) -> Result<Option<Item>, HoardError> {
        self.get_record(ITEMS, id)
    }

    fn put_location(&mut self, location: &Location) -> Result<(), HoardError> {
        let bytes = encode(location)?;
        let id = location.id.as_str();

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(LOCATIONS).map_err(storage_err)?;
            let old: Option<Location> = table
                .get(id)
                .map_err(storage_err)?
                .map(|data| decode(data.value()))
                .transpose()?;
            table.insert(id, bytes.as_slice()).map_err(storage_err)?;

            let mut index = write_txn
                .open_multimap_table(LOCATIONS_BY_PARENT)
                .map_err(storage_err)?;
            if let Some(old) = old {
                index
                    .remove(parent_key(old.parent_id.as_ref()), id)
                    .map_err(storage_err)?;
            }
            index
                .insert(parent_key(location.parent_id.as_ref()), id)
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn put_item(&mut self, item: &Item) -> Result<(), HoardError> {
        let bytes = encode(item)?;
        let id = item.id.as_str();

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(ITEMS).map_err(storage_err)?;
            let old: Option<Item> = table
                .get(id)
                .map_err(storage_err)?
                .map(|data| decode(data.value()))
                .transpose()?;
            table.insert(id, bytes.as_slice()).map_err(storage_err)?;

            let mut index = write_txn
                .open_multimap_table(ITEMS_BY_PARENT)
                .map_err(storage_err)?;
            if let Some(old) = old {
                index
                    .remove(parent_key(item_parent(&old)), id)
                    .map_err(storage_err)?;
            }
            index
                .insert(parent_key(item_parent(item)), id)
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn remove_location(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(LOCATIONS).map_err(storage_err)?;
            let old: Option<Location> = table
                .remove(id.as_str())
                .map_err(storage_err)?
                .map(|data| decode(data.value()))
                .transpose()?;

            match old {
                Some(old) => {
                    let mut index = write_txn
                        .open_multimap_table(LOCATIONS_BY_PARENT)
                        .map_err(storage_err)?;
                    index
                        .remove(parent_key(old.parent_id.as_ref()), id.as_str())
                        .map_err(storage_err)?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    fn remove_item(&mut self, id: &EntityId) -> Result<bool, HoardError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(ITEMS).map_err(storage_err)?;
            let old: Option<Item> = table
                .remove(id.as_str())
                .map_err(storage_err)?
                .map(|data| decode(data.value()))
                .transpose()?;

            match old {
                Some(old) => {
                    let mut index = write_txn
                        .open_multimap_table(ITEMS_BY_PARENT)
                        .map_err(storage_err)?;
                    index
                        .remove(parent_key(item_parent(&old)), id.as_str())
                        .map_err(storage_err)?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    fn child_locations(&self, parent: Option<&EntityId>) -> Result<Vec<Location>, HoardError> {
        self.children(LOCATIONS, LOCATIONS_BY_PARENT, parent)
    }

    fn child_items(&self, parent: Option<&EntityId>) -> Result<Vec<Item>, HoardError> {
        self.children(ITEMS, ITEMS_BY_PARENT, parent)
    }

    fn locations(&self) -> Result<Vec<Location>, HoardError> {
        self.all_records(LOCATIONS)
    }

    fn items(&self) -> Result<Vec<Item>, HoardError> {
        self.all_records(ITEMS)
    }

    fn location_count(&self) -> Result<usize, HoardError> {
        self.count(LOCATIONS)
    }

    fn item_count(&self) -> Result<usize, HoardError> {
        self.count(ITEMS)
    }
}

// =============================================================================
// TESTS
// =============================================================================
