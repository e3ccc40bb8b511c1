//! # Archive Import
//!
//! Preview and merge-by-id import of archives written by any supported
//! generation.
//!
//! ## Import Phases
//!
//! 1. Read and parse the manifest, then upgrade it to the current shape.
//!    Any failure here is an `ArchiveFormat` error and nothing is written.
//! 2. Plan every record: resolve photos, check ids against both
//!    collections, and repair parent references that are dangling, of the
//!    wrong kind, or part of a cycle. Repairs become warnings.
//! 3. Write Locations and then Items, each parent before its children,
//!    through the store primitives. Archive timestamps are kept; a record
//!    that already exists is overwritten (last write wins).
//!
//! One record failing never stops the batch.

use super::manifest::{ItemRecord, LocationRecord, Manifest, ManifestV3};
use super::migrate::upgrade;
use crate::catalog::{
    Catalog, checked_photos, checked_price, clean_tags, optional_text, required_name,
};
use crate::primitives::{
    MANIFEST_FILE, MAX_ARCHIVE_BYTES, MAX_DESCRIPTION_LENGTH, MAX_MANIFEST_BYTES, MAX_NAME_LENGTH,
    PHOTO_DIR,
};
use crate::store::EntityStore;
use crate::{
    EntityId, EntityKind, HoardError, IntegrityWarning, Item, Location, Money, ParentRef, Photo,
    mime_for_extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Per-kind import tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// A record that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub id: EntityId,
    pub kind: EntityKind,
    pub reason: String,
}

/// Structured outcome of an import. Partial failure is reported here, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Version tag of the archive as read, before migration.
    pub format_version: u32,
    pub locations: KindCounts,
    pub items: KindCounts,
    pub warnings: Vec<IntegrityWarning>,
    pub errors: Vec<ImportFailure>,
}

impl ImportResult {
    /// True when no record failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, kind: EntityKind, id: &EntityId, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(kind = %kind, id = %id, reason = %reason, "record not imported");
        self.errors.push(ImportFailure {
            id: id.clone(),
            kind,
            reason,
        });
    }

    fn counts_mut(&mut self, kind: EntityKind) -> &mut KindCounts {
        match kind {
            EntityKind::Location => &mut self.locations,
            EntityKind::Item => &mut self.items,
        }
    }
}

/// Record counts in a manifest, after upgrading to the current shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManifestCounts {
    pub locations: usize,
    pub items: usize,
    pub photos: usize,
}

/// What an archive holds, checked without touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivePreview {
    pub valid: bool,
    pub format_version: Option<u32>,
    pub exported_at: Option<DateTime<Utc>>,
    pub counts: ManifestCounts,
    /// Migration anomalies an import of this archive would report.
    pub warnings: Vec<IntegrityWarning>,
    /// Why the archive is invalid.
    pub problem: Option<String>,
}

// =============================================================================
// READING
// =============================================================================

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn format_err(message: impl Into<String>) -> HoardError {
    HoardError::ArchiveFormat(message.into())
}

fn open_archive(bytes: &[u8]) -> Result<(Archive<'_>, Manifest), HoardError> {
    if bytes.len() > MAX_ARCHIVE_BYTES {
        return Err(format_err(format!(
            "archive is {} bytes, limit is {}",
            bytes.len(),
            MAX_ARCHIVE_BYTES
        )));
    }
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format_err(format!("not a readable archive: {}", e)))?;

    let mut buffer = Vec::new();
    {
        let mut file = archive.by_name(MANIFEST_FILE).map_err(|e| match e {
            ZipError::FileNotFound => format_err(format!("archive has no {}", MANIFEST_FILE)),
            other => format_err(format!("cannot open {}: {}", MANIFEST_FILE, other)),
        })?;
        if file.size() > MAX_MANIFEST_BYTES {
            return Err(format_err(format!(
                "{} exceeds {} bytes",
                MANIFEST_FILE, MAX_MANIFEST_BYTES
            )));
        }
        file.read_to_end(&mut buffer)
            .map_err(|e| format_err(format!("cannot read {}: {}", MANIFEST_FILE, e)))?;
    }

    let value: serde_json::Value = serde_json::from_slice(&buffer)
        .map_err(|e| format_err(format!("{} is not valid JSON: {}", MANIFEST_FILE, e)))?;
    let manifest = Manifest::from_json(value)?;
    Ok((archive, manifest))
}

/// Read one photo payload. `Ok(None)` when the archive lacks the file.
fn read_photo(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>, HoardError> {
    match archive.by_name(&format!("{}/{}", PHOTO_DIR, name)) {
        Ok(mut file) => {
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .map_err(|e| HoardError::Io(format!("cannot read photo {}: {}", name, e)))?;
            Ok(Some(buffer))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(HoardError::Io(format!("cannot open photo {}: {}", name, e))),
    }
}

/// Resolve photo filenames to payloads; unreadable slots are dropped with a warning.
fn resolve_photos(
    archive: &mut Archive<'_>,
    id: &EntityId,
    names: &[String],
    warnings: &mut Vec<IntegrityWarning>,
) -> Vec<Photo> {
    let mut photos = Vec::with_capacity(names.len());
    for name in names {
        let mime = name
            .rsplit_once('.')
            .and_then(|(_, ext)| mime_for_extension(ext));
        let data = match read_photo(archive, name) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(id = %id, file = %name, error = %e, "photo unreadable");
                None
            }
        };
        match (mime, data) {
            (Some(mime), Some(data)) => photos.push(Photo::new(mime, data)),
            _ => warnings.push(IntegrityWarning::MissingPhoto {
                id: id.clone(),
                file: name.clone(),
            }),
        }
    }
    photos
}

// =============================================================================
// PREVIEW
// =============================================================================

/// Validate an archive and count its contents without writing anything.
#[must_use]
pub fn preview_archive(bytes: &[u8]) -> ArchivePreview {
    match open_archive(bytes) {
        Ok((_, manifest)) => {
            let format_version = manifest.version();
            let exported_at = manifest.exported_at();
            let mut warnings = Vec::new();
            let current = upgrade(manifest, &mut warnings);
            let photos = current.locations.iter().map(|l| l.photos.len()).sum::<usize>()
                + current.items.iter().map(|i| i.photos.len()).sum::<usize>();
            ArchivePreview {
                valid: true,
                format_version: Some(format_version),
                exported_at: Some(exported_at),
                counts: ManifestCounts {
                    locations: current.locations.len(),
                    items: current.items.len(),
                    photos,
                },
                warnings,
                problem: None,
            }
        }
        Err(e) => ArchivePreview {
            valid: false,
            format_version: None,
            exported_at: None,
            counts: ManifestCounts::default(),
            warnings: Vec::new(),
            problem: Some(e.to_string()),
        },
    }
}

// =============================================================================
// PLANNING
// =============================================================================

/// Records accepted for writing, keyed by id.
struct Plan {
    locations: BTreeMap<EntityId, Location>,
    items: BTreeMap<EntityId, Item>,
}

impl Plan {
    fn location_parent(
        &self,
        store: &impl EntityStore,
        id: &EntityId,
    ) -> Result<Option<EntityId>, HoardError> {
        if let Some(location) = self.locations.get(id) {
            return Ok(location.parent_id.clone());
        }
        Ok(store.location(id)?.and_then(|l| l.parent_id))
    }

    fn item_parent(
        &self,
        store: &impl EntityStore,
        id: &EntityId,
    ) -> Result<Option<ParentRef>, HoardError> {
        if let Some(item) = self.items.get(id) {
            return Ok(item.parent.clone());
        }
        Ok(store.item(id)?.and_then(|i| i.parent))
    }

    fn location_exists(&self, store: &impl EntityStore, id: &EntityId) -> Result<bool, HoardError> {
        Ok(self.locations.contains_key(id) || store.location(id)?.is_some())
    }

    /// `Some(can_hold_items)` if the item exists in the plan or the store.
    fn item_capability(
        &self,
        store: &impl EntityStore,
        id: &EntityId,
    ) -> Result<Option<bool>, HoardError> {
        if let Some(item) = self.items.get(id) {
            return Ok(Some(item.can_hold_items));
        }
        Ok(store.item(id)?.map(|i| i.can_hold_items))
    }
}

fn location_from_record(
    record: LocationRecord,
    photos: Vec<Photo>,
) -> Result<Location, HoardError> {
    Ok(Location {
        name: required_name(&record.name)?,
        description: optional_text(record.description, "description", MAX_DESCRIPTION_LENGTH)?,
        photos: checked_photos(photos)?,
        id: record.id,
        parent_id: record.parent_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn item_from_record(
    record: ItemRecord,
    parent: Option<ParentRef>,
    photos: Vec<Photo>,
) -> Result<Item, HoardError> {
    let quantity = u32::try_from(record.quantity).map_err(|_| {
        HoardError::Validation(format!("quantity {} is out of range", record.quantity))
    })?;
    Ok(Item {
        name: optional_text(record.name, "name", MAX_NAME_LENGTH)?,
        description: optional_text(record.description, "description", MAX_DESCRIPTION_LENGTH)?,
        tags: clean_tags(record.tags)?,
        purchase_price: checked_price(
            record.purchase_price.map(Money::from_minor),
            "purchase price",
        )?,
        current_value: checked_price(
            record.current_value.map(Money::from_minor),
            "current value",
        )?,
        photos: checked_photos(photos)?,
        id: record.id,
        parent,
        can_hold_items: record.can_hold_items,
        quantity: if record.can_hold_items { 1 } else { quantity },
        include_in_total: record.include_in_total,
        acquired_on: record.acquired_on,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Turn manifest records into domain records, dropping the ones that
/// cannot be imported at all.
fn plan_records(
    catalog: &Catalog,
    archive: &mut Archive<'_>,
    manifest: ManifestV3,
    result: &mut ImportResult,
) -> Result<Plan, HoardError> {
    let store = catalog.backend();
    let mut plan = Plan {
        locations: BTreeMap::new(),
        items: BTreeMap::new(),
    };

    let archive_location_ids: HashSet<EntityId> =
        manifest.locations.iter().map(|l| l.id.clone()).collect();

    for record in manifest.locations {
        let id = record.id.clone();
        if id.as_str().trim().is_empty() {
            result.fail(EntityKind::Location, &id, "empty id");
            continue;
        }
        if plan.locations.contains_key(&id) {
            result.fail(EntityKind::Location, &id, "duplicate id in archive");
            continue;
        }
        if store.item(&id)?.is_some() {
            result.warnings.push(IntegrityWarning::IdCollision {
                id,
                kind: EntityKind::Item,
            });
            result.locations.skipped += 1;
            continue;
        }
        let photos = resolve_photos(archive, &id, &record.photos, &mut result.warnings);
        match location_from_record(record, photos) {
            Ok(location) => {
                plan.locations.insert(id, location);
            }
            Err(e) => result.fail(EntityKind::Location, &id, e.to_string()),
        }
    }

    for record in manifest.items {
        let id = record.id.clone();
        if id.as_str().trim().is_empty() {
            result.fail(EntityKind::Item, &id, "empty id");
            continue;
        }
        if plan.items.contains_key(&id) {
            result.fail(EntityKind::Item, &id, "duplicate id in archive");
            continue;
        }
        if archive_location_ids.contains(&id) || store.location(&id)?.is_some() {
            result.warnings.push(IntegrityWarning::IdCollision {
                id,
                kind: EntityKind::Location,
            });
            result.items.skipped += 1;
            continue;
        }

        // v3 may omit the parent kind; infer it from where the id lives.
        let parent = match (record.parent_id.clone(), record.parent_type) {
            (Some(parent_id), Some(kind)) => Some(ParentRef::new(parent_id, kind)),
            (Some(parent_id), None) => {
                let kind = if archive_location_ids.contains(&parent_id) {
                    EntityKind::Location
                } else {
                    store.kind_of(&parent_id)?.unwrap_or(EntityKind::Item)
                };
                Some(ParentRef::new(parent_id, kind))
            }
            (None, _) => None,
        };
        let photos = resolve_photos(archive, &id, &record.photos, &mut result.warnings);
        match item_from_record(record, parent, photos) {
            Ok(item) => {
                plan.items.insert(id, item);
            }
            Err(e) => result.fail(EntityKind::Item, &id, e.to_string()),
        }
    }

    Ok(plan)
}

/// Demote records whose parent is missing or of the wrong kind to
/// root/unassigned, with a warning.
fn repair_parents(
    plan: &mut Plan,
    store: &impl EntityStore,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<(), HoardError> {
    let location_ids: Vec<EntityId> = plan.locations.keys().cloned().collect();
    for id in location_ids {
        let Some(parent_id) = plan.locations.get(&id).and_then(|l| l.parent_id.clone()) else {
            continue;
        };
        let problem = if parent_id == id {
            Some(IntegrityWarning::InvalidParent {
                id: id.clone(),
                parent_id: parent_id.clone(),
                reason: "a location cannot be its own parent".to_string(),
            })
        } else if plan.location_exists(store, &parent_id)? {
            None
        } else if plan.items.contains_key(&parent_id) || store.item(&parent_id)?.is_some() {
            Some(IntegrityWarning::InvalidParent {
                id: id.clone(),
                parent_id: parent_id.clone(),
                reason: "locations nest only in locations".to_string(),
            })
        } else {
            Some(IntegrityWarning::DanglingParent {
                id: id.clone(),
                parent_id: parent_id.clone(),
            })
        };
        if let Some(warning) = problem {
            warnings.push(warning);
            if let Some(location) = plan.locations.get_mut(&id) {
                location.parent_id = None;
            }
        }
    }

    let item_ids: Vec<EntityId> = plan.items.keys().cloned().collect();
    for id in item_ids {
        let Some(parent) = plan.items.get(&id).and_then(|i| i.parent.clone()) else {
            continue;
        };
        let problem = match &parent {
            ParentRef::Location(parent_id) => {
                if plan.location_exists(store, parent_id)? {
                    None
                } else if plan.item_capability(store, parent_id)?.is_some() {
                    Some(IntegrityWarning::InvalidParent {
                        id: id.clone(),
                        parent_id: parent_id.clone(),
                        reason: "parent is an item, not a location".to_string(),
                    })
                } else {
                    Some(IntegrityWarning::DanglingParent {
                        id: id.clone(),
                        parent_id: parent_id.clone(),
                    })
                }
            }
            ParentRef::Item(parent_id) => {
                if parent_id == &id {
                    Some(IntegrityWarning::InvalidParent {
                        id: id.clone(),
                        parent_id: parent_id.clone(),
                        reason: "an item cannot be its own parent".to_string(),
                    })
                } else {
                    match plan.item_capability(store, parent_id)? {
                        Some(true) => None,
                        Some(false) => Some(IntegrityWarning::InvalidParent {
                            id: id.clone(),
                            parent_id: parent_id.clone(),
                            reason: "parent item cannot hold items".to_string(),
                        }),
                        None if plan.location_exists(store, parent_id)? => {
                            Some(IntegrityWarning::InvalidParent {
                                id: id.clone(),
                                parent_id: parent_id.clone(),
                                reason: "parent is a location, not an item".to_string(),
                            })
                        }
                        None => Some(IntegrityWarning::DanglingParent {
                            id: id.clone(),
                            parent_id: parent_id.clone(),
                        }),
                    }
                }
            }
        };
        if let Some(warning) = problem {
            warnings.push(warning);
            if let Some(item) = plan.items.get_mut(&id) {
                item.parent = None;
            }
        }
    }
    Ok(())
}

/// Cut parent edges that close a cycle, walking from each planned record.
fn break_cycles(
    plan: &mut Plan,
    store: &impl EntityStore,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<(), HoardError> {
    let location_ids: Vec<EntityId> = plan.locations.keys().cloned().collect();
    for start in location_ids {
        let mut visited: HashSet<EntityId> = HashSet::from([start.clone()]);
        let mut cursor = start.clone();
        while let Some(next) = plan.location_parent(store, &cursor)? {
            if visited.insert(next.clone()) {
                cursor = next;
                continue;
            }
            if let Some(location) = plan.locations.get_mut(&cursor) {
                location.parent_id = None;
                warnings.push(IntegrityWarning::CycleDetected { id: cursor.clone() });
            }
            break;
        }
    }

    let item_ids: Vec<EntityId> = plan.items.keys().cloned().collect();
    for start in item_ids {
        let mut visited: HashSet<EntityId> = HashSet::from([start.clone()]);
        let mut cursor = start.clone();
        while let Some(ParentRef::Item(next)) = plan.item_parent(store, &cursor)? {
            if visited.insert(next.clone()) {
                cursor = next;
                continue;
            }
            if let Some(item) = plan.items.get_mut(&cursor) {
                item.parent = None;
                warnings.push(IntegrityWarning::CycleDetected { id: cursor.clone() });
            }
            break;
        }
    }
    Ok(())
}

/// Keep the container flag on planned items that would otherwise strand
/// stored children the archive does not move elsewhere.
fn keep_occupied_containers(
    plan: &mut Plan,
    store: &impl EntityStore,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<(), HoardError> {
    let mut occupied = BTreeSet::new();
    for (id, item) in &plan.items {
        if item.can_hold_items {
            continue;
        }
        let stored_children = store
            .child_items(Some(id))?
            .into_iter()
            .any(|child| match plan.items.get(&child.id) {
                Some(replacement) => replacement.is_child_of(id),
                None => true,
            });
        if stored_children {
            occupied.insert(id.clone());
        }
    }
    for id in occupied {
        if let Some(item) = plan.items.get_mut(&id) {
            item.can_hold_items = true;
            item.quantity = 1;
            warnings.push(IntegrityWarning::LossyMigration {
                id,
                detail: "kept as a container because it still holds items".to_string(),
            });
        }
    }
    Ok(())
}

/// Order planned ids so every planned parent precedes its children.
fn parent_first<F>(ids: Vec<EntityId>, mut parent: F) -> Vec<EntityId>
where
    F: FnMut(&EntityId) -> Option<EntityId>,
{
    let planned: HashSet<EntityId> = ids.iter().cloned().collect();
    let mut emitted: HashSet<EntityId> = HashSet::new();
    let mut order = Vec::with_capacity(ids.len());

    for id in ids {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if emitted.contains(&current) || chain.contains(&current) || !planned.contains(&current)
            {
                break;
            }
            cursor = parent(&current);
            chain.push(current);
        }
        for id in chain.into_iter().rev() {
            emitted.insert(id.clone());
            order.push(id);
        }
    }
    order
}

// =============================================================================
// IMPORT
// =============================================================================

/// Merge an archive into the catalog by id.
///
/// # Errors
///
/// `ArchiveFormat` when the archive cannot be read or has an unsupported
/// version; nothing is written in that case. A store failure while
/// planning also aborts before any write. Failures of individual records
/// are reported in the result.
pub fn import_archive(catalog: &mut Catalog, bytes: &[u8]) -> Result<ImportResult, HoardError> {
    let (mut archive, manifest) = open_archive(bytes)?;
    let mut result = ImportResult {
        format_version: manifest.version(),
        ..ImportResult::default()
    };

    let current = upgrade(manifest, &mut result.warnings);
    let mut plan = plan_records(catalog, &mut archive, current, &mut result)?;
    {
        let store = catalog.backend();
        repair_parents(&mut plan, store, &mut result.warnings)?;
        break_cycles(&mut plan, store, &mut result.warnings)?;
        keep_occupied_containers(&mut plan, store, &mut result.warnings)?;
    }

    let location_order = parent_first(plan.locations.keys().cloned().collect(), |id| {
        plan.locations.get(id).and_then(|l| l.parent_id.clone())
    });
    let item_order = parent_first(plan.items.keys().cloned().collect(), |id| {
        plan.items
            .get(id)
            .and_then(|i| i.parent.as_ref().map(|p| p.id().clone()))
    });

    let mut failed: HashSet<EntityId> = HashSet::new();
    let store = catalog.backend_mut();

    for id in location_order {
        let Some(mut location) = plan.locations.remove(&id) else {
            continue;
        };
        if let Some(parent_id) = location.parent_id.clone().filter(|p| failed.contains(p)) {
            result.warnings.push(IntegrityWarning::DanglingParent {
                id: id.clone(),
                parent_id,
            });
            location.parent_id = None;
        }
        let outcome = store
            .location(&id)
            .map(|existing| existing.is_some())
            .and_then(|existed| store.put_location(&location).map(|()| existed));
        record_outcome(&mut result, &mut failed, EntityKind::Location, &id, outcome);
    }

    for id in item_order {
        let Some(mut item) = plan.items.remove(&id) else {
            continue;
        };
        if let Some(parent_id) = item
            .parent
            .as_ref()
            .map(|p| p.id().clone())
            .filter(|p| failed.contains(p))
        {
            result.warnings.push(IntegrityWarning::DanglingParent {
                id: id.clone(),
                parent_id,
            });
            item.parent = None;
        }
        let outcome = store
            .item(&id)
            .map(|existing| existing.is_some())
            .and_then(|existed| store.put_item(&item).map(|()| existed));
        record_outcome(&mut result, &mut failed, EntityKind::Item, &id, outcome);
    }

    tracing::info!(
        version = result.format_version,
        locations_added = result.locations.added,
        locations_updated = result.locations.updated,
        items_added = result.items.added,
        items_updated = result.items.updated,
        warnings = result.warnings.len(),
        errors = result.errors.len(),
        "imported archive"
    );
    Ok(result)
}

/// Tally one write: `Ok(true)` means the record already existed.
fn record_outcome(
    result: &mut ImportResult,
    failed: &mut HashSet<EntityId>,
    kind: EntityKind,
    id: &EntityId,
    outcome: Result<bool, HoardError>,
) {
    match outcome {
        Ok(true) => result.counts_mut(kind).updated += 1,
        Ok(false) => result.counts_mut(kind).added += 1,
        Err(e) => {
            result.fail(kind, id, e.to_string());
            failed.insert(id.clone());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
