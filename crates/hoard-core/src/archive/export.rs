//! # Archive Export
//!
//! Writes the whole catalog as a zip archive: `manifest.json` first, then
//! one `photos/<file>` entry per photo. Records are emitted in id order so
//! two exports of the same catalog list records identically.

use super::manifest::{ItemRecord, LocationRecord, ManifestV3};
use crate::catalog::Catalog;
use crate::primitives::{FORMAT_VERSION, MANIFEST_FILE, PHOTO_DIR};
use crate::store::EntityStore;
use crate::{EntityId, EntityKind, HoardError, Item, Location, Photo, extension_for_mime};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive filename for one photo: `{kind}-{id}-{index}.{ext}`.
///
/// Returns `None` for a mime type with no archive extension.
#[must_use]
pub fn photo_filename(
    kind: EntityKind,
    id: &EntityId,
    index: usize,
    mime_type: &str,
) -> Option<String> {
    let extension = extension_for_mime(mime_type)?;
    Some(format!("{}-{}-{}.{}", kind, id, index, extension))
}

/// Payloads collected while building the manifest.
struct PhotoSink<'a> {
    files: Vec<(String, &'a [u8])>,
}

impl<'a> PhotoSink<'a> {
    fn names(&mut self, kind: EntityKind, id: &EntityId, photos: &'a [Photo]) -> Vec<String> {
        let mut names = Vec::with_capacity(photos.len());
        for (index, photo) in photos.iter().enumerate() {
            match photo_filename(kind, id, index, &photo.mime_type) {
                Some(name) => {
                    self.files.push((name.clone(), &photo.data));
                    names.push(name);
                }
                None => {
                    tracing::warn!(id = %id, mime = %photo.mime_type, "photo type has no archive extension, skipped");
                }
            }
        }
        names
    }
}

fn location_record(location: &Location, photos: Vec<String>) -> LocationRecord {
    LocationRecord {
        id: location.id.clone(),
        name: location.name.clone(),
        description: location.description.clone(),
        parent_id: location.parent_id.clone(),
        photos,
        created_at: location.created_at,
        updated_at: location.updated_at,
    }
}

fn item_record(item: &Item, photos: Vec<String>) -> ItemRecord {
    ItemRecord {
        id: item.id.clone(),
        name: item.name.clone(),
        description: item.description.clone(),
        parent_id: item.parent.as_ref().map(|p| p.id().clone()),
        parent_type: item.parent.as_ref().map(|p| p.kind()),
        can_hold_items: item.can_hold_items,
        quantity: i64::from(item.quantity),
        include_in_total: item.include_in_total,
        tags: item.tags.iter().cloned().collect(),
        purchase_price: item.purchase_price.map(|m| m.minor_units()),
        current_value: item.current_value.map(|m| m.minor_units()),
        acquired_on: item.acquired_on,
        photos,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

/// Serialize every Location and Item, with photos, into archive bytes.
pub fn export_archive(catalog: &Catalog) -> Result<Vec<u8>, HoardError> {
    let mut locations = catalog.backend().locations()?;
    let mut items = catalog.backend().items()?;
    locations.sort_by(|a, b| a.id.cmp(&b.id));
    items.sort_by(|a, b| a.id.cmp(&b.id));

    let mut sink = PhotoSink { files: Vec::new() };
    let location_records = locations
        .iter()
        .map(|l| {
            let names = sink.names(EntityKind::Location, &l.id, &l.photos);
            location_record(l, names)
        })
        .collect();
    let item_records = items
        .iter()
        .map(|i| {
            let names = sink.names(EntityKind::Item, &i.id, &i.photos);
            item_record(i, names)
        })
        .collect();

    let manifest = ManifestV3 {
        version: FORMAT_VERSION,
        exported_at: catalog.now(),
        locations: location_records,
        items: item_records,
    };
    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| HoardError::Serialization(e.to_string()))?;

    let zip_err = |e: zip::result::ZipError| HoardError::Io(format!("failed to write archive: {}", e));
    let io_err = |e: std::io::Error| HoardError::Io(format!("failed to write archive: {}", e));

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(MANIFEST_FILE, options).map_err(zip_err)?;
        zip.write_all(&manifest_json).map_err(io_err)?;

        for (name, data) in &sink.files {
            zip.start_file(format!("{}/{}", PHOTO_DIR, name), options)
                .map_err(zip_err)?;
            zip.write_all(data).map_err(io_err)?;
        }
        zip.finish().map_err(zip_err)?;
    }

    tracing::info!(
        locations = manifest.locations.len(),
        items = manifest.items.len(),
        photos = sink.files.len(),
        "exported archive"
    );
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdAllocator;
    use crate::{NewItem, NewLocation, ParentRef};
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn filename_uses_kind_id_index_and_extension() {
        let id = EntityId::new("K7M2QX");
        assert_eq!(
            photo_filename(EntityKind::Item, &id, 2, "image/jpeg").as_deref(),
            Some("item-K7M2QX-2.jpg")
        );
        assert_eq!(photo_filename(EntityKind::Location, &id, 0, "text/plain"), None);
    }

    #[test]
    fn archive_holds_manifest_and_photos() {
        let mut catalog = Catalog::in_memory().with_allocator(IdAllocator::seeded(4));
        let hall = catalog
            .create_location(NewLocation {
                name: "Hall".to_string(),
                photos: vec![Photo::new("image/png", vec![9, 9])],
                ..NewLocation::default()
            })
            .expect("location");
        catalog
            .create_item(NewItem {
                parent: Some(ParentRef::Location(hall.id.clone())),
                photos: vec![
                    Photo::new("image/jpeg", vec![1]),
                    Photo::new("image/webp", vec![2]),
                ],
                ..NewItem::default()
            })
            .expect("item");

        let bytes = export_archive(&catalog).expect("export");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip");
        assert_eq!(archive.len(), 4);

        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_FILE)
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read");
        let value: serde_json::Value = serde_json::from_str(&manifest).expect("json");
        assert_eq!(value["version"], FORMAT_VERSION);
        assert_eq!(value["locations"][0]["name"], "Hall");
        assert_eq!(value["items"][0]["parentType"], "location");

        let photo_name = format!("{}/location-{}-0.png", PHOTO_DIR, hall.id);
        let mut data = Vec::new();
        archive
            .by_name(&photo_name)
            .expect("photo")
            .read_to_end(&mut data)
            .expect("read");
        assert_eq!(data, vec![9, 9]);
    }
}
