//! # API Endpoint Handlers
//!
//! Reads take the catalog's read lock; anything that writes (including
//! cascades, tag rewrites and imports) holds the write lock to completion.

use super::{
    AppState,
    types::{
        ApiError, ChildrenQuery, CreateItemRequest, CreateLocationRequest, EntityJson,
        HealthResponse, ItemJson, LocationJson, RenameTagRequest, SearchQuery, TotalsResponse,
        UpdateItemRequest, UpdateLocationRequest,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use hoard_core::{
    AncestorPath, ArchivePreview, CascadeReport, CatalogStats, EntityId, EntityKind, EntityStore,
    HoardError, ImportResult, TagCount, TagRewriteReport,
    archive::archive_digest,
    delete_cascade, delete_tag, direct_child_counts, export_archive, import_archive,
    preview_archive, rename_tag, resolve_ancestor_path, tag_index, total_item_count, total_value,
};

/// Response header carrying the BLAKE3 digest of an exported archive.
pub const DIGEST_HEADER: &str = "x-archive-digest";

// =============================================================================
// HEALTH AND STATS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Record counts.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CatalogStats>, ApiError> {
    let catalog = state.catalog.read().await;
    Ok(Json(catalog.stats()?))
}

// =============================================================================
// LOCATIONS
// =============================================================================

pub async fn list_locations_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationJson>>, ApiError> {
    let catalog = state.catalog.read().await;
    let mut locations = catalog.backend().locations()?;
    locations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(locations.iter().map(LocationJson::from).collect()))
}

pub async fn create_location_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<LocationJson>), ApiError> {
    let input = request.into_new()?;
    let mut catalog = state.catalog.write().await;
    let location = catalog.create_location(input)?;
    Ok((StatusCode::CREATED, Json(LocationJson::from(&location))))
}

pub async fn get_location_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LocationJson>, ApiError> {
    let id = EntityId::new(id);
    let catalog = state.catalog.read().await;
    let location = catalog
        .location(&id)?
        .ok_or_else(|| HoardError::not_found(EntityKind::Location, &id))?;
    Ok(Json(LocationJson::from(&location)))
}

pub async fn update_location_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<LocationJson>, ApiError> {
    let patch = request.into_patch()?;
    let mut catalog = state.catalog.write().await;
    let location = catalog.update_location(&EntityId::new(id), patch)?;
    Ok(Json(LocationJson::from(&location)))
}

/// Cascade-delete a Location and everything below it.
pub async fn delete_location_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CascadeReport>, ApiError> {
    cascade(&state, EntityKind::Location, EntityId::new(id)).await
}

// =============================================================================
// ITEMS
// =============================================================================

pub async fn list_items_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemJson>>, ApiError> {
    let catalog = state.catalog.read().await;
    let mut items = catalog.backend().items()?;
    items.sort_by(|a, b| a.display_name().cmp(&b.display_name()));
    Ok(Json(items.iter().map(ItemJson::from).collect()))
}

pub async fn unassigned_items_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemJson>>, ApiError> {
    let catalog = state.catalog.read().await;
    let items = catalog.unassigned_items()?;
    Ok(Json(items.iter().map(ItemJson::from).collect()))
}

pub async fn create_item_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemJson>), ApiError> {
    let input = request.into_new()?;
    let mut catalog = state.catalog.write().await;
    let item = catalog.create_item(input)?;
    Ok((StatusCode::CREATED, Json(ItemJson::from(&item))))
}

pub async fn get_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemJson>, ApiError> {
    let id = EntityId::new(id);
    let catalog = state.catalog.read().await;
    let item = catalog
        .item(&id)?
        .ok_or_else(|| HoardError::not_found(EntityKind::Item, &id))?;
    Ok(Json(ItemJson::from(&item)))
}

pub async fn update_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemJson>, ApiError> {
    let patch = request.into_patch()?;
    let mut catalog = state.catalog.write().await;
    let item = catalog.update_item(&EntityId::new(id), patch)?;
    Ok(Json(ItemJson::from(&item)))
}

/// Cascade-delete an Item and everything it holds.
pub async fn delete_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CascadeReport>, ApiError> {
    cascade(&state, EntityKind::Item, EntityId::new(id)).await
}

async fn cascade(
    state: &AppState,
    kind: EntityKind,
    id: EntityId,
) -> Result<Json<CascadeReport>, ApiError> {
    let mut catalog = state.catalog.write().await;
    let report = delete_cascade(&mut catalog, kind, &id)?;
    if !report.is_complete() {
        tracing::warn!(
            id = %id,
            failed = report.errors.len(),
            "cascade left records behind"
        );
    }
    Ok(Json(report))
}

// =============================================================================
// HIERARCHY VIEWS
// =============================================================================

/// Direct children of a record, optionally one kind only.
pub async fn children_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChildrenQuery>,
) -> Result<Json<Vec<EntityJson>>, ApiError> {
    let catalog = state.catalog.read().await;
    let children = catalog.list_by_parent(&EntityId::new(id), query.kind)?;
    Ok(Json(children.iter().map(EntityJson::from).collect()))
}

/// Root-to-self ancestor path.
pub async fn path_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(EntityKind, String)>,
) -> Result<Json<AncestorPath>, ApiError> {
    let catalog = state.catalog.read().await;
    Ok(Json(resolve_ancestor_path(
        &catalog,
        &EntityId::new(id),
        kind,
    )?))
}

/// Direct child counts plus recursive quantity and value totals.
pub async fn totals_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(EntityKind, String)>,
) -> Result<Json<TotalsResponse>, ApiError> {
    let id = EntityId::new(id);
    let catalog = state.catalog.read().await;
    if catalog.get(kind, &id)?.is_none() {
        return Err(HoardError::not_found(kind, &id).into());
    }

    let children = direct_child_counts(&catalog, &id, kind)?;
    let total_items = total_item_count(&catalog, &id, kind)?;
    let value = total_value(&catalog, &id, kind)?;

    Ok(Json(TotalsResponse {
        id,
        kind,
        child_locations: children.locations,
        child_items: children.items,
        total_items,
        purchase_total: value.purchase.minor_units(),
        current_total: value.current.minor_units(),
        priced_items: value.priced_items,
    }))
}

// =============================================================================
// TAGS
// =============================================================================

/// Every tag in use with its Item count, most used first.
pub async fn tags_handler(State(state): State<AppState>) -> Result<Json<Vec<TagCount>>, ApiError> {
    let catalog = state.catalog.read().await;
    Ok(Json(tag_index(&catalog)?))
}

pub async fn rename_tag_handler(
    State(state): State<AppState>,
    Json(request): Json<RenameTagRequest>,
) -> Result<Json<TagRewriteReport>, ApiError> {
    let mut catalog = state.catalog.write().await;
    Ok(Json(rename_tag(&mut catalog, &request.from, &request.to)?))
}

pub async fn delete_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<TagRewriteReport>, ApiError> {
    let mut catalog = state.catalog.write().await;
    Ok(Json(delete_tag(&mut catalog, &tag)?))
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Find a record from a printed or typed label.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<EntityJson>, ApiError> {
    let catalog = state.catalog.read().await;
    let entity = catalog
        .resolve(&label)?
        .ok_or_else(|| ApiError::not_found(format!("no record matches label '{}'", label)))?;
    Ok(Json(EntityJson::from(&entity)))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<EntityJson>>, ApiError> {
    let catalog = state.catalog.read().await;
    let results = catalog.search(&query.q)?;
    Ok(Json(results.iter().map(EntityJson::from).collect()))
}

// =============================================================================
// ARCHIVES
// =============================================================================

/// Download the whole catalog as a zip archive.
pub async fn export_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let catalog = state.catalog.read().await;
    let bytes = export_archive(&catalog)?;
    let filename = format!("hoard-{}.zip", catalog.now().format("%Y%m%d-%H%M%S"));
    drop(catalog);

    let digest = archive_digest(&bytes);
    tracing::info!(bytes = bytes.len(), digest = %digest, "exported archive");
    Ok((
        StatusCode::OK,
        [
            ("content-type", "application/zip".to_string()),
            (
                "content-disposition",
                format!("attachment; filename=\"{}\"", filename),
            ),
            (DIGEST_HEADER, digest),
        ],
        bytes,
    ))
}

/// Validate an uploaded archive without writing.
pub async fn preview_handler(body: Bytes) -> Json<ArchivePreview> {
    Json(preview_archive(&body))
}

/// Import an uploaded archive.
pub async fn import_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportResult>, ApiError> {
    let mut catalog = state.catalog.write().await;
    let result = import_archive(&mut catalog, &body)?;
    Ok(Json(result))
}
