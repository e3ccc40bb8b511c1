//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Photos travel as base64 strings and
//! money as integer minor units (cents).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, Utc};
use hoard_core::{
    Entity, EntityId, EntityKind, HoardError, Item, ItemPatch, Location, LocationPatch, Money,
    NewItem, NewLocation, ParentRef, Photo,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_quantity() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<HoardError> for ApiError {
    fn from(error: HoardError) -> Self {
        let status = match &error {
            HoardError::NotFound { .. } => StatusCode::NOT_FOUND,
            HoardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HoardError::ArchiveFormat(_) => StatusCode::BAD_REQUEST,
            HoardError::IdentifierExhausted { .. }
            | HoardError::Storage(_)
            | HoardError::Serialization(_)
            | HoardError::Io(_) => {
                tracing::error!(error = %error, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// PHOTOS AND PARENTS
// =============================================================================

/// A photo with its bytes base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoJson {
    pub mime_type: String,
    pub data: String,
}

impl From<&Photo> for PhotoJson {
    fn from(photo: &Photo) -> Self {
        Self {
            mime_type: photo.mime_type.clone(),
            data: STANDARD.encode(&photo.data),
        }
    }
}

impl PhotoJson {
    /// Decode into a store photo.
    pub fn decode(&self) -> Result<Photo, ApiError> {
        let data = STANDARD
            .decode(self.data.trim())
            .map_err(|e| ApiError::unprocessable(format!("photo is not valid base64: {}", e)))?;
        Ok(Photo::new(self.mime_type.clone(), data))
    }
}

fn decode_photos(photos: &[PhotoJson]) -> Result<Vec<Photo>, ApiError> {
    photos.iter().map(PhotoJson::decode).collect()
}

/// An Item's parent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentJson {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl From<&ParentRef> for ParentJson {
    fn from(parent: &ParentRef) -> Self {
        Self {
            id: parent.id().clone(),
            kind: parent.kind(),
        }
    }
}

impl From<ParentJson> for ParentRef {
    fn from(parent: ParentJson) -> Self {
        ParentRef::new(parent.id, parent.kind)
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A Location as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationJson {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<EntityId>,
    pub photos: Vec<PhotoJson>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Location> for LocationJson {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
            parent_id: location.parent_id.clone(),
            photos: location.photos.iter().map(PhotoJson::from).collect(),
            created_at: location.created_at,
            updated_at: location.updated_at,
        }
    }
}

/// An Item as returned by the API. Prices are minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemJson {
    pub id: EntityId,
    pub name: Option<String>,
    /// The name, or `Item <id>` when the Item is unnamed.
    pub display_name: String,
    pub description: Option<String>,
    pub parent: Option<ParentJson>,
    pub can_hold_items: bool,
    pub quantity: u32,
    pub include_in_total: bool,
    pub tags: Vec<String>,
    pub purchase_price: Option<i64>,
    pub current_value: Option<i64>,
    pub acquired_on: Option<NaiveDate>,
    pub photos: Vec<PhotoJson>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Item> for ItemJson {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            display_name: item.display_name(),
            description: item.description.clone(),
            parent: item.parent.as_ref().map(ParentJson::from),
            can_hold_items: item.can_hold_items,
            quantity: item.quantity,
            include_in_total: item.include_in_total,
            tags: item.tags.iter().cloned().collect(),
            purchase_price: item.purchase_price.map(Money::minor_units),
            current_value: item.current_value.map(Money::minor_units),
            acquired_on: item.acquired_on,
            photos: item.photos.iter().map(PhotoJson::from).collect(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Either record, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityJson {
    Location(LocationJson),
    Item(ItemJson),
}

impl From<&Entity> for EntityJson {
    fn from(entity: &Entity) -> Self {
        match entity {
            Entity::Location(location) => Self::Location(location.into()),
            Entity::Item(item) => Self::Item(item.into()),
        }
    }
}

impl EntityJson {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Location(l) => &l.id,
            Self::Item(i) => &i.id,
        }
    }
}

// =============================================================================
// CREATE REQUESTS
// =============================================================================

/// Body of `POST /locations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub photos: Vec<PhotoJson>,
}

impl CreateLocationRequest {
    pub fn into_new(self) -> Result<NewLocation, ApiError> {
        Ok(NewLocation {
            photos: decode_photos(&self.photos)?,
            name: self.name,
            description: self.description,
            parent_id: self.parent_id,
        })
    }
}

/// Body of `POST /items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<ParentJson>,
    #[serde(default)]
    pub can_hold_items: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default = "default_true")]
    pub include_in_total: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub purchase_price: Option<i64>,
    #[serde(default)]
    pub current_value: Option<i64>,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub photos: Vec<PhotoJson>,
}

impl CreateItemRequest {
    pub fn into_new(self) -> Result<NewItem, ApiError> {
        Ok(NewItem {
            photos: decode_photos(&self.photos)?,
            name: self.name,
            description: self.description,
            parent: self.parent.map(ParentRef::from),
            can_hold_items: self.can_hold_items,
            quantity: self.quantity,
            include_in_total: self.include_in_total,
            tags: self.tags,
            purchase_price: self.purchase_price.map(Money::from_minor),
            current_value: self.current_value.map(Money::from_minor),
            acquired_on: self.acquired_on,
        })
    }
}

// =============================================================================
// UPDATE REQUESTS
// =============================================================================

/// Body of `PATCH /locations/{id}`. Absent fields are left alone; `null`
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLocationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<EntityId>>,
    #[serde(default)]
    pub photos: Option<Vec<PhotoJson>>,
}

impl UpdateLocationRequest {
    pub fn into_patch(self) -> Result<LocationPatch, ApiError> {
        Ok(LocationPatch {
            photos: self.photos.as_deref().map(decode_photos).transpose()?,
            name: self.name,
            description: self.description,
            parent_id: self.parent_id,
        })
    }
}

/// Body of `PATCH /items/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<ParentJson>>,
    #[serde(default)]
    pub can_hold_items: Option<bool>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub include_in_total: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub purchase_price: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub current_value: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub acquired_on: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub photos: Option<Vec<PhotoJson>>,
}

impl UpdateItemRequest {
    pub fn into_patch(self) -> Result<ItemPatch, ApiError> {
        Ok(ItemPatch {
            photos: self.photos.as_deref().map(decode_photos).transpose()?,
            name: self.name,
            description: self.description,
            parent: self.parent.map(|p| p.map(ParentRef::from)),
            can_hold_items: self.can_hold_items,
            quantity: self.quantity,
            include_in_total: self.include_in_total,
            tags: self.tags,
            purchase_price: self.purchase_price.map(|p| p.map(Money::from_minor)),
            current_value: self.current_value.map(|v| v.map(Money::from_minor)),
            acquired_on: self.acquired_on,
        })
    }
}

// =============================================================================
// QUERIES AND DERIVED VIEWS
// =============================================================================

/// `?kind=` filter for `GET /children/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildrenQuery {
    #[serde(default)]
    pub kind: Option<EntityKind>,
}

/// `?q=` for `GET /search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Body of `POST /tags/rename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameTagRequest {
    pub from: String,
    pub to: String,
}

/// Counts and rollups below one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsResponse {
    pub id: EntityId,
    pub kind: EntityKind,
    pub child_locations: usize,
    pub child_items: usize,
    pub total_items: u64,
    /// Minor units.
    pub purchase_total: i64,
    /// Minor units.
    pub current_total: i64,
    pub priced_items: usize,
}
