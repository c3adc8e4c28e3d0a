//! Public listing route handlers
//!
//! Read-only views of the catalogue plus the search endpoint. Image ids are
//! resolved to URLs on the way out.

use crate::catalog::AdminConsole;
use crate::db::CatalogKind;
use crate::error::{not_found_error, ApiResult};
use crate::models::{Property, PropertyForm, PropertyView, SuccessResponse};
use crate::search::{run_search, SearchFilters};
use crate::state::SharedState;
use crate::storage::resolve_images;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Listings shown on the home page
pub const FEATURED_COUNT: usize = 6;

#[derive(Debug, Deserialize)]
pub struct ListPropertiesQuery {
    pub search: Option<String>,
}

/// Search results with image URLs resolved
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub items: Vec<PropertyView>,
    pub total: usize,
    pub page: i64,
    pub page_size: usize,
    pub total_pages: usize,
}

pub(crate) fn to_view(state: &SharedState, property: Property) -> PropertyView {
    let images = resolve_images(state.storage.as_ref(), &property.image_ids);
    PropertyView { property, images }
}

pub(crate) fn to_views(state: &SharedState, properties: Vec<Property>) -> Vec<PropertyView> {
    properties.into_iter().map(|p| to_view(state, p)).collect()
}

/// GET /api/properties?search=
pub async fn list_properties(
    State(state): State<SharedState>,
    Query(query): Query<ListPropertiesQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<PropertyView>>>> {
    let properties = state.store.list_properties(query.search.as_deref()).await?;
    debug!("Listing {} properties", properties.len());
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} properties", properties.len()),
        to_views(&state, properties),
    )))
}

/// POST /api/properties (admin session required)
pub async fn create_property(
    State(state): State<SharedState>,
    Json(form): Json<PropertyForm>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<PropertyView>>)> {
    let created = AdminConsole::new(state.store.as_ref(), &state.revalidator)
        .create_property(form)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Property created successfully",
            to_view(&state, created),
        )),
    ))
}

/// GET /api/properties/featured
pub async fn featured_properties(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<PropertyView>>>> {
    let properties = state.store.featured_properties(FEATURED_COUNT).await?;
    Ok(Json(SuccessResponse::with_data(
        "Featured properties",
        to_views(&state, properties),
    )))
}

/// GET /api/properties/{id}
pub async fn get_property(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<PropertyView>>> {
    let not_found = || not_found_error(format!("Property '{}' not found", id));
    let uuid = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let property = state.store.get_property(uuid).await?.ok_or_else(not_found)?;
    Ok(Json(SuccessResponse::with_data(
        "Property found",
        to_view(&state, property),
    )))
}

/// GET /api/search
pub async fn search_properties(
    State(state): State<SharedState>,
    axum_extra::extract::Query(filters): axum_extra::extract::Query<SearchFilters>,
) -> Json<SuccessResponse<SearchResults>> {
    let page = run_search(state.store.as_ref(), &filters).await;
    let message = if page.items.is_empty() {
        "No properties match your search".to_string()
    } else {
        format!("{} properties found", page.total)
    };
    Json(SuccessResponse::with_data(
        message,
        SearchResults {
            items: to_views(&state, page.items),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        },
    ))
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    let locations = state.store.list_locations().await?;
    Ok(Json(SuccessResponse::with_data("Locations", locations)))
}

/// GET /api/property-types
pub async fn list_property_types(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    let names = state.store.list_catalog(CatalogKind::PropertyType).await?;
    Ok(Json(SuccessResponse::with_data("Property types", names)))
}

/// GET /api/listing-statuses
pub async fn list_listing_statuses(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    let names = state.store.list_catalog(CatalogKind::ListingStatus).await?;
    Ok(Json(SuccessResponse::with_data("Listing statuses", names)))
}
