//! Back-office route handlers
//!
//! Everything here except login sits behind the session gate.

use super::properties::{to_view, to_views};
use crate::auth::{self, removal_cookie, Claims};
use crate::catalog::AdminConsole;
use crate::db::CatalogKind;
use crate::error::{not_found_error, ApiResult, AppError};
use crate::models::{
    AdminResponse, CatalogEntry, CatalogEntryRequest, Consultation, DashboardStats, Inquiry,
    LoginRequest, LoginResponse, MessageResponse, PropertyForm, PropertyView, SmtpSettings,
    SmtpSettingsForm, SuccessResponse, Valuation,
};
use crate::state::SharedState;
use crate::storage::StoredImage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use tracing::info;
use uuid::Uuid;

fn console(state: &SharedState) -> AdminConsole<'_> {
    AdminConsole::new(state.store.as_ref(), &state.revalidator)
}

// ============================================
// Session
// ============================================

/// POST /api/admin/login
///
/// Verify credentials and set the `admin-token` session cookie.
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SuccessResponse<LoginResponse>>)> {
    let admin = auth::authenticate(state.store.as_ref(), &req.email, &req.password).await?;
    let session = state.sessions.issue(&admin)?;
    let cookie = state.sessions.cookie(&session)?;

    Ok((
        jar.add(cookie),
        Json(SuccessResponse::with_data(
            "Authentication successful",
            LoginResponse {
                admin: AdminResponse::from(&admin),
                token: session.token,
                expires_at: session.expires_at,
            },
        )),
    ))
}

/// POST /api/admin/logout
pub async fn logout(
    jar: CookieJar,
    Extension(claims): Extension<Claims>,
) -> (CookieJar, Json<MessageResponse>) {
    info!("Admin signed out: {}", claims.email);
    (jar.remove(removal_cookie()), Json(MessageResponse::new("Signed out")))
}

/// GET /api/admin/me
pub async fn me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<AdminResponse>>> {
    let admin = state
        .store
        .find_admin_by_email(&claims.email)
        .await?
        .filter(|a| a.id == claims.sub)
        .ok_or_else(|| AppError::Unauthorized("Admin no longer exists".to_string()))?;
    Ok(Json(SuccessResponse::with_data(
        "Signed in",
        AdminResponse::from(&admin),
    )))
}

/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<DashboardStats>>> {
    let stats = console(&state).dashboard().await?;
    Ok(Json(SuccessResponse::with_data("Dashboard", stats)))
}

// ============================================
// Properties
// ============================================

/// GET /api/admin/properties
pub async fn list_properties(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<PropertyView>>>> {
    let properties = console(&state).list_properties().await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} properties", properties.len()),
        to_views(&state, properties),
    )))
}

/// POST /api/admin/properties
pub async fn create_property(
    State(state): State<SharedState>,
    Json(form): Json<PropertyForm>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<PropertyView>>)> {
    let created = console(&state).create_property(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Property created successfully!",
            to_view(&state, created),
        )),
    ))
}

/// PUT /api/admin/properties/{id}
pub async fn update_property(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(form): Json<PropertyForm>,
) -> ApiResult<Json<SuccessResponse<PropertyView>>> {
    let id = parse_property_id(&id)?;
    let updated = console(&state).update_property(id, form).await?;
    Ok(Json(SuccessResponse::with_data(
        "Property updated successfully!",
        to_view(&state, updated),
    )))
}

/// DELETE /api/admin/properties/{id}
pub async fn delete_property(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_property_id(&id)?;
    console(&state).delete_property(id).await?;
    Ok(Json(MessageResponse::new("Property deleted successfully.")))
}

fn parse_property_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| not_found_error(format!("Property '{}' not found", id)))
}

// ============================================
// Property types and listing statuses
// ============================================

async fn list_catalog(
    state: &SharedState,
    kind: CatalogKind,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    let names = console(state).list_catalog(kind).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} entries", names.len()),
        names,
    )))
}

async fn add_catalog_entry(
    state: &SharedState,
    kind: CatalogKind,
    request: CatalogEntryRequest,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CatalogEntry>>)> {
    let entry = console(state).add_catalog_entry(kind, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Added {} '{}'", kind.label(), entry.name),
            entry,
        )),
    ))
}

async fn remove_catalog_entry(
    state: &SharedState,
    kind: CatalogKind,
    name: &str,
) -> ApiResult<Json<MessageResponse>> {
    console(state).remove_catalog_entry(kind, name).await?;
    Ok(Json(MessageResponse::new(format!("Removed {} '{}'", kind.label(), name))))
}

/// GET /api/admin/property-types
pub async fn list_property_types(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    list_catalog(&state, CatalogKind::PropertyType).await
}

/// POST /api/admin/property-types
pub async fn add_property_type(
    State(state): State<SharedState>,
    Json(request): Json<CatalogEntryRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CatalogEntry>>)> {
    add_catalog_entry(&state, CatalogKind::PropertyType, request).await
}

/// DELETE /api/admin/property-types/{name}
pub async fn remove_property_type(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    remove_catalog_entry(&state, CatalogKind::PropertyType, &name).await
}

/// GET /api/admin/listing-statuses
pub async fn list_listing_statuses(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<String>>>> {
    list_catalog(&state, CatalogKind::ListingStatus).await
}

/// POST /api/admin/listing-statuses
pub async fn add_listing_status(
    State(state): State<SharedState>,
    Json(request): Json<CatalogEntryRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CatalogEntry>>)> {
    add_catalog_entry(&state, CatalogKind::ListingStatus, request).await
}

/// DELETE /api/admin/listing-statuses/{name}
pub async fn remove_listing_status(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    remove_catalog_entry(&state, CatalogKind::ListingStatus, &name).await
}

// ============================================
// Leads
// ============================================

/// GET /api/admin/inquiries
pub async fn list_inquiries(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<Inquiry>>>> {
    let rows = console(&state).inquiries().await?;
    Ok(Json(SuccessResponse::with_data(format!("{} inquiries", rows.len()), rows)))
}

/// GET /api/admin/valuations
pub async fn list_valuations(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<Valuation>>>> {
    let rows = console(&state).valuations().await?;
    Ok(Json(SuccessResponse::with_data(format!("{} valuations", rows.len()), rows)))
}

/// GET /api/admin/consultations
pub async fn list_consultations(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<Consultation>>>> {
    let rows = console(&state).consultations().await?;
    Ok(Json(SuccessResponse::with_data(format!("{} consultations", rows.len()), rows)))
}

// ============================================
// SMTP settings
// ============================================

/// GET /api/admin/smtp-settings
pub async fn get_smtp_settings(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Option<SmtpSettings>>>> {
    let settings = console(&state).smtp_settings().await?;
    let message = if settings.is_some() {
        "Active SMTP settings"
    } else {
        "SMTP settings not configured"
    };
    Ok(Json(SuccessResponse::with_data(message, settings)))
}

/// PUT /api/admin/smtp-settings
pub async fn save_smtp_settings(
    State(state): State<SharedState>,
    Json(form): Json<SmtpSettingsForm>,
) -> ApiResult<Json<SuccessResponse<SmtpSettings>>> {
    let settings = console(&state).save_smtp_settings(form).await?;
    Ok(Json(SuccessResponse::with_data("SMTP settings saved", settings)))
}

// ============================================
// Images
// ============================================

/// GET /api/admin/images
pub async fn list_images(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<StoredImage>>>> {
    let images = state.storage.list().await?;
    Ok(Json(SuccessResponse::with_data(format!("{} images", images.len()), images)))
}

/// DELETE /api/admin/images/{name}
pub async fn delete_image(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.storage.delete(&name).await? {
        return Err(not_found_error(format!("Image '{}' not found", name)));
    }
    info!("Image deleted: {}", name);
    Ok(Json(MessageResponse::new(format!("Image '{}' deleted", name))))
}
