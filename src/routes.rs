//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod admin;
mod health;
mod leads;
mod properties;
mod upload;

use crate::auth::require_admin;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::{warn, Level};

pub use upload::MAX_UPLOAD_BYTES;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let admin_gate = middleware::from_fn_with_state(state.clone(), require_admin);

    // Back office; login is added after the gate so it stays open
    let admin_routes = Router::new()
        .route("/logout", post(admin::logout))
        .route("/me", get(admin::me))
        .route("/dashboard", get(admin::dashboard))
        .route(
            "/properties",
            get(admin::list_properties).post(admin::create_property),
        )
        .route(
            "/properties/{id}",
            put(admin::update_property).delete(admin::delete_property),
        )
        .route(
            "/property-types",
            get(admin::list_property_types).post(admin::add_property_type),
        )
        .route("/property-types/{name}", delete(admin::remove_property_type))
        .route(
            "/listing-statuses",
            get(admin::list_listing_statuses).post(admin::add_listing_status),
        )
        .route("/listing-statuses/{name}", delete(admin::remove_listing_status))
        .route("/inquiries", get(admin::list_inquiries))
        .route("/valuations", get(admin::list_valuations))
        .route("/consultations", get(admin::list_consultations))
        .route(
            "/smtp-settings",
            get(admin::get_smtp_settings).put(admin::save_smtp_settings),
        )
        .route("/images", get(admin::list_images))
        .route("/images/{name}", delete(admin::delete_image))
        .route_layer(admin_gate.clone())
        .route("/login", post(admin::login));

    // Writes that live outside /admin but still need a session
    let gated_routes = Router::new()
        .route("/properties", post(properties::create_property))
        .route(
            "/upload-image",
            post(upload::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route_layer(admin_gate);

    let mut api = Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Listings
        .route("/properties", get(properties::list_properties))
        .route("/properties/featured", get(properties::featured_properties))
        .route("/properties/{id}", get(properties::get_property))
        .route("/search", get(properties::search_properties))
        .route("/locations", get(properties::list_locations))
        .route("/property-types", get(properties::list_property_types))
        .route("/listing-statuses", get(properties::list_listing_statuses))

        // Leads
        .route("/inquiries", post(leads::submit_inquiry))
        .route("/valuations", post(leads::submit_valuation))
        .route("/consultations", post(leads::submit_consultation))

        .merge(gated_routes)
        .nest("/admin", admin_routes);

    if settings.enable_self_test {
        warn!("Self-test endpoint enabled: GET /api/test-supabase writes to the properties table");
        api = api.route("/test-supabase", get(health::self_test));
    }

    // Apply middleware and state
    Router::new()
        .nest("/api", api)
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        // Session cookies need credentialed requests, which rule out `Any`
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    }
}
