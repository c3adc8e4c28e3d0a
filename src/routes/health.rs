//! Health and integration self-test handlers

use crate::models::{NewProperty, Region};
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

/// GET /api/health
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "Database connection successful",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": "Database connection failed" })),
            )
        }
    }
}

fn self_test_property() -> NewProperty {
    NewProperty {
        title: "Test Property".to_string(),
        description: "This is a test property for integration testing".to_string(),
        price: 1_000_000.0,
        location: "Test Location".to_string(),
        region: Region::Dubai,
        property_type: "Apartment".to_string(),
        status: "Buy".to_string(),
        dubai_status: Some("Ready".to_string()),
        image_ids: vec!["test-image-1".to_string(), "test-image-2".to_string()],
        bedrooms: 3,
        bathrooms: 2,
        area: 1500.0,
    }
}

fn step_failed(step: &str, e: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    error!("Self-test {} failed: {}", step, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "error",
            "message": format!("Failed to {} test property", step),
            "error": e.to_string()
        })),
    )
}

/// GET /api/test-supabase
///
/// Insert, read, update and delete a throwaway listing. Only mounted when
/// `ENABLE_SELF_TEST` is set.
pub async fn self_test(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    let store = state.store.as_ref();
    let mut property = self_test_property();

    let inserted = match store.insert_property(&property).await {
        Ok(p) => p,
        Err(e) => return step_failed("insert", e),
    };

    let retrieved = match store.get_property(inserted.id).await {
        Ok(Some(p)) => p,
        Ok(None) => return step_failed("retrieve", "row missing after insert"),
        Err(e) => return step_failed("retrieve", e),
    };

    property.price = 1_200_000.0;
    let updated = match store.update_property(inserted.id, &property).await {
        Ok(Some(p)) => p,
        Ok(None) => return step_failed("update", "row missing before update"),
        Err(e) => return step_failed("update", e),
    };

    if let Err(e) = store.delete_property(inserted.id).await {
        return step_failed("delete", e);
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Database integration test passed",
            "insertedProperty": inserted,
            "retrievedProperty": retrieved,
            "updatedProperty": updated
        })),
    )
}
