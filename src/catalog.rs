//! Admin CRUD console
//!
//! Back-office operations over listings, the lookup tables that feed the
//! listing form, SMTP settings and submitted leads. Listing writes publish
//! the paths whose cached pages they invalidate.

use crate::db::{CatalogKind, Store};
use crate::error::{field_error, not_found_error, ApiResult};
use crate::models::{
    CatalogEntry, CatalogEntryRequest, Consultation, DashboardStats, Inquiry, Property,
    PropertyForm, SmtpSettings, SmtpSettingsForm, Valuation,
};
use crate::revalidate::Revalidator;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub const ADMIN_PROPERTIES_PATH: &str = "/admin/properties";

fn property_path(id: Uuid) -> String {
    format!("/properties/{}", id)
}

pub struct AdminConsole<'a> {
    store: &'a dyn Store,
    revalidator: &'a Revalidator,
}

impl<'a> AdminConsole<'a> {
    pub fn new(store: &'a dyn Store, revalidator: &'a Revalidator) -> Self {
        Self { store, revalidator }
    }

    pub async fn list_properties(&self) -> ApiResult<Vec<Property>> {
        self.store.list_properties(None).await
    }

    pub async fn create_property(&self, form: PropertyForm) -> ApiResult<Property> {
        let property = form.validated()?;
        let created = self.store.insert_property(&property).await?;
        info!("Property created: {} ({})", created.title, created.id);
        self.revalidator.revalidate(ADMIN_PROPERTIES_PATH);
        Ok(created)
    }

    pub async fn update_property(&self, id: Uuid, form: PropertyForm) -> ApiResult<Property> {
        let property = form.validated()?;
        let updated = self
            .store
            .update_property(id, &property)
            .await?
            .ok_or_else(|| not_found_error(format!("Property {} not found", id)))?;
        info!("Property updated: {} ({})", updated.title, id);
        self.revalidator.revalidate(ADMIN_PROPERTIES_PATH);
        self.revalidator.revalidate(property_path(id));
        Ok(updated)
    }

    /// Hard delete. Inquiries pointing at the listing are left as they are.
    pub async fn delete_property(&self, id: Uuid) -> ApiResult<()> {
        if !self.store.delete_property(id).await? {
            return Err(not_found_error(format!("Property {} not found", id)));
        }
        info!("Property deleted: {}", id);
        self.revalidator.revalidate(ADMIN_PROPERTIES_PATH);
        self.revalidator.revalidate(property_path(id));
        Ok(())
    }

    pub async fn list_catalog(&self, kind: CatalogKind) -> ApiResult<Vec<String>> {
        self.store.list_catalog(kind).await
    }

    pub async fn add_catalog_entry(
        &self,
        kind: CatalogKind,
        request: CatalogEntryRequest,
    ) -> ApiResult<CatalogEntry> {
        let request = CatalogEntryRequest {
            name: request.name.trim().to_string(),
        };
        request.validate()?;
        let entry = self.store.add_catalog_entry(kind, &request.name).await?;
        info!("Added {} '{}'", kind.label(), entry.name);
        Ok(entry)
    }

    /// Soft delete: listings already using the name keep it
    pub async fn remove_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(field_error("name", "Name is required"));
        }
        if !self.store.deactivate_catalog_entry(kind, name).await? {
            return Err(not_found_error(format!("No active {} named '{}'", kind.label(), name)));
        }
        info!("Deactivated {} '{}'", kind.label(), name);
        Ok(())
    }

    pub async fn smtp_settings(&self) -> ApiResult<Option<SmtpSettings>> {
        self.store.active_smtp_settings().await
    }

    pub async fn save_smtp_settings(&self, form: SmtpSettingsForm) -> ApiResult<SmtpSettings> {
        form.validate()?;
        let settings = self.store.save_smtp_settings(&form).await?;
        info!("SMTP settings replaced ({}:{})", settings.host, settings.port);
        Ok(settings)
    }

    pub async fn inquiries(&self) -> ApiResult<Vec<Inquiry>> {
        self.store.list_inquiries().await
    }

    pub async fn valuations(&self) -> ApiResult<Vec<Valuation>> {
        self.store.list_valuations().await
    }

    pub async fn consultations(&self) -> ApiResult<Vec<Consultation>> {
        self.store.list_consultations().await
    }

    pub async fn dashboard(&self) -> ApiResult<DashboardStats> {
        self.store.dashboard_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;
    use crate::models::Region;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn form(region: &str, status: &str, dubai_status: &str) -> PropertyForm {
        serde_json::from_value(json!({
            "title": "Creek Residence",
            "description": "Three bedroom apartment on the creek",
            "price": 2_400_000.0,
            "location": "Dubai Creek Harbour",
            "region": region,
            "type": "Apartment",
            "status": status,
            "dubaiStatus": dubai_status,
            "imageIds": ["creek-1.jpg", "creek-2.jpg"],
            "bedrooms": 3,
            "bathrooms": 3,
            "area": 1650.0
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_round_trips() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let mut paths = revalidator.subscribe();
        let console = AdminConsole::new(&store, &revalidator);

        let created = console.create_property(form("Dubai", "Buy", "Off-plan")).await.unwrap();
        let loaded = store.get_property(created.id).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.region, Region::Dubai);
        assert_eq!(loaded.dubai_status.as_deref(), Some("Off-plan"));
        assert_eq!(loaded.image_ids, vec!["creek-1.jpg", "creek-2.jpg"]);
        assert_eq!(paths.recv().await.unwrap(), ADMIN_PROPERTIES_PATH);
    }

    #[tokio::test]
    async fn test_secondary_status_cleared_unless_dubai_sale() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let rent = console.create_property(form("Dubai", "Rent", "Ready")).await.unwrap();
        assert_eq!(rent.dubai_status, None);

        let london = console.create_property(form("London", "Buy", "Ready")).await.unwrap();
        assert_eq!(london.dubai_status, None);

        let updated = console
            .update_property(london.id, form("Dubai", "Buy", "Ready"))
            .await
            .unwrap();
        assert_eq!(updated.dubai_status.as_deref(), Some("Ready"));
    }

    #[tokio::test]
    async fn test_invalid_form_writes_nothing() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let mut bad = form("Dubai", "Buy", "none");
        bad.price = 0.0;
        bad.image_ids.clear();
        let err = console.create_property(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_properties(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_property() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let missing = Uuid::new_v4();
        let err = console.update_property(missing, form("Dubai", "Buy", "none")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(console.delete_property(missing).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_revalidates_detail_page() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);
        let created = console.create_property(form("London", "Rent", "none")).await.unwrap();

        let mut paths = revalidator.subscribe();
        console.delete_property(created.id).await.unwrap();
        assert_eq!(paths.recv().await.unwrap(), ADMIN_PROPERTIES_PATH);
        assert_eq!(paths.recv().await.unwrap(), format!("/properties/{}", created.id));
        assert!(store.get_property(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_deleted_type_stays_on_listings() {
        let store = MemoryStore::with_defaults().await;
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let created = console.create_property(form("Dubai", "Buy", "none")).await.unwrap();
        console
            .remove_catalog_entry(CatalogKind::PropertyType, "Apartment")
            .await
            .unwrap();

        let types = console.list_catalog(CatalogKind::PropertyType).await.unwrap();
        assert!(!types.contains(&"Apartment".to_string()));
        let listing = store.get_property(created.id).await.unwrap().unwrap();
        assert_eq!(listing.property_type, "Apartment");

        let err = console
            .remove_catalog_entry(CatalogKind::PropertyType, "Apartment")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_catalog_names_are_trimmed() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let entry = console
            .add_catalog_entry(
                CatalogKind::ListingStatus,
                CatalogEntryRequest {
                    name: "  Off-plan ".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.name, "Off-plan");

        let err = console
            .add_catalog_entry(CatalogKind::ListingStatus, CatalogEntryRequest { name: "   ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_smtp_settings_are_validated() {
        let store = MemoryStore::new();
        let revalidator = Revalidator::new();
        let console = AdminConsole::new(&store, &revalidator);

        let form: SmtpSettingsForm = serde_json::from_value(json!({
            "host": "smtp.skyvera.test",
            "port": 70000,
            "username": "mailer",
            "password": "secret",
            "fromEmail": "nope",
            "fromName": "Skyvera"
        }))
        .unwrap();
        let AppError::Validation(fields) = console.save_smtp_settings(form).await.unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.get("port").is_some());
        assert!(fields.get("from_email").is_some() || fields.get("fromEmail").is_some());
        assert!(console.smtp_settings().await.unwrap().is_none());
    }
}
