//! In-memory store
//!
//! Same contract as the Postgres store, held in process memory. Used by tests
//! and by local demo runs without a database.

use super::{CatalogKind, Store};
use crate::error::{ApiResult, AppError};
use crate::models::{
    AdminUser, CatalogEntry, Consultation, ConsultationForm, DashboardStats, Inquiry,
    InquiryForm, NewProperty, Property, SmtpSettings, SmtpSettingsForm, Valuation, ValuationForm,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    /// Insertion order; newest last
    properties: Vec<Property>,
    inquiries: Vec<Inquiry>,
    valuations: Vec<Valuation>,
    consultations: Vec<Consultation>,
    property_types: Vec<CatalogEntry>,
    listing_statuses: Vec<CatalogEntry>,
    admins: Vec<AdminUser>,
    smtp_settings: Vec<SmtpSettings>,
}

impl Tables {
    fn catalog(&self, kind: CatalogKind) -> &Vec<CatalogEntry> {
        match kind {
            CatalogKind::PropertyType => &self.property_types,
            CatalogKind::ListingStatus => &self.listing_statuses,
        }
    }

    fn catalog_mut(&mut self, kind: CatalogKind) -> &mut Vec<CatalogEntry> {
        match kind {
            CatalogKind::PropertyType => &mut self.property_types,
            CatalogKind::ListingStatus => &mut self.listing_statuses,
        }
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            #[cfg(test)]
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seed the default lookup values shown by the admin console
    pub async fn with_defaults() -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for name in ["Apartment", "Office", "Penthouse", "Townhouse", "Villa"] {
                tables.property_types.push(CatalogEntry {
                    name: name.to_string(),
                    is_active: true,
                });
            }
            for name in ["Buy", "Rent"] {
                tables.listing_statuses.push(CatalogEntry {
                    name: name.to_string(),
                    is_active: true,
                });
            }
        }
        store
    }

    /// Make every call fail as if the database were down
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check(&self) -> ApiResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("store unavailable".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check(&self) -> ApiResult<()> {
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_search(property: &Property, term: &str) -> bool {
    let term = term.to_lowercase();
    property.location.to_lowercase().contains(&term)
        || property.region.as_str().to_lowercase().contains(&term)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> ApiResult<()> {
        self.check()
    }

    async fn list_properties(&self, search: Option<&str>) -> ApiResult<Vec<Property>> {
        self.check()?;
        let tables = self.tables.read().await;
        let term = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(tables
            .properties
            .iter()
            .rev()
            .filter(|p| term.map_or(true, |t| matches_search(p, t)))
            .cloned()
            .collect())
    }

    async fn featured_properties(&self, limit: usize) -> ApiResult<Vec<Property>> {
        let mut properties = self.list_properties(None).await?;
        properties.truncate(limit);
        Ok(properties)
    }

    async fn get_property(&self, id: Uuid) -> ApiResult<Option<Property>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.properties.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_property(&self, property: &NewProperty) -> ApiResult<Property> {
        self.check()?;
        let record = property.clone().into_property(Uuid::new_v4(), Some(Utc::now()));
        self.tables.write().await.properties.push(record.clone());
        Ok(record)
    }

    async fn update_property(&self, id: Uuid, property: &NewProperty) -> ApiResult<Option<Property>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.properties.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        *slot = property.clone().into_property(id, slot.created_at);
        Ok(Some(slot.clone()))
    }

    async fn delete_property(&self, id: Uuid) -> ApiResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != id);
        Ok(tables.properties.len() != before)
    }

    async fn list_locations(&self) -> ApiResult<Vec<String>> {
        self.check()?;
        let tables = self.tables.read().await;
        let locations: BTreeSet<String> =
            tables.properties.iter().map(|p| p.location.clone()).collect();
        Ok(locations.into_iter().collect())
    }

    async fn insert_inquiry(&self, form: &InquiryForm) -> ApiResult<Inquiry> {
        self.check()?;
        let inquiry = Inquiry {
            id: Uuid::new_v4(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            message: form.message.clone(),
            property_id: form.property_ref().map(str::to_string),
            submitted_at: Utc::now(),
        };
        self.tables.write().await.inquiries.push(inquiry.clone());
        Ok(inquiry)
    }

    async fn list_inquiries(&self) -> ApiResult<Vec<Inquiry>> {
        self.check()?;
        Ok(self.tables.read().await.inquiries.iter().rev().cloned().collect())
    }

    async fn insert_valuation(&self, form: &ValuationForm) -> ApiResult<Valuation> {
        self.check()?;
        let valuation = Valuation {
            id: Uuid::new_v4(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            message: form.message.clone(),
            address: None,
            property_type: None,
            expected_value: None,
            submitted_at: Utc::now(),
        };
        self.tables.write().await.valuations.push(valuation.clone());
        Ok(valuation)
    }

    async fn list_valuations(&self) -> ApiResult<Vec<Valuation>> {
        self.check()?;
        Ok(self.tables.read().await.valuations.iter().rev().cloned().collect())
    }

    async fn insert_consultation(&self, form: &ConsultationForm) -> ApiResult<Consultation> {
        self.check()?;
        let consultation = Consultation {
            id: Uuid::new_v4(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            budget: form.budget.clone(),
            message: form.message.clone().unwrap_or_default(),
            submitted_at: Utc::now(),
        };
        self.tables.write().await.consultations.push(consultation.clone());
        Ok(consultation)
    }

    async fn list_consultations(&self) -> ApiResult<Vec<Consultation>> {
        self.check()?;
        Ok(self.tables.read().await.consultations.iter().rev().cloned().collect())
    }

    async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(DashboardStats {
            total_properties: tables.properties.len() as i64,
            inquiries: tables.inquiries.len() as i64,
            valuations: tables.valuations.len() as i64,
            consultations: tables.consultations.len() as i64,
        })
    }

    async fn list_catalog(&self, kind: CatalogKind) -> ApiResult<Vec<String>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables
            .catalog(kind)
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn add_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<CatalogEntry> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let entries = tables.catalog_mut(kind);
        if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
            existing.is_active = true;
            return Ok(existing.clone());
        }
        let entry = CatalogEntry {
            name: name.to_string(),
            is_active: true,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn deactivate_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables
            .catalog_mut(kind)
            .iter_mut()
            .find(|e| e.name == name && e.is_active)
        {
            Some(entry) => {
                entry.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_admin_by_email(&self, email: &str) -> ApiResult<Option<AdminUser>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> ApiResult<AdminUser> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.admins.iter().any(|a| a.email == email) {
            return Err(AppError::Conflict("Admin email already registered".to_string()));
        }
        let admin = AdminUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn active_smtp_settings(&self) -> ApiResult<Option<SmtpSettings>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.smtp_settings.iter().rev().find(|s| s.is_active).cloned())
    }

    async fn save_smtp_settings(&self, form: &SmtpSettingsForm) -> ApiResult<SmtpSettings> {
        self.check()?;
        let mut tables = self.tables.write().await;
        for row in tables.smtp_settings.iter_mut() {
            row.is_active = false;
        }
        let settings = SmtpSettings {
            id: Uuid::new_v4(),
            host: form.host.clone(),
            port: form.port(),
            secure: form.secure,
            username: form.username.clone(),
            password: form.password.clone(),
            from_email: form.from_email.clone(),
            from_name: form.from_name.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.smtp_settings.push(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::new_property as sample_property;
    use crate::models::Region;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_property_round_trip() {
        let store = MemoryStore::new();
        let new = sample_property("Palm Villa", "Palm Jumeirah", Region::Dubai);
        let created = store.insert_property(&new).await.unwrap();

        let loaded = store.get_property(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.title, "Palm Villa");
        assert!(loaded.created_at.is_some());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_searchable() {
        let store = MemoryStore::new();
        store
            .insert_property(&sample_property("First", "Kensington", Region::London))
            .await
            .unwrap();
        store
            .insert_property(&sample_property("Second", "Dubai Marina", Region::Dubai))
            .await
            .unwrap();

        let all = store.list_properties(None).await.unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);

        let london = store.list_properties(Some("london")).await.unwrap();
        assert_eq!(london.len(), 1);
        assert_eq!(london[0].title, "First");

        let marina = store.list_properties(Some("MARINA")).await.unwrap();
        assert_eq!(marina[0].title, "Second");
    }

    #[tokio::test]
    async fn test_update_keeps_created_at_and_delete_is_hard() {
        let store = MemoryStore::new();
        let created = store
            .insert_property(&sample_property("Loft", "Shoreditch", Region::London))
            .await
            .unwrap();

        let mut changed = sample_property("Loft", "Shoreditch", Region::London);
        changed.price = 810_000.0;
        let updated = store.update_property(created.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.price, 810_000.0);
        assert_eq!(updated.created_at, created.created_at);

        assert!(store.delete_property(created.id).await.unwrap());
        assert!(!store.delete_property(created.id).await.unwrap());
        assert!(store.get_property(created.id).await.unwrap().is_none());
        assert!(store.update_property(created.id, &changed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_soft_delete_and_reactivate() {
        let store = MemoryStore::with_defaults().await;
        assert!(store
            .deactivate_catalog_entry(CatalogKind::PropertyType, "Villa")
            .await
            .unwrap());
        assert!(!store
            .deactivate_catalog_entry(CatalogKind::PropertyType, "Villa")
            .await
            .unwrap());

        let types = store.list_catalog(CatalogKind::PropertyType).await.unwrap();
        assert!(!types.contains(&"Villa".to_string()));

        let entry = store
            .add_catalog_entry(CatalogKind::PropertyType, "Villa")
            .await
            .unwrap();
        assert!(entry.is_active);
        let types = store.list_catalog(CatalogKind::PropertyType).await.unwrap();
        assert_eq!(types.iter().filter(|t| *t == "Villa").count(), 1);
    }

    #[tokio::test]
    async fn test_newest_active_smtp_settings_win() {
        let store = MemoryStore::new();
        assert!(store.active_smtp_settings().await.unwrap().is_none());

        let mut form = SmtpSettingsForm {
            host: "smtp.one.test".into(),
            port: 587,
            secure: false,
            username: "one".into(),
            password: "pw".into(),
            from_email: "one@skyvera.test".into(),
            from_name: "Skyvera".into(),
        };
        store.save_smtp_settings(&form).await.unwrap();
        form.host = "smtp.two.test".into();
        store.save_smtp_settings(&form).await.unwrap();

        let active = store.active_smtp_settings().await.unwrap().unwrap();
        assert_eq!(active.host, "smtp.two.test");
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.ping().await.is_err());
        assert!(store.list_properties(None).await.is_err());
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
