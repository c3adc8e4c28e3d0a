// Postgres-backed store
//
// Maps rows of the hosted database into application records

use super::queries;
use super::{CatalogKind, Store};
use crate::error::{ApiResult, AppError};
use crate::models::{
    AdminUser, CatalogEntry, Consultation, ConsultationForm, DashboardStats, Inquiry,
    InquiryForm, NewProperty, Property, SmtpSettings, SmtpSettingsForm, Valuation, ValuationForm,
};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use postgres_types::ToSql;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::{debug, error};
use uuid::Uuid;

pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> ApiResult<deadpool_postgres::Object> {
        Ok(self.pool.get().await?)
    }
}

fn property_from_row(row: &Row) -> ApiResult<Property> {
    let region: String = row.get("region");
    Ok(Property {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        price: row.get("price"),
        location: row.get("location"),
        region: region.parse().map_err(|_| {
            AppError::Internal(format!("Unexpected region '{}' in properties table", region))
        })?,
        property_type: row.get("type"),
        status: row.get("status"),
        dubai_status: row.get("dubai_status"),
        image_ids: row.get::<_, Option<Vec<String>>>("image_ids").unwrap_or_default(),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        area: row.get("area"),
        created_at: row.get("created_at"),
    })
}

fn properties_from_rows(rows: &[Row]) -> ApiResult<Vec<Property>> {
    rows.iter().map(property_from_row).collect()
}

fn inquiry_from_row(row: &Row) -> Inquiry {
    Inquiry {
        id: row.get("id"),
        property_id: row.get("property_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        message: row.get("message"),
        submitted_at: row.get("created_at"),
    }
}

fn valuation_from_row(row: &Row) -> Valuation {
    Valuation {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        message: row.get("message"),
        address: row.get("address"),
        property_type: row.get("type"),
        expected_value: row.get("expected_value"),
        submitted_at: row.get("created_at"),
    }
}

fn consultation_from_row(row: &Row) -> Consultation {
    Consultation {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        budget: row.get("budget"),
        message: row.get("message"),
        submitted_at: row.get("created_at"),
    }
}

fn admin_from_row(row: &Row) -> AdminUser {
    AdminUser {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password"),
        created_at: row.get("created_at"),
    }
}

fn smtp_from_row(row: &Row) -> ApiResult<SmtpSettings> {
    let port: i32 = row.get("port");
    Ok(SmtpSettings {
        id: row.get("id"),
        host: row.get("host"),
        port: u16::try_from(port)
            .map_err(|_| AppError::Internal(format!("Invalid SMTP port {} in settings", port)))?,
        secure: row.get("secure"),
        username: row.get("username"),
        password: row.get("password"),
        from_email: row.get("from_email"),
        from_name: row.get("from_name"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    })
}

/// Positional parameters shared by insert ($1..$12) and update
fn property_params<'a>(
    property: &'a NewProperty,
    region: &'a &'static str,
) -> [&'a (dyn ToSql + Sync); 12] {
    [
        &property.title,
        &property.description,
        &property.price,
        &property.location,
        region,
        &property.property_type,
        &property.status,
        &property.dubai_status,
        &property.image_ids,
        &property.bedrooms,
        &property.bathrooms,
        &property.area,
    ]
}

fn is_unique_violation(e: &tokio_postgres::Error) -> bool {
    e.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> ApiResult<()> {
        let client = self.client().await?;
        client.query_one(queries::PING, &[]).await?;
        Ok(())
    }

    async fn list_properties(&self, search: Option<&str>) -> ApiResult<Vec<Property>> {
        let client = self.client().await?;
        let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let pattern = queries::like_pattern(term);
                client.query(queries::search_properties().as_str(), &[&pattern]).await?
            }
            None => client.query(queries::list_properties().as_str(), &[]).await?,
        };
        debug!("Loaded {} properties", rows.len());
        properties_from_rows(&rows)
    }

    async fn featured_properties(&self, limit: usize) -> ApiResult<Vec<Property>> {
        let client = self.client().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client.query(queries::featured_properties().as_str(), &[&limit]).await?;
        properties_from_rows(&rows)
    }

    async fn get_property(&self, id: Uuid) -> ApiResult<Option<Property>> {
        let client = self.client().await?;
        let row = client.query_opt(queries::get_property().as_str(), &[&id]).await?;
        row.as_ref().map(property_from_row).transpose()
    }

    async fn insert_property(&self, property: &NewProperty) -> ApiResult<Property> {
        let client = self.client().await?;
        let region = property.region.as_str();
        let row = client
            .query_one(queries::insert_property().as_str(), &property_params(property, &region))
            .await
            .map_err(|e| {
                error!("Failed to insert property: {}", e);
                AppError::Database(e)
            })?;
        property_from_row(&row)
    }

    async fn update_property(&self, id: Uuid, property: &NewProperty) -> ApiResult<Option<Property>> {
        let client = self.client().await?;
        let region = property.region.as_str();
        let mut params: Vec<&(dyn ToSql + Sync)> = property_params(property, &region).to_vec();
        params.push(&id);
        let row = client.query_opt(queries::update_property().as_str(), &params).await?;
        row.as_ref().map(property_from_row).transpose()
    }

    async fn delete_property(&self, id: Uuid) -> ApiResult<bool> {
        let client = self.client().await?;
        let affected = client.execute(queries::DELETE_PROPERTY, &[&id]).await?;
        Ok(affected > 0)
    }

    async fn list_locations(&self) -> ApiResult<Vec<String>> {
        let client = self.client().await?;
        let rows = client.query(queries::LIST_LOCATIONS, &[]).await?;
        Ok(rows.iter().map(|r| r.get::<_, String>("location")).collect())
    }

    async fn insert_inquiry(&self, form: &InquiryForm) -> ApiResult<Inquiry> {
        let client = self.client().await?;
        let property_id = form.property_ref();
        let row = client
            .query_one(
                queries::INSERT_INQUIRY,
                &[&property_id, &form.name, &form.email, &form.phone, &form.message],
            )
            .await?;
        Ok(inquiry_from_row(&row))
    }

    async fn list_inquiries(&self) -> ApiResult<Vec<Inquiry>> {
        let client = self.client().await?;
        let rows = client.query(queries::LIST_INQUIRIES, &[]).await?;
        Ok(rows.iter().map(inquiry_from_row).collect())
    }

    async fn insert_valuation(&self, form: &ValuationForm) -> ApiResult<Valuation> {
        let client = self.client().await?;
        let row = client
            .query_one(
                queries::INSERT_VALUATION,
                &[&form.name, &form.email, &form.phone, &form.message],
            )
            .await?;
        Ok(valuation_from_row(&row))
    }

    async fn list_valuations(&self) -> ApiResult<Vec<Valuation>> {
        let client = self.client().await?;
        let rows = client.query(queries::LIST_VALUATIONS, &[]).await?;
        Ok(rows.iter().map(valuation_from_row).collect())
    }

    async fn insert_consultation(&self, form: &ConsultationForm) -> ApiResult<Consultation> {
        let client = self.client().await?;
        let message = form.message.clone().unwrap_or_default();
        let row = client
            .query_one(
                queries::INSERT_CONSULTATION,
                &[&form.name, &form.email, &form.phone, &form.budget, &message],
            )
            .await?;
        Ok(consultation_from_row(&row))
    }

    async fn list_consultations(&self) -> ApiResult<Vec<Consultation>> {
        let client = self.client().await?;
        let rows = client.query(queries::LIST_CONSULTATIONS, &[]).await?;
        Ok(rows.iter().map(consultation_from_row).collect())
    }

    async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        let client = self.client().await?;
        let row = client.query_one(queries::DASHBOARD_STATS, &[]).await?;
        Ok(DashboardStats {
            total_properties: row.get("total_properties"),
            inquiries: row.get("inquiries"),
            valuations: row.get("valuations"),
            consultations: row.get("consultations"),
        })
    }

    async fn list_catalog(&self, kind: CatalogKind) -> ApiResult<Vec<String>> {
        let client = self.client().await?;
        let rows = client.query(queries::list_catalog(kind), &[]).await?;
        Ok(rows.iter().map(|r| r.get::<_, String>("name")).collect())
    }

    async fn add_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<CatalogEntry> {
        let client = self.client().await?;
        let row = client
            .query_one(queries::add_catalog_entry(kind), &[&name])
            .await?;
        Ok(CatalogEntry {
            name: row.get("name"),
            is_active: row.get("is_active"),
        })
    }

    async fn deactivate_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<bool> {
        let client = self.client().await?;
        let affected = client
            .execute(queries::deactivate_catalog_entry(kind), &[&name])
            .await?;
        Ok(affected > 0)
    }

    async fn find_admin_by_email(&self, email: &str) -> ApiResult<Option<AdminUser>> {
        let client = self.client().await?;
        let row = client.query_opt(queries::FIND_ADMIN_BY_EMAIL, &[&email]).await?;
        Ok(row.as_ref().map(admin_from_row))
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> ApiResult<AdminUser> {
        let client = self.client().await?;
        let row = client
            .query_one(queries::INSERT_ADMIN, &[&email, &password_hash])
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Admin email already registered".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(admin_from_row(&row))
    }

    async fn active_smtp_settings(&self) -> ApiResult<Option<SmtpSettings>> {
        let client = self.client().await?;
        let row = client.query_opt(queries::active_smtp_settings().as_str(), &[]).await?;
        row.as_ref().map(smtp_from_row).transpose()
    }

    async fn save_smtp_settings(&self, form: &SmtpSettingsForm) -> ApiResult<SmtpSettings> {
        let client = self.client().await?;
        let port = i32::from(form.port());
        let row = client
            .query_one(
                queries::save_smtp_settings().as_str(),
                &[
                    &form.host,
                    &port,
                    &form.secure,
                    &form.username,
                    &form.password,
                    &form.from_email,
                    &form.from_name,
                ],
            )
            .await?;
        smtp_from_row(&row)
    }
}
