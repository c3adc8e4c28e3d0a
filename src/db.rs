//! Data Access Layer
//!
//! Shapes rows of the hosted database into application records and back.
//! Every call goes to the database; nothing is cached here.

pub mod memory;
pub mod queries;
pub mod service;

pub use memory::MemoryStore;
pub use service::PgStore;

use crate::config::DatabaseConfig;
use crate::error::{ApiResult, AppError};
use crate::models::{
    AdminUser, CatalogEntry, Consultation, ConsultationForm, DashboardStats, Inquiry,
    InquiryForm, NewProperty, Property, SmtpSettings, SmtpSettingsForm, Valuation, ValuationForm,
};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;
use uuid::Uuid;

/// Which soft-deletable lookup table an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    PropertyType,
    ListingStatus,
}

impl CatalogKind {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::PropertyType => "property type",
            CatalogKind::ListingStatus => "listing status",
        }
    }
}

/// Storage operations used by the rest of the application
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> ApiResult<()>;

    /// All properties, newest first. `search` matches location or region, case-insensitively.
    async fn list_properties(&self, search: Option<&str>) -> ApiResult<Vec<Property>>;
    async fn featured_properties(&self, limit: usize) -> ApiResult<Vec<Property>>;
    async fn get_property(&self, id: Uuid) -> ApiResult<Option<Property>>;
    async fn insert_property(&self, property: &NewProperty) -> ApiResult<Property>;
    async fn update_property(&self, id: Uuid, property: &NewProperty) -> ApiResult<Option<Property>>;
    /// Hard delete; returns whether a row was removed
    async fn delete_property(&self, id: Uuid) -> ApiResult<bool>;
    async fn list_locations(&self) -> ApiResult<Vec<String>>;

    async fn insert_inquiry(&self, form: &InquiryForm) -> ApiResult<Inquiry>;
    async fn list_inquiries(&self) -> ApiResult<Vec<Inquiry>>;
    async fn insert_valuation(&self, form: &ValuationForm) -> ApiResult<Valuation>;
    async fn list_valuations(&self) -> ApiResult<Vec<Valuation>>;
    async fn insert_consultation(&self, form: &ConsultationForm) -> ApiResult<Consultation>;
    async fn list_consultations(&self) -> ApiResult<Vec<Consultation>>;
    async fn dashboard_stats(&self) -> ApiResult<DashboardStats>;

    /// Active names, ordered by name
    async fn list_catalog(&self, kind: CatalogKind) -> ApiResult<Vec<String>>;
    /// Adds a name, reactivating it if it was soft-deleted
    async fn add_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<CatalogEntry>;
    /// Soft delete; returns whether an active row was flipped
    async fn deactivate_catalog_entry(&self, kind: CatalogKind, name: &str) -> ApiResult<bool>;

    async fn find_admin_by_email(&self, email: &str) -> ApiResult<Option<AdminUser>>;
    async fn insert_admin(&self, email: &str, password_hash: &str) -> ApiResult<AdminUser>;

    /// Most recently created active row
    async fn active_smtp_settings(&self) -> ApiResult<Option<SmtpSettings>>;
    /// Inserts a new active row and deactivates the rest
    async fn save_smtp_settings(&self, form: &SmtpSettingsForm) -> ApiResult<SmtpSettings>;
}

/// Create a connection pool for the hosted database
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.max_pool_size));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Config(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))?
    };

    // Test connection
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    drop(client);

    info!(
        "Database pool established ({}:{} / {}, TLS: {})",
        config.host, config.port, config.database, config.require_tls
    );
    Ok(pool)
}

/// Create tables if they don't exist
pub async fn ensure_schema(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    for statement in queries::SCHEMA {
        client.execute(*statement, &[]).await?;
    }
    info!("Database tables initialized");
    Ok(())
}
