//! Skyvera API - Real estate listings and back-office server
//!
//! Serves the public catalogue (listings, search, featured picks), captures
//! leads from the inquiry, valuation and consultation forms, and exposes an
//! admin back office behind a cookie session.
//!
//! Without a `DATABASE_URL` the server refuses to start unless
//! `ALLOW_MEMORY_STORE=true`, in which case it runs on an in-memory store
//! that loses everything on restart.

mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod leads;
mod mail;
mod models;
mod revalidate;
mod routes;
mod search;
mod state;
mod storage;

use crate::auth::SessionKeys;
use crate::config::Settings;
use crate::db::{MemoryStore, PgStore, Store};
use crate::mail::SmtpMailer;
use crate::routes::create_router;
use crate::state::AppState;
use crate::storage::{HostedStorage, ImageStorage, MemoryStorage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Skyvera API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let store = init_store(&settings).await?;

    if let (Some(email), Some(password)) = (
        settings.auth.bootstrap_email.as_deref(),
        settings.auth.bootstrap_password.as_deref(),
    ) {
        auth::ensure_bootstrap_admin(store.as_ref(), email, password).await?;
    }

    let storage: Arc<dyn ImageStorage> = match HostedStorage::from_config(&settings.storage) {
        Some(hosted) => {
            info!("🖼️  Image storage: hosted bucket '{}'", settings.storage.bucket);
            Arc::new(hosted)
        }
        None => {
            warn!("⚠️  STORAGE_URL or STORAGE_SERVICE_KEY not set, images are kept in memory");
            Arc::new(MemoryStorage::new(settings.storage.bucket.clone()))
        }
    };

    let mailer = Arc::new(SmtpMailer::new(store.clone()));
    let sessions = SessionKeys::new(&settings.auth.session_secret, settings.auth.session_ttl_hours);
    let state = Arc::new(AppState::new(store, mailer, storage, sessions));

    // Page cache invalidation is advisory; log whatever gets published
    tokio::spawn(revalidate::log_invalidations(state.revalidator.subscribe()));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Listings ───");
    info!("   GET  /api/properties             - List properties (?search=)");
    info!("   GET  /api/properties/featured    - Featured properties");
    info!("   GET  /api/properties/{{id}}        - Property details");
    info!("   GET  /api/search                 - Filtered, sorted, paginated search");
    info!("   GET  /api/locations              - Distinct locations");
    info!("");
    info!("   ─── Leads ───");
    info!("   POST /api/inquiries              - Property or general inquiry");
    info!("   POST /api/valuations             - Valuation request");
    info!("   POST /api/consultations          - Consultation request");
    info!("");
    info!("   ─── Back office ───");
    info!("   POST /api/admin/login            - Sign in");
    info!("   GET  /api/admin/dashboard        - Counts");
    info!("   *    /api/admin/properties       - Manage listings");
    info!("   *    /api/admin/property-types   - Manage property types");
    info!("   *    /api/admin/listing-statuses - Manage listing statuses");
    info!("   *    /api/admin/smtp-settings    - Notification mail settings");
    info!("   POST /api/upload-image           - Upload a listing image");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skyvera_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Connect to the hosted database, or fall back to memory when allowed
async fn init_store(settings: &Settings) -> anyhow::Result<Arc<dyn Store>> {
    match &settings.database {
        Some(database) => {
            let pool = db::create_pool(database).await?;
            db::ensure_schema(&pool).await?;
            info!("✅ Database ready");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None if settings.allow_memory_store => {
            warn!("⚠️  DATABASE_URL not set, using the in-memory store (data is lost on restart)");
            Ok(Arc::new(MemoryStore::with_defaults().await))
        }
        None => Err(anyhow::anyhow!(
            "DATABASE_URL must be set (or ALLOW_MEMORY_STORE=true for local development)"
        )),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
