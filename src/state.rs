//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::auth::SessionKeys;
use crate::db::Store;
use crate::mail::Mailer;
use crate::revalidate::Revalidator;
use crate::storage::ImageStorage;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Listings, leads, lookup tables, admins and SMTP settings
    pub store: Arc<dyn Store>,

    /// Lead notification delivery
    pub mailer: Arc<dyn Mailer>,

    /// Property image bucket
    pub storage: Arc<dyn ImageStorage>,

    /// Admin session signing keys
    pub sessions: SessionKeys,

    /// Stale page paths published after listing writes
    pub revalidator: Revalidator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn ImageStorage>,
        sessions: SessionKeys,
    ) -> Self {
        Self {
            store,
            mailer,
            storage,
            sessions,
            revalidator: Revalidator::new(),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
