//! Admin authentication
//!
//! Password checks against bcrypt hashes and signed, expiring sessions.

mod middleware;
mod password;
mod session;

pub use middleware::require_admin;
pub use password::{hash_password, verify_password};
pub use session::{removal_cookie, Claims, SessionKeys};

use crate::db::Store;
use crate::error::{ApiResult, AppError};
use crate::models::AdminUser;
use tracing::{info, warn};

/// Name of the session cookie
pub const ADMIN_COOKIE: &str = "admin-token";

/// Check credentials. Unknown email and wrong password are indistinguishable.
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> ApiResult<AdminUser> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let Some(admin) = store.find_admin_by_email(email.trim()).await? else {
        warn!("Login attempt for unknown admin {}", email);
        return Err(invalid());
    };

    if !verify_password(password, &admin.password_hash) {
        warn!("Failed login for {}", admin.email);
        return Err(invalid());
    }

    info!("Admin signed in: {}", admin.email);
    Ok(admin)
}

/// Create the configured admin unless it already exists
pub async fn ensure_bootstrap_admin(store: &dyn Store, email: &str, password: &str) -> ApiResult<()> {
    if store.find_admin_by_email(email).await?.is_some() {
        info!("Admin {} already exists", email);
        return Ok(());
    }
    let hash = hash_password(password)?;
    store.insert_admin(email, &hash).await?;
    info!("Bootstrap admin created: {}", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_authenticate_against_bcrypt_hash() {
        let store = MemoryStore::new();
        ensure_bootstrap_admin(&store, "admin@skyvera.test", "s3cret-pass").await.unwrap();

        let admin = authenticate(&store, "admin@skyvera.test", "s3cret-pass").await.unwrap();
        assert_eq!(admin.email, "admin@skyvera.test");

        let wrong = authenticate(&store, "admin@skyvera.test", "guess").await.unwrap_err();
        let unknown = authenticate(&store, "nobody@skyvera.test", "s3cret-pass").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = MemoryStore::new();
        ensure_bootstrap_admin(&store, "admin@skyvera.test", "first").await.unwrap();
        ensure_bootstrap_admin(&store, "admin@skyvera.test", "second").await.unwrap();

        assert_ok!(authenticate(&store, "admin@skyvera.test", "first").await);
        assert_err!(authenticate(&store, "admin@skyvera.test", "second").await);
    }
}
