//! Signed admin sessions
//!
//! A session is an HS256 token carried in the `admin-token` cookie. The
//! token names the admin, carries its own expiry and a unique id, and is
//! checked on every admin request.

use super::ADMIN_COOKIE;
use crate::error::AppError;
use crate::models::AdminUser;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Admin id
    pub sub: Uuid,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: Uuid,
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// Signing material for admin sessions
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a session for an authenticated admin
    pub fn issue(&self, admin: &AdminUser) -> Result<Session, AppError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: admin.id,
            email: admin.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {}", e)))?;

        Ok(Session {
            token,
            claims,
            expires_at,
        })
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Session expired".to_string()),
            _ => AppError::Unauthorized("Invalid session".to_string()),
        })?;
        Ok(data.claims)
    }

    /// `Set-Cookie` value for a session
    pub fn cookie(&self, session: &Session) -> Result<Cookie<'static>, AppError> {
        Cookie::parse(format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            ADMIN_COOKIE,
            session.token,
            self.ttl.num_seconds()
        ))
        .map_err(|e| AppError::Internal(format!("Failed to build session cookie: {}", e)))
    }
}

/// Cookie shape used to clear the session on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn admin() -> AdminUser {
        AdminUser {
            id: Uuid::new_v4(),
            email: "admin@skyvera.test".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_session_verifies() {
        let keys = SessionKeys::new("a-session-secret-that-is-long-enough!!", 24);
        let admin = admin();
        let session = keys.issue(&admin).unwrap();

        let claims = keys.verify(&session.token).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.email, admin.email);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_each_session_has_unique_id() {
        let keys = SessionKeys::new("a-session-secret-that-is-long-enough!!", 24);
        let admin = admin();
        let a = keys.issue(&admin).unwrap();
        let b = keys.issue(&admin).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_forged_token_rejected() {
        let keys = SessionKeys::new("a-session-secret-that-is-long-enough!!", 24);
        let other = SessionKeys::new("someone-elses-secret-that-is-long-enough", 24);
        let forged = other.issue(&admin()).unwrap();

        assert!(matches!(keys.verify(&forged.token), Err(AppError::Unauthorized(_))));
        assert!(matches!(keys.verify("not-a-token"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = SessionKeys::new("a-session-secret-that-is-long-enough!!", -2);
        let session = expired.issue(&admin()).unwrap();

        let err = expired.verify(&session.token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Session expired"));
    }

    #[test]
    fn test_cookie_attributes() {
        let keys = SessionKeys::new("a-session-secret-that-is-long-enough!!", 24);
        let session = keys.issue(&admin()).unwrap();
        let cookie = keys.cookie(&session).unwrap();

        assert_eq!(cookie.name(), ADMIN_COOKIE);
        assert_eq!(cookie.value(), session.token);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.max_age().is_some());
    }
}
