//! Admin session gate
//!
//! Every `/api/admin/*` request (login excepted) must carry a valid session,
//! either as the `admin-token` cookie or as a bearer token.

use super::ADMIN_COOKIE;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::debug;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Verify the session and expose its claims to handlers
pub async fn require_admin(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Cookie first; a bearer token still counts when the cookie is stale
    let from_cookie = jar.get(ADMIN_COOKIE).map(|c| state.sessions.verify(c.value()));
    let claims = match (from_cookie, bearer_token(&request)) {
        (Some(Ok(claims)), _) => claims,
        (_, Some(token)) => state.sessions.verify(token)?,
        (Some(Err(e)), None) => return Err(e),
        (None, None) => return Err(AppError::Unauthorized("Not signed in".to_string())),
    };
    debug!("Admin session {} for {}", claims.jti, claims.email);

    // Insert claims into request extensions for handlers to use
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
