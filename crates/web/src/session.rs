//! Request authentication: verify the presented cookie, commit a rotation
//! when one is due, and hand routes the cookie header to set on the way out.

use axum::http::{header, HeaderMap};
use axum::response::Response;
use chrono::Utc;
use tracing::debug;

use tether_core::db::repository::IdentityRepository;
use tether_core::error::{Result, TetherError};
use tether_core::models::identity::{Identity, ProviderTokens, SessionTokens};
use tether_core::session::verify_session;

use crate::cookie::{extract_session_cookie, session_cookie_header};
use crate::AppState;

/// An authenticated request's session state.
pub struct SessionContext {
    pub identity: Identity,
    /// The pair the client should hold from now on.
    pub tokens: SessionTokens,
    /// Set-Cookie value to attach to the response.
    pub set_cookie: String,
}

/// Authenticate a request from its cookie header.
///
/// On a rotation the new pair is committed through the repository's
/// compare-and-swap before this returns; losing that race is an
/// authentication failure for this request, and the client retries with the
/// cookie the winning request set.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<SessionContext> {
    let cookie = extract_session_cookie(headers)
        .ok_or_else(|| TetherError::Auth("missing session cookie".into()))?;

    let now = Utc::now().timestamp();
    let ttl = state.config.session.ttl_seconds;
    let check = verify_session(state.repo.as_ref(), &cookie, None, now, ttl).await?;

    if !check.verdict.verified {
        return Err(TetherError::Auth("invalid session".into()));
    }
    let identity = check
        .identity
        .ok_or_else(|| TetherError::Auth("invalid session".into()))?;
    let tokens = check
        .verdict
        .tokens
        .ok_or_else(|| TetherError::Auth("invalid session".into()))?;

    if check.verdict.needs_rotation {
        let swapped = state
            .repo
            .rotate_session(&cookie.token, &cookie.refresh_token, &tokens)
            .await?;
        if !swapped {
            debug!("lost session rotation race");
            return Err(TetherError::Auth("session rotated concurrently".into()));
        }
    }

    let set_cookie = session_cookie_header(&tokens, state.config.session.cookie_max_age_seconds);
    Ok(SessionContext {
        identity,
        tokens,
        set_cookie,
    })
}

/// The identity's Discord tokens, refreshed lazily if expired, with the
/// refreshed pair persisted.
pub async fn fresh_discord_tokens(
    state: &AppState,
    identity: &Identity,
) -> Result<ProviderTokens> {
    let stored = identity
        .discord_tokens
        .as_ref()
        .ok_or_else(|| TetherError::Auth("no stored Discord credentials".into()))?;
    let now = Utc::now().timestamp();
    let (tokens, refreshed) = state.discord_oauth.ensure_fresh(stored, now).await?;
    if refreshed {
        state
            .repo
            .update_provider_tokens(&identity.discord_id, &tokens)
            .await?;
    }
    Ok(tokens)
}

/// Attach a Set-Cookie header to a response.
pub fn with_session_cookie(mut response: Response, set_cookie: &str) -> Response {
    if let Ok(value) = set_cookie.parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}
