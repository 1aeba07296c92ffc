//! Auth routes: OAuth code exchange, session reads, logout, linking and
//! unlinking the Roblox account.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use tether_core::db::repository::IdentityRepository;
use tether_core::error::TetherError;
use tether_core::models::identity::Identity;
use tether_core::session::generate_session;

use crate::cookie::{clear_cookie_header, extract_session_cookie, session_cookie_header};
use crate::session::{authenticate, fresh_discord_tokens, with_session_cookie};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", post(get_user))
        .route("/logout", post(logout))
        .route("/unlink", post(unlink))
        .route("/roblox", post(link_roblox))
}

#[derive(Debug, Default, Deserialize)]
struct GetUserRequest {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkRobloxRequest {
    code: String,
}

#[derive(Serialize)]
struct ProfileResponse {
    user: Option<UserProfile>,
}

#[derive(Serialize)]
struct UserProfile {
    discord: DiscordProfile,
    roblox: Option<RobloxProfile>,
}

#[derive(Serialize)]
struct DiscordProfile {
    username: String,
    avatar: Option<String>,
    id: String,
}

#[derive(Serialize)]
struct RobloxProfile {
    username: String,
    displayname: String,
    avatar: String,
}

/// The linked Roblox half of the profile, when the account is linked and the
/// Roblox user still exists.
async fn roblox_profile(
    state: &AppState,
    roblox_id: Option<&str>,
) -> Result<Option<RobloxProfile>, ApiError> {
    let Some(roblox_id) = roblox_id else {
        return Ok(None);
    };
    match state.roblox_users.profile(roblox_id).await {
        Ok(profile) => Ok(Some(RobloxProfile {
            username: profile.username,
            displayname: profile.display_name,
            avatar: profile.avatar_url,
        })),
        Err(TetherError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// POST /api/auth/user - authorization-code login, or a session read.
async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<GetUserRequest>>,
) -> Result<Response, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    if let Some(code) = request.code.as_deref() {
        return login_with_code(&state, code).await;
    }

    if extract_session_cookie(&headers).is_none() {
        return Ok(Json(ProfileResponse { user: None }).into_response());
    }

    let ctx = authenticate(&state, &headers).await?;
    let discord_tokens = fresh_discord_tokens(&state, &ctx.identity).await?;
    let user = state
        .discord_oauth
        .current_user(&discord_tokens.access_token)
        .await?;
    let roblox = roblox_profile(&state, ctx.identity.roblox_id.as_deref()).await?;

    let response = Json(ProfileResponse {
        user: Some(UserProfile {
            discord: DiscordProfile {
                username: user.username,
                avatar: user.avatar,
                id: user.id,
            },
            roblox,
        }),
    })
    .into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}

async fn login_with_code(state: &AppState, code: &str) -> Result<Response, ApiError> {
    let now = Utc::now().timestamp();
    let provider = state
        .discord_oauth
        .exchange_code(code)
        .await?
        .into_provider_tokens(now);
    let user = state
        .discord_oauth
        .current_user(&provider.access_token)
        .await?;

    let session = generate_session(state.config.session.ttl_seconds, now);
    let identity = state
        .repo
        .upsert_identity(&Identity::new(user.id.clone(), session.clone(), provider))
        .await?;
    info!(discord_id = %identity.discord_id, "user logged in");

    let roblox = roblox_profile(state, identity.roblox_id.as_deref()).await?;

    let response = Json(ProfileResponse {
        user: Some(UserProfile {
            discord: DiscordProfile {
                username: user.username,
                avatar: user.avatar,
                id: user.id,
            },
            roblox,
        }),
    })
    .into_response();
    Ok(with_session_cookie(
        response,
        &session_cookie_header(&session, state.config.session.cookie_max_age_seconds),
    ))
}

/// POST /api/auth/logout - clear the stored session and the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(cookie) = extract_session_cookie(&headers) {
        state.repo.clear_session(&cookie.token).await?;
    }
    let response = Json(serde_json::json!({ "message": "logged out" })).into_response();
    Ok(with_session_cookie(response, &clear_cookie_header()))
}

/// POST /api/auth/unlink - drop the Roblox link for the session's identity.
async fn unlink(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    state.repo.clear_roblox_id(&ctx.identity.discord_id).await?;
    info!(discord_id = %ctx.identity.discord_id, "roblox account unlinked");

    let response = Json(serde_json::json!({ "success": true })).into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}

/// POST /api/auth/roblox - link a Roblox account via its OAuth code.
async fn link_roblox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LinkRobloxRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    // The Discord account behind the session must still check out before a
    // link is written.
    let discord_tokens = fresh_discord_tokens(&state, &ctx.identity).await?;
    let discord_user = state
        .discord_oauth
        .current_user(&discord_tokens.access_token)
        .await?;
    if discord_user.id != ctx.identity.discord_id {
        return Err(TetherError::Auth("Discord account mismatch".into()).into());
    }

    let tokens = state.roblox_oauth.exchange_code(&request.code).await?;
    let info = state.roblox_oauth.userinfo(&tokens.access_token).await?;
    state
        .repo
        .set_roblox_id(&ctx.identity.discord_id, &info.sub)
        .await?;
    info!(discord_id = %ctx.identity.discord_id, roblox_id = %info.sub, "roblox account linked");

    let response = Json(ProfileResponse {
        user: Some(UserProfile {
            discord: DiscordProfile {
                username: discord_user.username,
                avatar: discord_user.avatar,
                id: discord_user.id,
            },
            roblox: Some(RobloxProfile {
                username: info.preferred_username.unwrap_or_default(),
                displayname: info.name.unwrap_or_default(),
                avatar: info.picture.unwrap_or_default(),
            }),
        }),
    })
    .into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
