//! Binding routes: list and mutate a server's rank-to-role rules.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::info;

use tether_core::binding::validate_batch;
use tether_core::db::repository::BindingRepository;
use tether_core::error::TetherError;
use tether_core::models::binding::BindingBatch;
use tether_discord::roles::member_is_admin;

use crate::session::{authenticate, with_session_cookie, SessionContext};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/:server_id", get(list_bindings).post(save_bindings))
}

/// GET /api/bindings/:server_id - the server's stored rules.
async fn list_bindings(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let bindings = state.repo.list_bindings(&server_id).await?;
    let response = Json(bindings).into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}

/// The caller must be an administrator of the target server.
async fn require_admin(
    state: &AppState,
    ctx: &SessionContext,
    server_id: &str,
) -> Result<(), ApiError> {
    // Guild lookup doubles as the bot-presence check.
    state.discord.guild(server_id).await.map_err(|err| match err {
        TetherError::NotFound(_) => TetherError::NotFound("server not found".into()),
        other => other,
    })?;

    let member = state
        .discord
        .guild_member(server_id, &ctx.identity.discord_id)
        .await
        .map_err(|err| match err {
            TetherError::NotFound(_) => {
                TetherError::Forbidden("you are not a member of this server".into())
            }
            other => other,
        })?;

    let roles = state.discord.guild_roles(server_id).await?;
    if !member_is_admin(&roles, &member.roles, server_id) {
        return Err(TetherError::Forbidden("administrator permission required".into()).into());
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct SaveResponse {
    success: bool,
    committed: Vec<i64>,
}

/// POST /api/bindings/:server_id - apply a mutation batch atomically.
async fn save_bindings(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
    Json(batch): Json<BindingBatch>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&state, &ctx, &server_id).await?;

    // The role catalog is fetched live for every save: a role deleted since
    // the dashboard loaded must reject the batch, not slip through a cache.
    let server_roles: HashSet<String> = state
        .discord
        .guild_roles(&server_id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    let validated = validate_batch(&batch, &state.catalog, &server_roles)?;
    let committed = state.repo.apply_binding_batch(&server_id, &validated).await?;
    info!(
        server_id,
        inserted = validated.insert.len(),
        updated = validated.update.len(),
        deleted = validated.delete.len(),
        "binding batch applied"
    );

    let response = Json(SaveResponse {
        success: true,
        committed,
    })
    .into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
