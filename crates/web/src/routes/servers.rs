//! Server listing: the guilds where the user is an administrator and the bot
//! is present, with the roles the bot can actually manage there.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tether_core::error::TetherError;
use tether_discord::roles::{manageable_role_ids, member_is_admin, ADMINISTRATOR};
use tether_role_sync::RoleSyncEngine;

use crate::session::{authenticate, fresh_discord_tokens, with_session_cookie};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_servers))
        .route("/:server_id/sync", post(sync_member))
}

#[derive(Serialize)]
struct RoleBody {
    id: String,
    name: String,
    color: u32,
    position: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerBody {
    id: String,
    name: String,
    icon: Option<String>,
    member_count: Option<i64>,
    roles: Vec<RoleBody>,
}

#[derive(Serialize)]
struct ServersResponse {
    guilds: Vec<ServerBody>,
}

/// GET /api/servers - guilds the user administers and the bot serves.
async fn list_servers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let discord_tokens = fresh_discord_tokens(&state, &ctx.identity).await?;

    let user_guilds = state
        .discord_oauth
        .user_guilds(&discord_tokens.access_token)
        .await?;

    let mut guilds = Vec::new();
    for user_guild in user_guilds {
        if user_guild.permission_bits() & ADMINISTRATOR != ADMINISTRATOR {
            continue;
        }

        // The bot sees the guild iff it has been invited there.
        let guild = match state.discord.guild(&user_guild.id).await {
            Ok(guild) => guild,
            Err(TetherError::NotFound(_)) => {
                debug!(guild_id = %user_guild.id, "bot not present, skipping");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let all_roles = state.discord.guild_roles(&guild.id).await?;
        let bot_roles: HashSet<String> = state
            .discord
            .own_member(&guild.id)
            .await?
            .roles
            .into_iter()
            .collect();
        let manageable = manageable_role_ids(&all_roles, &bot_roles, &guild.id);

        let mut roles: Vec<RoleBody> = all_roles
            .into_iter()
            .filter(|role| manageable.contains(&role.id))
            .map(|role| RoleBody {
                id: role.id,
                name: role.name,
                color: role.color,
                position: role.position,
            })
            .collect();
        roles.sort_by_key(|role| std::cmp::Reverse(role.position));

        guilds.push(ServerBody {
            id: guild.id,
            name: guild.name,
            icon: guild.icon,
            member_count: guild.approximate_member_count,
            roles,
        });
    }

    let response = Json(ServersResponse { guilds }).into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    /// Another member to sync; requires Administrator in the server.
    #[serde(default)]
    user_discord_id: Option<String>,
}

#[derive(Serialize)]
struct SyncResponse {
    added: Vec<String>,
    removed: Vec<String>,
}

/// POST /api/servers/:server_id/sync - reconcile a member's roles with their
/// current group ranks.
async fn sync_member(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<SyncRequest>>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let target_discord_id = match request.user_discord_id {
        Some(target) if target != ctx.identity.discord_id => {
            // Syncing someone else is an admin action.
            let member = state
                .discord
                .guild_member(&server_id, &ctx.identity.discord_id)
                .await
                .map_err(|err| match err {
                    TetherError::NotFound(_) => {
                        TetherError::Forbidden("you are not a member of this server".into())
                    }
                    other => other,
                })?;
            let roles = state.discord.guild_roles(&server_id).await?;
            if !member_is_admin(&roles, &member.roles, &server_id) {
                return Err(TetherError::Forbidden(
                    "administrator permission required to sync another member".into(),
                )
                .into());
            }
            target
        }
        Some(target) => target,
        None => ctx.identity.discord_id.clone(),
    };

    let engine = RoleSyncEngine::new(
        state.repo.clone(),
        state.discord.clone(),
        state.datastore()?.clone(),
    );
    let summary = engine.sync_member(&server_id, &target_discord_id).await?;

    let response = Json(SyncResponse {
        added: summary.added,
        removed: summary.removed,
    })
    .into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
