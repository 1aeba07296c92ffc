//! Direct rank changes, gated by the rank authorization policy.
//!
//! Exile is the same operation with a requested rank of 0.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use tether_core::db::repository::IdentityRepository;
use tether_core::error::TetherError;
use tether_core::rank::{can_set_rank, RankActor};
use tether_roblox::datastore::PlayerData;
use tether_roblox::ranking::{apply_rank_change, RankChangeOutcome};

use crate::session::{authenticate, with_session_cookie};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/:group_name", post(set_rank))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetRankRequest {
    /// Target by Discord id (resolved through the identity store) or by
    /// Roblox id directly. Exactly one must be given.
    #[serde(default)]
    target_discord_id: Option<String>,
    #[serde(default)]
    target_roblox_id: Option<String>,
    rank: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRankResponse {
    success: bool,
    queued_in_game: bool,
}

async fn target_roblox_id(state: &AppState, request: &SetRankRequest) -> Result<String, ApiError> {
    match (&request.target_discord_id, &request.target_roblox_id) {
        (Some(discord_id), None) => {
            let identity = state
                .repo
                .get_identity_by_discord_id(discord_id)
                .await?
                .ok_or_else(|| TetherError::NotFound("target is not registered".into()))?;
            identity
                .roblox_id
                .ok_or_else(|| {
                    TetherError::NotFound("target has no linked Roblox account".into()).into()
                })
        }
        (None, Some(roblox_id)) => Ok(roblox_id.clone()),
        _ => Err(TetherError::Validation(
            "provide exactly one of targetDiscordId or targetRobloxId".into(),
        )
        .into()),
    }
}

async fn player_data(state: &AppState, roblox_id: &str) -> Result<PlayerData, ApiError> {
    Ok(state
        .datastore()?
        .get_entry(roblox_id)
        .await?
        .ok_or_else(|| TetherError::NotFound(format!("no player data for {roblox_id}")))?)
}

/// POST /api/ranks/:group_name - set a target's rank in a group.
async fn set_rank(
    State(state): State<Arc<AppState>>,
    Path(group_name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SetRankRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    let group = state
        .catalog
        .get(&group_name)
        .ok_or_else(|| TetherError::NotFound(format!("group '{group_name}' not found")))?;
    if request.rank < 0 || request.rank > group.rank_count() {
        return Err(TetherError::Validation(format!(
            "rank {} is outside 0..={} for group '{group_name}'",
            request.rank,
            group.rank_count()
        ))
        .into());
    }

    let setter_roblox_id = ctx
        .identity
        .roblox_id
        .clone()
        .ok_or_else(|| TetherError::Auth("you have no linked Roblox account".into()))?;
    let target_id = target_roblox_id(&state, &request).await?;

    let setter_data = player_data(&state, &setter_roblox_id).await?;
    let target_data = player_data(&state, &target_id).await?;

    let setter = RankActor {
        roblox_id: setter_roblox_id,
        rank: setter_data.rank_in(&group_name),
    };
    let target = RankActor {
        roblox_id: target_id.clone(),
        rank: target_data.rank_in(&group_name),
    };

    if !can_set_rank(&setter, &target, group.classes.officer, request.rank) {
        return Err(TetherError::Forbidden(
            "you are not permitted to set this rank for this member".into(),
        )
        .into());
    }
    if target.rank == request.rank {
        return Err(TetherError::Validation("member already holds this rank".into()).into());
    }

    let outcome = apply_rank_change(
        state.memorystore()?,
        state.datastore()?,
        &target_id,
        target_data,
        &group_name,
        request.rank,
    )
    .await?;
    info!(
        group = %group_name,
        target = %target_id,
        rank = request.rank,
        "rank change applied"
    );

    let response = Json(SetRankResponse {
        success: true,
        queued_in_game: matches!(outcome, RankChangeOutcome::Queued { .. }),
    })
    .into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
