//! Role listing for one server.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::session::{authenticate, with_session_cookie};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/:server_id", get(server_roles))
}

#[derive(Serialize)]
struct RoleBody {
    id: String,
    name: String,
    color: u32,
    position: i64,
}

/// GET /api/roles/:server_id - every role in the server.
async fn server_roles(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    let roles: Vec<RoleBody> = state
        .discord
        .guild_roles(&server_id)
        .await?
        .into_iter()
        .map(|role| RoleBody {
            id: role.id,
            name: role.name,
            color: role.color,
            position: role.position,
        })
        .collect();

    let response = Json(roles).into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
