//! Group catalog routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use tether_core::error::TetherError;
use tether_roblox::icons::resolve_group_icon;

use crate::session::{authenticate, with_session_cookie};
use crate::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_groups))
        .route("/find/:name", get(find_group))
}

/// GET /api/groups - the raw catalog.
async fn list_groups(State(state): State<Arc<AppState>>) -> Response {
    Json(state.catalog.clone()).into_response()
}

/// GET /api/groups/find/:name - one group, with its icon resolved to a
/// thumbnail URL through the bounded cache.
async fn find_group(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    let group = state
        .catalog
        .get(&name)
        .ok_or_else(|| TetherError::NotFound(format!("group '{name}' not found")))?;

    let mut group = group.clone();
    if let Some(icon) = group.icon.as_deref() {
        // A thumbnail failure degrades the icon, never the whole response.
        let resolved = resolve_group_icon(&state.icons, &state.http, icon)
            .await
            .unwrap_or_default();
        group.icon = Some(resolved);
    }

    let response = Json(group).into_response();
    Ok(with_session_cookie(response, &ctx.set_cookie))
}
