//! Tether Web — the account-linking and binding-management API.
//!
//! Routing only wires collaborators together; session decisions live in
//! `tether_core::session`, entitlement math in `tether_role_sync`, and all
//! storage behind the repository traits.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::warn;

use tether_core::config::TetherConfig;
use tether_core::db::sqlite::SqliteRepository;
use tether_core::error::TetherError;
use tether_core::group::GroupCatalog;
use tether_discord::{DiscordApiClient, DiscordOAuth};
use tether_roblox::icons::IconCache;
use tether_roblox::{DatastoreClient, MemoryStoreClient, RobloxCloudClient, RobloxOAuth};

pub mod cookie;
pub mod routes;
pub mod session;

/// Shared application state for all API routes.
pub struct AppState {
    pub repo: Arc<SqliteRepository>,
    pub config: TetherConfig,
    pub catalog: GroupCatalog,
    pub discord: DiscordApiClient,
    pub discord_oauth: DiscordOAuth,
    pub roblox_oauth: RobloxOAuth,
    pub roblox_users: RobloxCloudClient,
    /// Player datastore and memory store, present when a universe is configured.
    pub datastore: Option<DatastoreClient>,
    pub memorystore: Option<MemoryStoreClient>,
    pub icons: IconCache,
    pub http: reqwest::Client,
}

impl AppState {
    /// Assemble the state from configuration and an opened repository.
    pub fn new(repo: Arc<SqliteRepository>, config: TetherConfig, catalog: GroupCatalog) -> Self {
        let discord = DiscordApiClient::new(config.discord.bot_token.clone());
        let discord_oauth = DiscordOAuth::new(
            config.discord.client_id.clone(),
            config.discord.client_secret.clone(),
            config.discord.redirect_uri.clone(),
        );
        let roblox_oauth = RobloxOAuth::new(
            config.roblox.client_id.clone(),
            config.roblox.client_secret.clone(),
        );
        let roblox_users = RobloxCloudClient::new(config.roblox.api_key.clone());
        let datastore = config.roblox.universe_id.clone().map(|universe_id| {
            DatastoreClient::new(
                config.roblox.api_key.clone(),
                universe_id,
                config.roblox.player_datastore.clone(),
            )
        });
        let memorystore = config.roblox.universe_id.clone().map(|universe_id| {
            MemoryStoreClient::new(config.roblox.api_key.clone(), universe_id)
        });
        Self {
            repo,
            config,
            catalog,
            discord,
            discord_oauth,
            roblox_oauth,
            roblox_users,
            datastore,
            memorystore,
            icons: IconCache::default(),
            http: reqwest::Client::new(),
        }
    }

    /// The player datastore, or a configuration validation failure when no
    /// universe is set up.
    pub fn datastore(&self) -> Result<&DatastoreClient, TetherError> {
        self.datastore
            .as_ref()
            .ok_or_else(|| TetherError::Validation("roblox.universe_id is not configured".into()))
    }

    pub fn memorystore(&self) -> Result<&MemoryStoreClient, TetherError> {
        self.memorystore
            .as_ref()
            .ok_or_else(|| TetherError::Validation("roblox.universe_id is not configured".into()))
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", routes::auth::router())
        .nest("/api/bindings", routes::bindings::router())
        .nest("/api/groups", routes::groups::router())
        .nest("/api/servers", routes::servers::router())
        .nest("/api/roles", routes::roles::router())
        .nest("/api/ranks", routes::ranks::router())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Error wrapper mapping the core taxonomy onto HTTP statuses.
pub struct ApiError(pub TetherError);

impl From<TetherError> for ApiError {
    fn from(err: TetherError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TetherError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            TetherError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            TetherError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            TetherError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            TetherError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            TetherError::Provider(msg) => {
                warn!("upstream provider failure: {msg}");
                (StatusCode::BAD_GATEWAY, "upstream provider error".to_string())
            }
            TetherError::Http(err) => {
                warn!("outbound HTTP failure: {err}");
                (StatusCode::BAD_GATEWAY, "upstream provider error".to_string())
            }
            other => {
                warn!("internal error: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
