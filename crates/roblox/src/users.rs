//! Roblox Cloud v2 user lookups and avatar thumbnails.

use serde::Deserialize;

use tether_core::error::{Result, TetherError};

const CLOUD_BASE: &str = "https://apis.roblox.com/cloud/v2";

/// A user record from `GET /cloud/v2/users/{id}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudUser {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailPayload {
    image_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ThumbnailOperation {
    response: ThumbnailPayload,
}

/// A combined profile for display: username, display name, avatar URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobloxProfile {
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// API-key client for the Roblox Cloud v2 user endpoints.
#[derive(Clone)]
pub struct RobloxCloudClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl RobloxCloudClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, CLOUD_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => {
                Err(TetherError::NotFound(format!("roblox: {path}")))
            }
            status if !status.is_success() => Err(TetherError::Provider(format!(
                "roblox API returned {status} for {path}"
            ))),
            _ => Ok(response.json().await?),
        }
    }

    /// `GET /users/{id}`.
    pub async fn user(&self, roblox_id: &str) -> Result<CloudUser> {
        self.get(&format!("/users/{roblox_id}")).await
    }

    /// `GET /users/{id}:generateThumbnail`.
    pub async fn thumbnail_url(&self, roblox_id: &str) -> Result<String> {
        let operation: ThumbnailOperation = self
            .get(&format!(
                "/users/{roblox_id}:generateThumbnail?size=60&format=PNG&shape=ROUND"
            ))
            .await?;
        Ok(operation.response.image_uri)
    }

    /// The display profile for a linked Roblox account.
    pub async fn profile(&self, roblox_id: &str) -> Result<RobloxProfile> {
        let user = self.user(roblox_id).await?;
        let avatar_url = self.thumbnail_url(roblox_id).await?;
        Ok(RobloxProfile {
            username: user.name,
            display_name: user.display_name,
            avatar_url,
        })
    }
}
