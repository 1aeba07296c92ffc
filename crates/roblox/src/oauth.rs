//! Roblox OAuth2: code exchange and userinfo, used once during linking.

use serde::Deserialize;

use tether_core::error::{Result, TetherError};

const TOKEN_URL: &str = "https://apis.roblox.com/oauth/v1/token";
const USERINFO_URL: &str = "https://apis.roblox.com/oauth/v1/userinfo";

/// Token endpoint response. Roblox tokens are consumed transiently for the
/// userinfo call and never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RobloxTokens {
    pub access_token: String,
}

/// OIDC userinfo claims; `sub` is the Roblox user id.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RobloxUserInfo {
    pub sub: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// OAuth client for one registered Roblox application.
#[derive(Clone)]
pub struct RobloxOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl RobloxOAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    /// Exchange an authorization code for a transient access token.
    pub async fn exchange_code(&self, code: &str) -> Result<RobloxTokens> {
        let body = serde_urlencoded::to_string([
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .map_err(|e| TetherError::Serialization(format!("token request encoding: {e}")))?;

        let response = self
            .http
            .post(TOKEN_URL)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "roblox token endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Fetch the userinfo claims for an access token.
    pub async fn userinfo(&self, access_token: &str) -> Result<RobloxUserInfo> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TetherError::Auth("roblox rejected the access token".into()));
        }
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "roblox userinfo returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn userinfo_parses_oidc_claims() {
        let json = r#"{
            "sub": "12345678",
            "preferred_username": "builderman",
            "name": "Builderman",
            "picture": "https://tr.rbxcdn.com/avatar.png"
        }"#;
        let info: RobloxUserInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.sub, "12345678");
        assert_eq!(info.preferred_username.as_deref(), Some("builderman"));
    }

    #[test]
    fn userinfo_tolerates_missing_optional_claims() {
        let info: RobloxUserInfo = serde_json::from_str(r#"{"sub": "1"}"#).unwrap();
        assert_eq!(info.sub, "1");
        assert!(info.name.is_none());
        assert!(info.picture.is_none());
    }
}
