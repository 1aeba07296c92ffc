//! Discord OAuth2: code exchange, lazy token refresh, and user-scoped reads.

use serde::Deserialize;
use tracing::debug;

use tether_core::error::{Result, TetherError};
use tether_core::models::identity::ProviderTokens;

use crate::models::{DiscordUser, UserGuild};

const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const API_BASE: &str = "https://discord.com/api/v10";

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl TokenResponse {
    /// Convert to stored provider tokens with an absolute expiry.
    pub fn into_provider_tokens(self, now: i64) -> ProviderTokens {
        ProviderTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now + self.expires_in,
        }
    }
}

/// OAuth client for one registered Discord application.
#[derive(Clone)]
pub struct DiscordOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DiscordOAuth {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(params)
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
                "discord token endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    /// Redeem a refresh token for a fresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Return a usable token pair, refreshing lazily only once the stored
    /// pair has expired. The boolean reports whether a refresh happened so
    /// the caller knows to persist the new pair.
    pub async fn ensure_fresh(
        &self,
        tokens: &ProviderTokens,
        now: i64,
    ) -> Result<(ProviderTokens, bool)> {
        if !tokens.is_expired(now) {
            return Ok((tokens.clone(), false));
        }
        debug!("discord access token expired, refreshing");
        let refreshed = self.refresh(&tokens.refresh_token).await?;
        Ok((refreshed.into_provider_tokens(now), true))
    }

    /// `GET /users/@me` with a user bearer token.
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser> {
        self.bearer_get("/users/@me", access_token).await
    }

    /// `GET /users/@me/guilds` with a user bearer token.
    pub async fn user_guilds(&self, access_token: &str) -> Result<Vec<UserGuild>> {
        self.bearer_get("/users/@me/guilds", access_token).await
    }

    async fn bearer_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TetherError::Auth("discord rejected the access token".into()));
        }
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "discord API returned {} for {path}",
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
    fn token_response_converts_to_absolute_expiry() {
        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: 604_800,
        };
        let tokens = response.into_provider_tokens(1_750_000_000);
        assert_eq!(tokens.expires_at, 1_750_604_800);
        assert!(!tokens.is_expired(1_750_604_800));
        assert!(tokens.is_expired(1_750_604_801));
    }

    #[test]
    fn token_response_parses_discord_shape() {
        let json = r#"{
            "access_token": "abc", "token_type": "Bearer",
            "expires_in": 604800, "refresh_token": "def", "scope": "identify guilds"
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "abc");
        assert_eq!(response.expires_in, 604_800);
    }
}
