//! Bot-token REST client for the guild/role directory.

use reqwest::StatusCode;
use tracing::debug;

use tether_core::error::{Result, TetherError};

use crate::models::{Guild, GuildMember, GuildRole};

const API_BASE: &str = "https://discord.com/api/v10";

/// REST client authenticated with the bot token.
#[derive(Clone)]
pub struct DiscordApiClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl DiscordApiClient {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url(bot_token, API_BASE.to_string())
    }

    /// Point the client at a different API root (test servers).
    pub fn with_base_url(bot_token: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TetherError::NotFound(format!("discord: {path}"))),
            status if !status.is_success() => Err(TetherError::Provider(format!(
                "discord API returned {status} for {path}"
            ))),
            _ => Ok(response.json().await?),
        }
    }

    /// `GET /guilds/{id}` with member counts.
    pub async fn guild(&self, guild_id: &str) -> Result<Guild> {
        self.get(&format!("/guilds/{guild_id}?with_counts=true")).await
    }

    /// `GET /guilds/{id}/roles`.
    pub async fn guild_roles(&self, guild_id: &str) -> Result<Vec<GuildRole>> {
        self.get(&format!("/guilds/{guild_id}/roles")).await
    }

    /// `GET /guilds/{id}/members/{user}`.
    pub async fn guild_member(&self, guild_id: &str, user_id: &str) -> Result<GuildMember> {
        self.get(&format!("/guilds/{guild_id}/members/{user_id}")).await
    }

    /// The bot's own member record in a guild.
    pub async fn own_member(&self, guild_id: &str) -> Result<GuildMember> {
        self.get(&format!("/guilds/{guild_id}/members/@me")).await
    }

    /// `PUT /guilds/{id}/members/{user}/roles/{role}`. Granting a role the
    /// member already holds is a no-op upstream.
    pub async fn add_member_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        debug!(guild_id, user_id, role_id, "adding role");
        self.mutate_role(reqwest::Method::PUT, guild_id, user_id, role_id)
            .await
    }

    /// `DELETE /guilds/{id}/members/{user}/roles/{role}`. Removing an absent
    /// role is a no-op upstream.
    pub async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<()> {
        debug!(guild_id, user_id, role_id, "removing role");
        self.mutate_role(reqwest::Method::DELETE, guild_id, user_id, role_id)
            .await
    }

    async fn mutate_role(
        &self,
        method: reqwest::Method,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<()> {
        let path = format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}");
        let response = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TetherError::NotFound(format!("discord: {path}"))),
            StatusCode::FORBIDDEN => Err(TetherError::Forbidden(
                "bot lacks permission to manage this role".into(),
            )),
            status if !status.is_success() => Err(TetherError::Provider(format!(
                "discord API returned {status} for {path}"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_header_uses_bot_scheme() {
        let client = DiscordApiClient::new("abc123".into());
        assert_eq!(client.auth_header(), "Bot abc123");
    }

    #[test]
    fn base_url_is_overridable() {
        let client =
            DiscordApiClient::with_base_url("t".into(), "http://localhost:9999".into());
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
