//! TOML-based configuration system for Tether.

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Tether configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TetherConfig {
    pub tether: TetherSection,
    pub discord: DiscordConfig,
    pub roblox: RobloxConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Core instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TetherSection {
    pub data_dir: String,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Path to the static group catalog JSON.
    #[serde(default = "default_groups_path")]
    pub groups_path: String,
}

fn default_groups_path() -> String {
    "groups.json".into()
}

/// Database backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: Some("/var/lib/tether/tether.db".into()),
        }
    }
}

/// Discord application credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub bot_token: String,
}

/// Roblox Cloud and OAuth credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RobloxConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub universe_id: Option<String>,
    #[serde(default = "default_player_datastore")]
    pub player_datastore: String,
}

fn default_player_datastore() -> String {
    "PlayerDataManager".into()
}

/// Opaque session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server-side session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: i64,
    /// Cookie Max-Age in seconds. Deliberately outlives the session TTL so
    /// rotation-on-read can occur before the cookie disappears.
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_seconds: i64,
}

fn default_session_ttl() -> i64 {
    600
}

fn default_cookie_max_age() -> i64 {
    365 * 24 * 60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            cookie_max_age_seconds: default_cookie_max_age(),
        }
    }
}

impl TetherConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| TetherError::Config(format!("invalid config: {e}")))
    }

    /// Validate the configuration, failing fast on missing required fields.
    pub fn validate(&self) -> Result<()> {
        if self.tether.database.path.as_deref().unwrap_or("").is_empty() {
            return Err(TetherError::Config("tether.database.path is required".into()));
        }
        if self.discord.client_id.is_empty() || self.discord.client_secret.is_empty() {
            return Err(TetherError::Config(
                "discord.client_id and discord.client_secret are required".into(),
            ));
        }
        if self.discord.redirect_uri.is_empty() {
            return Err(TetherError::Config("discord.redirect_uri is required".into()));
        }
        if self.discord.bot_token.is_empty() {
            return Err(TetherError::Config("discord.bot_token is required".into()));
        }
        if self.session.ttl_seconds <= 0 {
            return Err(TetherError::Config("session.ttl_seconds must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TetherConfig {
        TetherConfig {
            tether: TetherSection {
                data_dir: "/var/lib/tether".into(),
                public_url: None,
                database: DatabaseConfig::default(),
                groups_path: default_groups_path(),
            },
            discord: DiscordConfig {
                client_id: "1234".into(),
                client_secret: "secret".into(),
                redirect_uri: "https://tether.example.com/verify".into(),
                bot_token: "bot-token".into(),
            },
            roblox: RobloxConfig::default(),
            session: SessionConfig::default(),
        }
    }

    #[test]
    fn parse_minimal_config() {
        let toml_str = r#"
            [tether]
            data_dir = "/var/lib/tether"

            [discord]
            client_id = "1234"
            client_secret = "secret"
            redirect_uri = "https://tether.example.com/verify"
            bot_token = "bot-token"

            [roblox]
            api_key = "key"
        "#;
        let config: TetherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tether.data_dir, "/var/lib/tether");
        assert_eq!(config.session.ttl_seconds, 600);
        assert_eq!(config.session.cookie_max_age_seconds, 365 * 24 * 60 * 60);
        assert_eq!(config.roblox.player_datastore, "PlayerDataManager");
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_bot_token() {
        let mut config = sample_config();
        config.discord.bot_token = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn validate_rejects_non_positive_ttl() {
        let mut config = sample_config();
        config.session.ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn session_ttl_is_much_shorter_than_cookie() {
        let config = SessionConfig::default();
        assert!(config.cookie_max_age_seconds > config.ttl_seconds * 1000);
    }
}
