//! Wire types for the subset of the Discord REST API Tether consumes.

use serde::{Deserialize, Serialize};

/// A guild role as returned by `GET /guilds/{id}/roles`.
///
/// Discord serializes the permission bitfield as a decimal string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildRole {
    pub id: String,
    pub name: String,
    pub color: u32,
    pub position: i64,
    pub managed: bool,
    pub permissions: String,
}

impl GuildRole {
    /// Parsed permission bits; malformed values grant nothing.
    pub fn permission_bits(&self) -> u64 {
        self.permissions.parse().unwrap_or(0)
    }
}

/// A Discord user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// A guild member: the user plus their role ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<DiscordUser>,
    pub roles: Vec<String>,
}

/// A guild as seen through the bot token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub approximate_member_count: Option<i64>,
}

/// A guild entry from `GET /users/@me/guilds` (user bearer token); carries
/// the requesting user's permission bits in that guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserGuild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

impl UserGuild {
    pub fn permission_bits(&self) -> u64 {
        self.permissions
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }
}
