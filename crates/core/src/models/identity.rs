//! Linked-identity model: one row per Discord account.

use serde::{Deserialize, Serialize};

/// The server-issued opaque session pair.
///
/// Invariant: a stored token always has a stored refresh token; the repository
/// treats a row with only one of the two as logged out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    pub token: String,
    pub refresh_token: String,
    /// Expiry as epoch seconds.
    pub expires_at: i64,
}

/// An upstream OAuth access/refresh pair with its own expiry.
///
/// Kept separate from [`SessionTokens`] so provider refresh and session
/// rotation cannot be conflated in a single update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as epoch seconds.
    pub expires_at: i64,
}

impl ProviderTokens {
    /// Whether the access token has passed its expiry at `now` (epoch seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// A linked account: Discord identity, optional Roblox link, and the two
/// credential tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub discord_id: String,
    pub roblox_id: Option<String>,
    pub session: Option<SessionTokens>,
    pub discord_tokens: Option<ProviderTokens>,
}

impl Identity {
    /// A fresh identity created on first OAuth code exchange.
    pub fn new(discord_id: String, session: SessionTokens, discord_tokens: ProviderTokens) -> Self {
        Self {
            discord_id,
            roblox_id: None,
            session: Some(session),
            discord_tokens: Some(discord_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> Identity {
        Identity {
            discord_id: "190000000000000001".to_string(),
            roblox_id: Some("12345678".to_string()),
            session: Some(SessionTokens {
                token: "aa".repeat(32),
                refresh_token: "bb".repeat(32),
                expires_at: 1_750_000_600,
            }),
            discord_tokens: Some(ProviderTokens {
                access_token: "discord-access".to_string(),
                refresh_token: "discord-refresh".to_string(),
                expires_at: 1_750_604_800,
            }),
        }
    }

    #[test]
    fn identity_round_trip() {
        let identity = sample_identity();
        let json = serde_json::to_string(&identity).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn new_identity_has_no_roblox_link() {
        let identity = Identity::new(
            "190000000000000001".into(),
            sample_identity().session.unwrap(),
            sample_identity().discord_tokens.unwrap(),
        );
        assert!(identity.roblox_id.is_none());
        assert!(identity.session.is_some());
    }

    #[test]
    fn provider_tokens_expiry() {
        let tokens = ProviderTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: 1_000,
        };
        assert!(!tokens.is_expired(999));
        assert!(!tokens.is_expired(1_000));
        assert!(tokens.is_expired(1_001));
    }
}
