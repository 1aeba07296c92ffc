use async_trait::async_trait;

use crate::error::Result;
use crate::models::binding::{RankBinding, ValidatedBatch};
use crate::models::identity::{Identity, ProviderTokens, SessionTokens};

/// Storage for linked identities, keyed by Discord id with unique lookups on
/// session token and Roblox id.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Insert a new identity, or refresh the credential columns of an
    /// existing one. An existing Roblox link is preserved.
    async fn upsert_identity(&self, identity: &Identity) -> Result<Identity>;

    async fn get_identity_by_token(&self, token: &str) -> Result<Option<Identity>>;
    async fn get_identity_by_discord_id(&self, discord_id: &str) -> Result<Option<Identity>>;
    async fn get_identity_by_roblox_id(&self, roblox_id: &str) -> Result<Option<Identity>>;

    /// Replace the stored session pair with `next`, but only if the stored
    /// token AND refresh token still match the presented pair. Returns false
    /// when a concurrent request rotated first; the caller must not retry
    /// with the same stale pair.
    async fn rotate_session(
        &self,
        token: &str,
        expected_refresh: &str,
        next: &SessionTokens,
    ) -> Result<bool>;

    async fn update_provider_tokens(&self, discord_id: &str, tokens: &ProviderTokens) -> Result<()>;

    async fn set_roblox_id(&self, discord_id: &str, roblox_id: &str) -> Result<()>;
    async fn clear_roblox_id(&self, discord_id: &str) -> Result<()>;

    /// Null out the session columns for the row holding `token` (logout).
    /// Returns whether a row was affected.
    async fn clear_session(&self, token: &str) -> Result<bool>;
}

/// Storage for binding rules, scoped per server.
#[async_trait]
pub trait BindingRepository: Send + Sync {
    async fn list_bindings(&self, server_id: &str) -> Result<Vec<RankBinding>>;

    /// Apply a validated batch as one all-or-nothing transaction. Deletes and
    /// updates are scoped to rows matching both the id and `server_id`, so a
    /// batch can never touch another server's rules. Returns the ids of
    /// inserted and updated rows.
    async fn apply_binding_batch(&self, server_id: &str, batch: &ValidatedBatch)
        -> Result<Vec<i64>>;
}

/// Combined repository trait for all entity types.
pub trait TetherRepository: IdentityRepository + BindingRepository {}
