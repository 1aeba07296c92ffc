//! The member sync engine: turns stored bindings plus live rank data into
//! idempotent role mutations for one guild member.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use tether_core::db::repository::TetherRepository;
use tether_core::error::{Result, TetherError};
use tether_discord::models::GuildRole;
use tether_discord::roles::manageable_role_ids;
use tether_discord::DiscordApiClient;
use tether_roblox::datastore::{DatastoreClient, PlayerData};

use crate::diff::{diff_roles, RoleDiff};
use crate::resolve::resolve_entitled_roles;

/// Directory of a guild's roles and members, with role mutation. Mutations
/// are idempotent at this boundary: re-adding a held role or removing an
/// absent one is a no-op.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    async fn list_roles(&self, server_id: &str) -> Result<Vec<GuildRole>>;
    async fn member_role_ids(&self, server_id: &str, discord_id: &str) -> Result<Vec<String>>;
    async fn bot_role_ids(&self, server_id: &str) -> Result<Vec<String>>;
    async fn add_role(&self, server_id: &str, discord_id: &str, role_id: &str) -> Result<()>;
    async fn remove_role(&self, server_id: &str, discord_id: &str, role_id: &str) -> Result<()>;
}

#[async_trait]
impl GuildDirectory for DiscordApiClient {
    async fn list_roles(&self, server_id: &str) -> Result<Vec<GuildRole>> {
        self.guild_roles(server_id).await
    }

    async fn member_role_ids(&self, server_id: &str, discord_id: &str) -> Result<Vec<String>> {
        Ok(self.guild_member(server_id, discord_id).await?.roles)
    }

    async fn bot_role_ids(&self, server_id: &str) -> Result<Vec<String>> {
        Ok(self.own_member(server_id).await?.roles)
    }

    async fn add_role(&self, server_id: &str, discord_id: &str, role_id: &str) -> Result<()> {
        self.add_member_role(server_id, discord_id, role_id).await
    }

    async fn remove_role(&self, server_id: &str, discord_id: &str, role_id: &str) -> Result<()> {
        self.remove_member_role(server_id, discord_id, role_id).await
    }
}

/// Source of a player's per-group ranks.
#[async_trait]
pub trait RankProvider: Send + Sync {
    async fn player_ranks(&self, roblox_id: &str) -> Result<Option<PlayerData>>;
}

#[async_trait]
impl RankProvider for DatastoreClient {
    async fn player_ranks(&self, roblox_id: &str) -> Result<Option<PlayerData>> {
        self.get_entry(roblox_id).await
    }
}

/// What one sync run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Role sync engine for one server's members.
pub struct RoleSyncEngine<R, D, P> {
    repo: Arc<R>,
    directory: D,
    ranks: P,
}

impl<R, D, P> RoleSyncEngine<R, D, P>
where
    R: TetherRepository,
    D: GuildDirectory,
    P: RankProvider,
{
    pub fn new(repo: Arc<R>, directory: D, ranks: P) -> Self {
        Self {
            repo,
            directory,
            ranks,
        }
    }

    /// Compute the role mutations for one member and apply them.
    pub async fn sync_member(&self, server_id: &str, discord_id: &str) -> Result<SyncSummary> {
        let identity = self
            .repo
            .get_identity_by_discord_id(discord_id)
            .await?
            .ok_or_else(|| TetherError::NotFound("member is not registered".into()))?;
        let roblox_id = identity.roblox_id.ok_or_else(|| {
            TetherError::NotFound("member has no linked Roblox account".into())
        })?;

        let player = self
            .ranks
            .player_ranks(&roblox_id)
            .await?
            .ok_or_else(|| TetherError::NotFound("no stored player data".into()))?;

        let diff = self.member_diff(server_id, discord_id, &player).await?;

        for role_id in &diff.to_add {
            self.directory.add_role(server_id, discord_id, role_id).await?;
        }
        for role_id in &diff.to_remove {
            self.directory.remove_role(server_id, discord_id, role_id).await?;
        }

        info!(
            server_id,
            discord_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "member roles synced"
        );
        Ok(SyncSummary {
            added: diff.to_add,
            removed: diff.to_remove,
        })
    }

    async fn member_diff(
        &self,
        server_id: &str,
        discord_id: &str,
        player: &PlayerData,
    ) -> Result<RoleDiff> {
        let bindings = self.repo.list_bindings(server_id).await?;

        let all_roles = self.directory.list_roles(server_id).await?;
        let bot_roles: HashSet<String> =
            self.directory.bot_role_ids(server_id).await?.into_iter().collect();
        let manageable = manageable_role_ids(&all_roles, &bot_roles, server_id);

        let current: HashSet<String> = self
            .directory
            .member_role_ids(server_id, discord_id)
            .await?
            .into_iter()
            .collect();

        // Every group referenced by a rule is evaluated, so a member who left
        // a group (rank 0) sheds its bound roles.
        let groups: HashSet<&str> = bindings.iter().map(|b| b.group_name.as_str()).collect();
        let mut entitled = HashSet::new();
        for group in groups {
            let rank = player.rank_in(group);
            debug!(server_id, group, rank, "resolving entitlement");
            entitled.extend(resolve_entitled_roles(rank, group, &bindings));
        }

        Ok(diff_roles(&current, &entitled, &manageable))
    }
}
