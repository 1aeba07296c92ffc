//! Applying an authorized rank change to the Roblox side.
//!
//! A player who is currently in game owns their own record server-side, so
//! the change is queued for the live place to apply; otherwise the datastore
//! entry is written directly.

use serde::Serialize;
use tracing::info;

use tether_core::error::Result;

use crate::datastore::{DatastoreClient, PlayerData};
use crate::memorystore::MemoryStoreClient;

/// A queued action for the live game server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRankAction<'a> {
    action: &'static str,
    user_id: &'a str,
    group: &'a str,
    target_rank: i64,
}

/// How a rank change was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankChangeOutcome {
    /// The player is online; the live place will apply the change.
    Queued { place_id: i64 },
    /// The datastore entry was written directly.
    Stored,
}

/// Apply `rank` for `group` to the target player's record. `data` must be the
/// target's current record; authorization has already been checked by the
/// caller via the rank policy.
pub async fn apply_rank_change(
    memory: &MemoryStoreClient,
    datastore: &DatastoreClient,
    roblox_id: &str,
    mut data: PlayerData,
    group: &str,
    rank: i64,
) -> Result<RankChangeOutcome> {
    if let Some(place_id) = memory.player_place(roblox_id).await? {
        let queue = format!("PlayerActions_{place_id}");
        memory
            .queue_push(
                &queue,
                &SetRankAction {
                    action: "SetRank",
                    user_id: roblox_id,
                    group,
                    target_rank: rank,
                },
            )
            .await?;
        info!(roblox_id, group, rank, place_id, "rank change queued for live place");
        return Ok(RankChangeOutcome::Queued { place_id });
    }

    data.ranks.insert(group.to_string(), rank);
    datastore.update_entry(roblox_id, &data).await?;
    info!(roblox_id, group, rank, "rank change written to datastore");
    Ok(RankChangeOutcome::Stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_rank_action_wire_shape() {
        let action = SetRankAction {
            action: "SetRank",
            user_id: "555",
            group: "Eden",
            target_rank: 2,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"action\":\"SetRank\""));
        assert!(json.contains("\"userId\":\"555\""));
        assert!(json.contains("\"targetRank\":2"));
    }
}
