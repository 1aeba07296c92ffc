//! Cloud v2 datastore access for per-player group rank data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tether_core::error::{Result, TetherError};

const CLOUD_BASE: &str = "https://apis.roblox.com/cloud/v2";

/// The stored per-player record: rank number per group name. Rank 0 (or a
/// missing entry) means the player is not a member of that group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerData {
    #[serde(rename = "Ranks", default)]
    pub ranks: HashMap<String, i64>,
}

impl PlayerData {
    pub fn rank_in(&self, group: &str) -> i64 {
        self.ranks.get(group).copied().unwrap_or(0)
    }
}

/// Datastore entries carry their value as a JSON-encoded string.
#[derive(Debug, Deserialize, Serialize)]
struct EntryEnvelope {
    value: String,
}

/// API-key client for one universe's player datastore.
#[derive(Clone)]
pub struct DatastoreClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    universe_id: String,
    datastore: String,
}

impl DatastoreClient {
    pub fn new(api_key: String, universe_id: String, datastore: String) -> Self {
        Self::with_base_url(api_key, universe_id, datastore, CLOUD_BASE.to_string())
    }

    pub fn with_base_url(
        api_key: String,
        universe_id: String,
        datastore: String,
        base_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            universe_id,
            datastore,
            base_url,
        }
    }

    fn entry_url(&self, key: &str) -> String {
        format!(
            "{}/universes/{}/data-stores/{}/entries/{key}",
            self.base_url, self.universe_id, self.datastore
        )
    }

    /// Fetch a player's stored record. Absent entries are `None`, not errors.
    pub async fn get_entry(&self, roblox_id: &str) -> Result<Option<PlayerData>> {
        let response = self
            .http
            .get(self.entry_url(roblox_id))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "datastore returned {} for entry {roblox_id}",
                response.status()
            )));
        }
        let envelope: EntryEnvelope = response.json().await?;
        let data = serde_json::from_str(&envelope.value)
            .map_err(|e| TetherError::Serialization(format!("invalid player data: {e}")))?;
        Ok(Some(data))
    }

    /// Overwrite a player's stored record.
    pub async fn update_entry(&self, roblox_id: &str, data: &PlayerData) -> Result<()> {
        let value = serde_json::to_string(data)
            .map_err(|e| TetherError::Serialization(format!("player data: {e}")))?;
        let response = self
            .http
            .patch(self.entry_url(roblox_id))
            .header("x-api-key", &self.api_key)
            .json(&EntryEnvelope { value })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "datastore returned {} updating entry {roblox_id}",
                response.status()
            )));
        }
        Ok(())
    }
}
