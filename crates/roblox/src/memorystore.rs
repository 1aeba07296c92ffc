//! Cloud v2 memory-store access: sorted-map presence lookups and per-place
//! action queues for players who are currently in game.

use serde::Serialize;
use serde_json::Value;

use tether_core::error::{Result, TetherError};

const CLOUD_BASE: &str = "https://apis.roblox.com/cloud/v2";

/// The sorted map tracking which place each online player is in.
const PLAYERS_MAP: &str = "Players";

/// API-key client for one universe's memory store.
#[derive(Clone)]
pub struct MemoryStoreClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    universe_id: String,
}

impl MemoryStoreClient {
    pub fn new(api_key: String, universe_id: String) -> Self {
        Self::with_base_url(api_key, universe_id, CLOUD_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, universe_id: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            universe_id,
            base_url,
        }
    }

    /// Read one sorted-map item; absent keys are `None`.
    pub async fn sorted_map_get(&self, map: &str, key: &str) -> Result<Option<Value>> {
        let url = format!(
            "{}/universes/{}/memory-store/sorted-maps/{map}/items/{key}",
            self.base_url, self.universe_id
        );
        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "memory store returned {} for {map}/{key}",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        Ok(body.get("value").cloned())
    }

    /// Push an item onto a queue.
    pub async fn queue_push<T: Serialize>(&self, queue: &str, item: &T) -> Result<()> {
        let url = format!(
            "{}/universes/{}/memory-store/queues/{queue}/items",
            self.base_url, self.universe_id
        );
        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .json(item)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TetherError::Provider(format!(
                "memory store returned {} pushing to {queue}",
                response.status()
            )));
        }
        Ok(())
    }

    /// The place id a player is currently in, when they are online.
    pub async fn player_place(&self, roblox_id: &str) -> Result<Option<i64>> {
        let value = self.sorted_map_get(PLAYERS_MAP, roblox_id).await?;
        Ok(value.and_then(|v| v.as_i64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_place_extracts_integer_value() {
        let value: Value = serde_json::from_str(r#"{"value": 123456}"#).unwrap();
        assert_eq!(value.get("value").and_then(|v| v.as_i64()), Some(123_456));
    }

    #[test]
    fn non_numeric_presence_value_is_ignored() {
        let value: Value = serde_json::from_str(r#"{"value": "lobby"}"#).unwrap();
        assert_eq!(value.get("value").and_then(|v| v.as_i64()), None);
    }
}
