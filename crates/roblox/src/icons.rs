//! Group icon thumbnail resolution with a bounded, TTL-based URL cache.
//!
//! The cache is an injected value, not a process-wide static, so tests and
//! callers control its lifetime and staleness is bounded by the TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tether_core::error::{Result, TetherError};

const THUMBNAILS_URL: &str = "https://thumbnails.roblox.com/v1/assets";

/// First run of ASCII digits in an asset reference like `rbxassetid://123456`.
pub fn extract_asset_id(icon: &str) -> Option<&str> {
    let start = icon.find(|c: char| c.is_ascii_digit())?;
    let rest = &icon[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// A bounded cache of resolved icon URLs with per-entry expiry.
pub struct IconCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    capacity: usize,
    ttl: Duration,
}

impl IconCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(url, _)| url.clone())
    }

    pub fn insert(&self, key: String, url: String) {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, (_, expires)| *expires > now);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            // Still full after dropping expired entries: evict the entry
            // closest to expiry.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, (_, expires))| *expires)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (url, now + self.ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(256, Duration::from_secs(6 * 60 * 60))
    }
}

/// Resolve a group icon asset reference to a thumbnail URL, consulting the
/// cache first. Unresolvable references return an empty string rather than
/// failing the surrounding request.
pub async fn resolve_group_icon(
    cache: &IconCache,
    http: &reqwest::Client,
    icon: &str,
) -> Result<String> {
    if let Some(url) = cache.get(icon) {
        return Ok(url);
    }

    let Some(asset_id) = extract_asset_id(icon) else {
        return Ok(String::new());
    };

    let response = http
        .get(format!(
            "{THUMBNAILS_URL}/?assetIds={asset_id}&format=webp&size=150x150"
        ))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(TetherError::Provider(format!(
            "thumbnails API returned {}",
            response.status()
        )));
    }

    #[derive(serde::Deserialize)]
    struct Batch {
        data: Vec<Entry>,
    }
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Entry {
        image_url: String,
    }

    let batch: Batch = response.json().await?;
    let url = batch
        .data
        .into_iter()
        .next()
        .map(|e| e.image_url)
        .unwrap_or_default();
    cache.insert(icon.to_string(), url.clone());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_digit_run() {
        assert_eq!(extract_asset_id("rbxassetid://13470872242"), Some("13470872242"));
        assert_eq!(extract_asset_id("13470872242"), Some("13470872242"));
        assert_eq!(extract_asset_id("icon-42-large"), Some("42"));
        assert_eq!(extract_asset_id("no digits here"), None);
    }

    #[test]
    fn cache_returns_inserted_entries() {
        let cache = IconCache::new(4, Duration::from_secs(60));
        cache.insert("a".into(), "url-a".into());
        assert_eq!(cache.get("a").as_deref(), Some("url-a"));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn cache_expires_entries() {
        let cache = IconCache::new(4, Duration::from_secs(0));
        cache.insert("a".into(), "url-a".into());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn cache_is_bounded() {
        let cache = IconCache::new(2, Duration::from_secs(60));
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("c".into(), "3".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let cache = IconCache::new(2, Duration::from_secs(60));
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("a".into(), "1b".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("1b"));
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }
}
