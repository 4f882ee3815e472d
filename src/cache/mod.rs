//! In-memory key-value store for processed match data.
//!
//! Values are kept as JSON together with the time they were written, so a
//! reader can deserialize them into whatever shape it needs. The whole store
//! can be dumped to a JSON file for downstream tools.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
}

/// Thread-safe cache shared by clone.
#[derive(Clone, Default)]
pub struct GameCache {
    inner: Arc<RwLock<BTreeMap<String, CacheEntry>>>,
}

pub fn game_key(game_id: i64) -> String {
    format!("game_data_{}", game_id)
}

pub const GAMES_KEY: &str = "games";

impl GameCache {
    pub fn new() -> Self {
        GameCache::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            stored_at: Utc::now(),
        };
        self.inner.write().await.insert(key.to_string(), entry);
        debug!("GameCache: stored {}", key);
        Ok(())
    }

    /// Read `key` back as `T`. A missing key is `Ok(None)`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let inner = self.inner.read().await;
        match inner.get(key) {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value.clone())?)),
            None => Ok(None),
        }
    }

    pub async fn stored_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(key).map(|e| e.stored_at)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Write every entry to `path` as one JSON object keyed like the cache.
    pub async fn dump(&self, path: &Path) -> Result<()> {
        let inner = self.inner.read().await;
        let text = serde_json::to_string_pretty(&*inner)?;
        tokio::fs::write(path, text).await?;
        debug!("GameCache: dumped {} entries to {:?}", inner.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::GameInfo;

    fn info(id: i64) -> GameInfo {
        GameInfo {
            game_id: id,
            game: "Arsenal - Chelsea".into(),
            league: "EPL".into(),
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = GameCache::new();
        cache.set(&game_key(1), &vec![info(1)]).await.unwrap();

        let back: Vec<GameInfo> = cache.get("game_data_1").await.unwrap().unwrap();
        assert_eq!(back, vec![info(1)]);
        assert!(cache.stored_at("game_data_1").await.is_some());
        assert_eq!(cache.get::<Vec<GameInfo>>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_replaces_entry() {
        let cache = GameCache::new();
        cache.set(GAMES_KEY, &vec![info(1)]).await.unwrap();
        cache.set(GAMES_KEY, &vec![info(1), info(2)]).await.unwrap();

        let games: Vec<GameInfo> = cache.get(GAMES_KEY).await.unwrap().unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let cache = GameCache::new();
        let other = cache.clone();
        other.set("k", &1).await.unwrap();
        assert_eq!(cache.keys().await, vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_get_with_wrong_shape_is_error() {
        let cache = GameCache::new();
        cache.set("k", "text").await.unwrap();
        assert!(cache.get::<Vec<GameInfo>>("k").await.is_err());
    }

    #[tokio::test]
    async fn test_dump_writes_json() {
        let cache = GameCache::new();
        cache.set(GAMES_KEY, &vec![info(7)]).await.unwrap();
        let path = std::env::temp_dir()
            .join(format!("game-cache-{}.json", std::process::id()));

        cache.dump(&path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["games"]["value"][0]["game_id"], 7);
        assert!(parsed["games"]["stored_at"].is_string());
    }
}
