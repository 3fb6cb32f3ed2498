use crate::{
    error::BotResult,
    storage::JsonStore,
    valorant::rank::RankSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use tracing::warn;

const CACHE_DIR: &str = "cache";
const CACHE_SUFFIX: &str = "_rank_cache.json";

/// Last known rank of a player. `data` only ever holds a successful lookup,
/// failed attempts only touch the bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: RankSnapshot,
    #[serde(rename = "timestamp")]
    pub fetched_at: DateTime<Utc>,
    #[serde(rename = "last_update_attempt")]
    pub last_attempt_at: DateTime<Utc>,
    #[serde(default)]
    pub failed_attempts: u32,
}

// player key (name#tag) => entry
type CacheDocument = BTreeMap<String, CacheEntry>;

/// Per-guild rank cache. Entries are never removed, they just go stale.
#[derive(Clone)]
pub struct RankCache {
    store: JsonStore,
    freshness: Duration,
}

impl RankCache {
    pub fn new(store: JsonStore, freshness: Duration) -> RankCache {
        RankCache { store, freshness }
    }

    async fn document(&self, guild: &str) -> CacheDocument {
        match self.store.guild_path(Some(CACHE_DIR), guild, CACHE_SUFFIX) {
            Ok(path) => self.store.load(&path).await,
            Err(e) => {
                warn!("Rank cache unavailable for guild {guild}. {e}");
                CacheDocument::new()
            }
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // Timestamps from the future count as brand new.
        let age = (now - entry.fetched_at).to_std().unwrap_or_default();
        age < self.freshness
    }

    /// Fresh snapshot only.
    pub async fn get(&self, guild: &str, player_key: &str) -> Option<RankSnapshot> {
        self.get_at(guild, player_key, Utc::now()).await
    }

    pub async fn get_at(
        &self,
        guild: &str,
        player_key: &str,
        now: DateTime<Utc>,
    ) -> Option<RankSnapshot> {
        self.document(guild)
            .await
            .remove(player_key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.data)
    }

    /// Snapshot regardless of its age, for fallback paths.
    pub async fn get_any(&self, guild: &str, player_key: &str) -> Option<RankSnapshot> {
        self.entry(guild, player_key).await.map(|entry| entry.data)
    }

    pub async fn entry(&self, guild: &str, player_key: &str) -> Option<CacheEntry> {
        self.document(guild).await.remove(player_key)
    }

    /// Every stored snapshot, stale ones included.
    pub async fn all_cached(&self, guild: &str) -> BTreeMap<String, RankSnapshot> {
        self.document(guild)
            .await
            .into_iter()
            .map(|(key, entry)| (key, entry.data))
            .collect()
    }

    pub async fn put(&self, guild: &str, player_key: &str, snapshot: RankSnapshot) -> BotResult<()> {
        self.put_at(guild, player_key, snapshot, Utc::now()).await
    }

    /// Upserts a successful lookup and clears the failure counter.
    pub async fn put_at(
        &self,
        guild: &str,
        player_key: &str,
        snapshot: RankSnapshot,
        now: DateTime<Utc>,
    ) -> BotResult<()> {
        let path = self.store.guild_path(Some(CACHE_DIR), guild, CACHE_SUFFIX)?;
        self.store
            .update(&path, |cache: &mut CacheDocument| {
                cache.insert(
                    player_key.to_string(),
                    CacheEntry {
                        data: snapshot,
                        fetched_at: now,
                        last_attempt_at: now,
                        failed_attempts: 0,
                    },
                );
            })
            .await
    }

    pub async fn mark_failed(&self, guild: &str, player_key: &str) -> BotResult<()> {
        self.mark_failed_at(guild, player_key, Utc::now()).await
    }

    /// Records a failed attempt, keeping the previous data. No-op for
    /// unknown players.
    pub async fn mark_failed_at(
        &self,
        guild: &str,
        player_key: &str,
        now: DateTime<Utc>,
    ) -> BotResult<()> {
        let path = self.store.guild_path(Some(CACHE_DIR), guild, CACHE_SUFFIX)?;
        // Avoid creating a document for a guild that never cached anything.
        if self.entry(guild, player_key).await.is_none() {
            return Ok(());
        }
        self.store
            .update(&path, |cache: &mut CacheDocument| {
                if let Some(entry) = cache.get_mut(player_key) {
                    entry.last_attempt_at = now;
                    entry.failed_attempts += 1;
                }
            })
            .await
    }
}
