use crate::{
    error::BotResult,
    storage::JsonStore,
    valorant::{rank::PlayerIdentity, region::Region},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const QUEUE_DIR: &str = "cache";
const QUEUE_SUFFIX: &str = "_retry_queue.json";
const FALLBACK_RETRY_DELAY_SEC: i64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryQueueEntry {
    pub player: PlayerIdentity,
    // Region the failed lookup was made for. Older queues don't carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    pub retry_at: DateTime<Utc>,
    pub attempts: u32,
}

impl RetryQueueEntry {
    fn is_same_attempt(&self, other: &RetryQueueEntry) -> bool {
        self.player == other.player
            && self.retry_at == other.retry_at
            && self.attempts == other.attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Default, PartialEq)]
pub struct RetrySummary {
    pub succeeded: Vec<PlayerIdentity>,
    pub rescheduled: Vec<PlayerIdentity>,
    // Gave up on those, the max number of attempts was reached.
    pub exhausted: Vec<PlayerIdentity>,
}

/// Per-guild queue of lookups to try again later. At most one entry per
/// player; enqueuing a queued player replaces its entry.
#[derive(Clone)]
pub struct RetryQueue {
    store: JsonStore,
    delay: chrono::Duration,
    max_attempts: u32,
}

impl RetryQueue {
    pub fn new(store: JsonStore, delay: Duration, max_attempts: u32) -> RetryQueue {
        let delay = chrono::Duration::from_std(delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(FALLBACK_RETRY_DELAY_SEC));
        RetryQueue {
            store,
            delay,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn entries(&self, guild: &str) -> Vec<RetryQueueEntry> {
        match self.store.guild_path(Some(QUEUE_DIR), guild, QUEUE_SUFFIX) {
            Ok(path) => self.store.load(&path).await,
            Err(e) => {
                warn!("Retry queue unavailable for guild {guild}. {e}");
                vec![]
            }
        }
    }

    pub async fn enqueue(
        &self,
        guild: &str,
        player: &PlayerIdentity,
        region: Option<Region>,
    ) -> BotResult<()> {
        self.enqueue_all_at(guild, std::slice::from_ref(player), region, Utc::now())
            .await
    }

    pub async fn enqueue_all(
        &self,
        guild: &str,
        players: &[PlayerIdentity],
        region: Option<Region>,
    ) -> BotResult<()> {
        self.enqueue_all_at(guild, players, region, Utc::now()).await
    }

    /// Queues every player for a retry at `now + delay`, in a single write.
    pub async fn enqueue_all_at(
        &self,
        guild: &str,
        players: &[PlayerIdentity],
        region: Option<Region>,
        now: DateTime<Utc>,
    ) -> BotResult<()> {
        if players.is_empty() {
            return Ok(());
        }
        let path = self.store.guild_path(Some(QUEUE_DIR), guild, QUEUE_SUFFIX)?;
        let retry_at = now + self.delay;
        self.store
            .update(&path, |queue: &mut Vec<RetryQueueEntry>| {
                for player in players {
                    queue.retain(|entry| entry.player != *player);
                    queue.push(RetryQueueEntry {
                        player: player.clone(),
                        region,
                        retry_at,
                        attempts: 0,
                    });
                }
            })
            .await
    }

    /// Entries due at `now` that still have attempts left. Read only.
    pub async fn due(&self, guild: &str, now: DateTime<Utc>) -> Vec<RetryQueueEntry> {
        self.entries(guild)
            .await
            .into_iter()
            .filter(|entry| entry.retry_at <= now && entry.attempts < self.max_attempts)
            .collect()
    }

    /// Commits the outcomes of a full scan in one write. Entries replaced by
    /// a fresh enqueue since the scan started are left alone.
    pub async fn apply(
        &self,
        guild: &str,
        outcomes: &[(RetryQueueEntry, RetryOutcome)],
        now: DateTime<Utc>,
    ) -> BotResult<RetrySummary> {
        let path = self.store.guild_path(Some(QUEUE_DIR), guild, QUEUE_SUFFIX)?;
        let max_attempts = self.max_attempts;
        let retry_at = now + self.delay;

        self.store
            .update(&path, |queue: &mut Vec<RetryQueueEntry>| {
                let mut summary = RetrySummary::default();
                for (scanned, outcome) in outcomes {
                    let Some(position) = queue.iter().position(|e| e.is_same_attempt(scanned))
                    else {
                        continue;
                    };
                    match outcome {
                        RetryOutcome::Succeeded => {
                            queue.remove(position);
                            summary.succeeded.push(scanned.player.clone());
                        }
                        RetryOutcome::Failed => {
                            let entry = &mut queue[position];
                            entry.attempts += 1;
                            entry.retry_at = retry_at;
                            if entry.attempts >= max_attempts {
                                queue.remove(position);
                                summary.exhausted.push(scanned.player.clone());
                            } else {
                                summary.rescheduled.push(scanned.player.clone());
                            }
                        }
                    }
                }
                queue.retain(|entry| entry.attempts < max_attempts);
                summary
            })
            .await
    }

    /// Guilds with something left in their persisted queue.
    pub async fn pending_guilds(&self) -> Vec<String> {
        let mut pending = vec![];
        for guild in self.store.list_guilds(Some(QUEUE_DIR), QUEUE_SUFFIX).await {
            if !self.entries(&guild).await.is_empty() {
                pending.push(guild);
            }
        }
        pending
    }
}
