use crate::{
    error::{BotError, BotResult},
    leaderboard::lookup::RankLookup,
    storage::{cache::RankCache, retry_queue::RetryQueue},
    valorant::{
        rank::{PlayerIdentity, PlayerRank},
        region::Region,
    },
};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of a batch fetch. Neither list follows the input order.
#[derive(Debug, Default)]
pub struct LeaderboardFetch {
    pub successes: Vec<PlayerRank>,
    pub failures: Vec<PlayerIdentity>,
}

enum Resolution {
    Resolved(PlayerRank),
    Failed(PlayerIdentity, BotError),
}

/// Resolves the ranks of a batch of players: fresh cache hits first, live
/// lookups otherwise, stale cache when rate limited.
#[derive(Clone)]
pub struct LeaderboardFetcher {
    lookup: RankLookup,
    cache: RankCache,
    retry_queue: RetryQueue,
    retry_not_found: bool,
}

impl LeaderboardFetcher {
    pub fn new(
        lookup: RankLookup,
        cache: RankCache,
        retry_queue: RetryQueue,
        retry_not_found: bool,
    ) -> LeaderboardFetcher {
        LeaderboardFetcher {
            lookup,
            cache,
            retry_queue,
            retry_not_found,
        }
    }

    pub async fn fetch_leaderboard(
        &self,
        region: Region,
        players: Vec<PlayerIdentity>,
        guild: &str,
    ) -> BotResult<LeaderboardFetch> {
        self.fetch_leaderboard_with_cancel(region, players, guild, &CancellationToken::new())
            .await
    }

    /// Once `cancel` fires, players still in flight are left out of both
    /// lists. Failures gathered so far are still queued for a retry.
    pub async fn fetch_leaderboard_with_cancel(
        &self,
        region: Region,
        players: Vec<PlayerIdentity>,
        guild: &str,
        cancel: &CancellationToken,
    ) -> BotResult<LeaderboardFetch> {
        let total = players.len();
        let mut pending = players
            .into_iter()
            .map(|player| self.resolve(region, guild, player))
            .collect::<FuturesUnordered<_>>();

        let mut fetch = LeaderboardFetch::default();
        let mut to_retry = vec![];
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        "Leaderboard fetch for guild {guild} cancelled, {} of {total} players resolved",
                        fetch.successes.len() + fetch.failures.len()
                    );
                    break;
                }
                next = pending.next() => match next {
                    Some(Resolution::Resolved(rank)) => fetch.successes.push(rank),
                    Some(Resolution::Failed(player, error)) => {
                        let retry = match error {
                            BotError::NotFound(_) => self.retry_not_found,
                            _ => true,
                        };
                        if retry {
                            to_retry.push(player.clone());
                        }
                        fetch.failures.push(player);
                    }
                    None => break,
                },
            }
        }

        if !to_retry.is_empty() {
            self.retry_queue
                .enqueue_all(guild, &to_retry, Some(region))
                .await?;
            info!(
                "Queued {} players of guild {guild} for a later retry",
                to_retry.len()
            );
        }

        Ok(fetch)
    }

    async fn resolve(&self, region: Region, guild: &str, player: PlayerIdentity) -> Resolution {
        let key = player.key();

        if let Some(snapshot) = self.cache.get(guild, &key).await {
            debug!("Cache hit for {key}");
            return Resolution::Resolved(PlayerRank { player, snapshot });
        }

        match self.lookup.rank(region, &player).await {
            Ok(snapshot) => {
                if let Err(e) = self.cache.put(guild, &key, snapshot.clone()).await {
                    warn!("Could not cache rank of {key}. {e}");
                }
                Resolution::Resolved(PlayerRank { player, snapshot })
            }
            Err(BotError::RateLimited) => match self.cache.get_any(guild, &key).await {
                Some(snapshot) => {
                    warn!("Rate limited, serving stale rank for {key}");
                    if let Err(e) = self.cache.mark_failed(guild, &key).await {
                        warn!("Could not record failed attempt for {key}. {e}");
                    }
                    Resolution::Resolved(PlayerRank { player, snapshot })
                }
                None => {
                    warn!("Rate limited and nothing cached for {key}");
                    Resolution::Failed(player, BotError::RateLimited)
                }
            },
            Err(e) if e.is_transient() => {
                warn!("Could not get rank for {key}. {e}");
                Resolution::Failed(player, e)
            }
            Err(e) => {
                info!("No rank for {key}. {e}");
                Resolution::Failed(player, e)
            }
        }
    }
}
