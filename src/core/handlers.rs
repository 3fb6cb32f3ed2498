use crate::{
    config::Settings,
    core::{
        commands::Command,
        events::{Board, CommandContext, Event, Failure, Reply},
    },
    error::BotResult,
    leaderboard::{fetcher::LeaderboardFetcher, lookup::RankLookup, retry::RetryScheduler},
    storage::{
        cache::RankCache,
        registry::{AutoUpdateConfig, GuildRegistry, PlayerRecord},
        retry_queue::RetryQueue,
        JsonStore,
    },
    valorant::{
        client::RankApi,
        rank::{sort_by_rank, PlayerIdentity},
        region::Region,
    },
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Executes commands against the rank services. Knows nothing about the
/// chat platform; replies are plain values rendered by the caller.
#[derive(Clone)]
pub struct Bot {
    pub lookup: RankLookup,
    pub cache: RankCache,
    pub fetcher: LeaderboardFetcher,
    pub retries: RetryScheduler,
    pub registry: GuildRegistry,
    pub default_region: Region,
}

impl Bot {
    pub fn from_settings(settings: &Settings, api: Arc<dyn RankApi>) -> Bot {
        let store = JsonStore::new(settings.data_path());
        let lookup = RankLookup::new(
            api,
            settings.max_concurrent_requests,
            settings.api_timeout(),
        );
        let cache = RankCache::new(store.clone(), settings.cache_freshness());
        let queue = RetryQueue::new(
            store.clone(),
            settings.retry_interval(),
            settings.max_retry_attempts,
        );
        let fetcher = LeaderboardFetcher::new(
            lookup.clone(),
            cache.clone(),
            queue.clone(),
            settings.retry_not_found,
        );
        let retries = RetryScheduler::new(
            lookup.clone(),
            cache.clone(),
            queue,
            settings.default_region,
            settings.retry_interval(),
        );

        Bot {
            lookup,
            cache,
            fetcher,
            retries,
            registry: GuildRegistry::new(store),
            default_region: settings.default_region,
        }
    }

    pub async fn execute(&self, context: &CommandContext, command: Command) -> Reply {
        info!("Executing {command:?} for guild {}", context.guild);
        let guild = context.guild.as_str();

        match command {
            Command::Help => Reply::Help(self.default_region),
            Command::Register(player, region) => {
                let region = region.unwrap_or(self.default_region);
                self.register(guild, context.user.clone(), player, region).await
            }
            Command::Unregister(player) => match self.registry.unregister(guild, &player).await {
                Ok(found) => Reply::Unregistered { player, found },
                Err(e) => {
                    error!("Could not unregister {player} in guild {guild}. {e}");
                    Reply::Failure(Failure::Unavailable)
                }
            },
            Command::Rank(player, region) => {
                let region = region.unwrap_or(self.default_region);
                match self.lookup.rank(region, &player).await {
                    Ok(snapshot) => Reply::Rank {
                        player,
                        region,
                        snapshot,
                    },
                    Err(e) => {
                        warn!("Rank lookup failed for {player}. {e}");
                        Reply::Failure(Failure::from_error(&e, &player))
                    }
                }
            }
            Command::Leaderboard(region) => {
                let region = region.unwrap_or(self.default_region);
                match self.leaderboard(guild, region).await {
                    Ok(Some(board)) => Reply::Leaderboard(board),
                    Ok(None) => Reply::NoPlayers(region),
                    Err(e) => {
                        error!("Leaderboard failed for guild {guild}. {e}");
                        Reply::Failure(Failure::Unavailable)
                    }
                }
            }
            Command::AutoLeaderboardOn(region) => {
                let region = region.unwrap_or(self.default_region);
                match self.leaderboard(guild, region).await {
                    Ok(Some(board)) => Reply::AutoLeaderboard(board),
                    Ok(None) => Reply::NoPlayers(region),
                    Err(e) => {
                        error!("Leaderboard failed for guild {guild}. {e}");
                        Reply::Failure(Failure::Unavailable)
                    }
                }
            }
            Command::AutoLeaderboardOff => match self.disable_auto_update(guild).await {
                Ok(true) => Reply::AutoLeaderboardDisabled,
                Ok(false) => Reply::NoAutoLeaderboard,
                Err(e) => {
                    error!("Could not disable auto-update for guild {guild}. {e}");
                    Reply::Failure(Failure::Unavailable)
                }
            },
            Command::DeleteLeaderboard => {
                let target = self.registry.auto_update(guild).await.and_then(|config| {
                    config
                        .target()
                        .map(|(channel, message)| (channel.to_string(), message.to_string()))
                });
                match target {
                    Some((channel, message_id)) => Reply::DeleteLeaderboard {
                        channel,
                        message_id,
                    },
                    None => Reply::NoAutoLeaderboard,
                }
            }
        }
    }

    async fn register(
        &self,
        guild: &str,
        user: Option<String>,
        player: PlayerIdentity,
        region: Region,
    ) -> Reply {
        let account = match self.lookup.account(&player).await {
            Ok(account) => account,
            Err(e) => {
                warn!("Account lookup failed for {player}. {e}");
                return Reply::Failure(Failure::from_error(&e, &player));
            }
        };
        let snapshot = match self.lookup.rank(region, &player).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Rank lookup failed for {player}. {e}");
                return Reply::Failure(Failure::from_error(&e, &player));
            }
        };

        // Keep the casing the API knows the account by
        let player = PlayerIdentity::new(account.name, account.tag);
        let now = Utc::now();
        let record = PlayerRecord {
            name: player.name.clone(),
            tag: player.tag.clone(),
            region,
            puuid: account.puuid,
            user_id: user,
            registered_at: now,
            updated_at: now,
        };
        if let Err(e) = self.registry.register(guild, record).await {
            error!("Could not register {player} in guild {guild}. {e}");
            return Reply::Failure(Failure::Unavailable);
        }
        if let Err(e) = self.cache.put(guild, &player.key(), snapshot.clone()).await {
            warn!("Could not cache rank of {player}. {e}");
        }
        info!("Registered {player} in guild {guild}");

        Reply::Registered {
            player,
            region,
            snapshot,
        }
    }

    /// Batch fetch of every registered player, in leaderboard order. None
    /// when nobody is registered.
    pub async fn leaderboard(&self, guild: &str, region: Region) -> BotResult<Option<Board>> {
        let players = self.registry.identities(guild).await;
        if players.is_empty() {
            return Ok(None);
        }

        let fetch = self
            .fetcher
            .fetch_leaderboard(region, players, guild)
            .await?;
        if !fetch.failures.is_empty() && self.retries.start(guild) {
            info!("Started retry loop for guild {guild}");
        }

        Ok(Some(Board {
            region,
            ranks: sort_by_rank(fetch.successes),
            failed: fetch.failures,
            updated_at: Utc::now(),
        }))
    }

    /// Makes a freshly posted leaderboard message the guild's auto-update target.
    pub async fn enable_auto_update(
        &self,
        guild: &str,
        channel: &str,
        message_id: &str,
        region: Region,
    ) -> BotResult<()> {
        let config = AutoUpdateConfig {
            enabled: true,
            message_id: Some(message_id.to_string()),
            channel_id: Some(channel.to_string()),
            region,
        };
        self.registry.set_auto_update(guild, config).await?;
        info!("Auto-update enabled for guild {guild} on message {message_id}");
        Ok(())
    }

    /// Returns whether there was anything to disable.
    pub async fn disable_auto_update(&self, guild: &str) -> BotResult<bool> {
        match self.registry.auto_update(guild).await {
            Some(config) if config.enabled => {
                self.registry
                    .set_auto_update(guild, AutoUpdateConfig::disabled(config.region))
                    .await?;
                info!("Auto-update disabled for guild {guild}");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// One refresh event per guild with an auto-updated leaderboard, with an
    /// empty board once nobody is registered. A guild that fails is skipped.
    pub async fn refresh_auto_leaderboards(&self) -> Vec<Event> {
        let mut events = vec![];
        for (guild, config) in self.registry.auto_update_configs().await {
            let Some((channel, message_id)) = config
                .target()
                .map(|(channel, message)| (channel.to_string(), message.to_string()))
            else {
                continue;
            };
            match self.leaderboard(&guild, config.region).await {
                Ok(Some(board)) => events.push(Event::LeaderboardRefreshed {
                    guild,
                    channel,
                    message_id,
                    board,
                }),
                Ok(None) => {
                    info!("No players left in guild {guild}, clearing its leaderboard");
                    events.push(Event::LeaderboardRefreshed {
                        guild,
                        channel,
                        message_id,
                        board: Board::empty(config.region),
                    })
                }
                Err(e) => error!("Could not refresh leaderboard of guild {guild}. {e}"),
            }
        }
        events
    }
}
