use crate::{
    error::BotResult,
    storage::JsonStore,
    valorant::{rank::PlayerIdentity, region::Region},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const GUILD_SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub region: Region,
    pub puuid: String,
    // Chat user who registered the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity::new(&self.name, &self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    // Timestamp of the message to edit, Slack's message identifier
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
    #[serde(default)]
    pub region: Region,
}

impl AutoUpdateConfig {
    pub fn disabled(region: Region) -> Self {
        AutoUpdateConfig {
            enabled: false,
            message_id: None,
            channel_id: None,
            region,
        }
    }

    /// (channel, message) when there is something to refresh.
    pub fn target(&self) -> Option<(&str, &str)> {
        match (self.enabled, &self.channel_id, &self.message_id) {
            (true, Some(channel), Some(message)) => Some((channel.as_str(), message.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GuildDocument {
    // puuid => player
    #[serde(default)]
    players: BTreeMap<String, PlayerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auto_update: Option<AutoUpdateConfig>,
}

/// Registered players and leaderboard settings of every guild.
#[derive(Clone)]
pub struct GuildRegistry {
    store: JsonStore,
}

impl GuildRegistry {
    pub fn new(store: JsonStore) -> GuildRegistry {
        GuildRegistry { store }
    }

    async fn document(&self, guild: &str) -> GuildDocument {
        match self.store.guild_path(None, guild, GUILD_SUFFIX) {
            Ok(path) => self.store.load(&path).await,
            Err(e) => {
                warn!("Registry unavailable for guild {guild}. {e}");
                GuildDocument::default()
            }
        }
    }

    pub async fn players(&self, guild: &str) -> Vec<PlayerRecord> {
        self.document(guild).await.players.into_values().collect()
    }

    pub async fn identities(&self, guild: &str) -> Vec<PlayerIdentity> {
        self.players(guild)
            .await
            .iter()
            .map(PlayerRecord::identity)
            .collect()
    }

    /// Upserts a player, keyed by puuid.
    pub async fn register(&self, guild: &str, mut record: PlayerRecord) -> BotResult<()> {
        let path = self.store.guild_path(None, guild, GUILD_SUFFIX)?;
        record.updated_at = Utc::now();
        self.store
            .update(&path, |doc: &mut GuildDocument| {
                if let Some(previous) = doc.players.get(&record.puuid) {
                    record.registered_at = previous.registered_at;
                }
                doc.players.insert(record.puuid.clone(), record);
            })
            .await
    }

    /// Returns whether the player was registered.
    pub async fn unregister(&self, guild: &str, player: &PlayerIdentity) -> BotResult<bool> {
        let path = self.store.guild_path(None, guild, GUILD_SUFFIX)?;
        if !self.identities(guild).await.contains(player) {
            return Ok(false);
        }
        self.store
            .update(&path, |doc: &mut GuildDocument| {
                let before = doc.players.len();
                doc.players
                    .retain(|_, record| record.name != player.name || record.tag != player.tag);
                doc.players.len() != before
            })
            .await
    }

    pub async fn auto_update(&self, guild: &str) -> Option<AutoUpdateConfig> {
        self.document(guild).await.auto_update
    }

    pub async fn set_auto_update(&self, guild: &str, config: AutoUpdateConfig) -> BotResult<()> {
        let path = self.store.guild_path(None, guild, GUILD_SUFFIX)?;
        self.store
            .update(&path, |doc: &mut GuildDocument| {
                doc.auto_update = Some(config);
            })
            .await
    }

    /// Guilds with an enabled, complete auto-update configuration.
    pub async fn auto_update_configs(&self) -> Vec<(String, AutoUpdateConfig)> {
        let mut configs = vec![];
        for guild in self.store.list_guilds(None, GUILD_SUFFIX).await {
            if let Some(config) = self.auto_update(&guild).await {
                if config.target().is_some() {
                    configs.push((guild, config));
                }
            }
        }
        configs
    }
}
