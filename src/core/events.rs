use crate::{
    core::{
        commands::{region_list, Command, CommandError},
        display::truncated_board,
        templates::MessageTemplate,
    },
    error::{BotError, BotResult},
    valorant::{
        rank::{PlayerIdentity, PlayerRank, RankSnapshot, UNRATED},
        region::Region,
    },
};

use chrono::{DateTime, Local, Utc};
use minijinja::context;
use std::fmt;

/// Where a command came from. `guild` is the chat workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub guild: String,
    pub channel: String,
    pub user: Option<String>,
    pub ts: String,
}

#[derive(Debug)]
pub enum Event {
    CommandReceived(CommandContext, Result<Command, CommandError>),
    LeaderboardRefreshed {
        guild: String,
        channel: String,
        message_id: String,
        board: Board,
    },
}

/// Ranked players of a guild at a point in time.
#[derive(Debug, Clone)]
pub struct Board {
    pub region: Region,
    // Already in leaderboard order
    pub ranks: Vec<PlayerRank>,
    pub failed: Vec<PlayerIdentity>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// Board of a guild without registered players.
    pub fn empty(region: Region) -> Board {
        Board {
            region,
            ranks: vec![],
            failed: vec![],
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    PlayerNotFound(String),
    RateLimited,
    Unavailable,
}

impl Failure {
    pub fn from_error(error: &BotError, player: &PlayerIdentity) -> Failure {
        match error {
            BotError::NotFound(_) => Failure::PlayerNotFound(player.key()),
            BotError::RateLimited => Failure::RateLimited,
            _ => Failure::Unavailable,
        }
    }
}

#[derive(Debug)]
pub enum Reply {
    Help(Region),
    Registered {
        player: PlayerIdentity,
        region: Region,
        snapshot: RankSnapshot,
    },
    Unregistered {
        player: PlayerIdentity,
        found: bool,
    },
    Rank {
        player: PlayerIdentity,
        region: Region,
        snapshot: RankSnapshot,
    },
    Leaderboard(Board),
    // Posted, then tracked as the guild's auto-updated message
    AutoLeaderboard(Board),
    AutoLeaderboardDisabled,
    // The message has to be removed from the channel before confirming
    DeleteLeaderboard {
        channel: String,
        message_id: String,
    },
    NoAutoLeaderboard,
    NoPlayers(Region),
    Failure(Failure),
    Usage(CommandError),
}

fn render_board(board: &Board, auto: bool) -> Result<String, minijinja::Error> {
    if board.is_empty() {
        return MessageTemplate::NoPlayers
            .get()?
            .render(context! { region => board.region.label() });
    }
    let (lines, more) = truncated_board(&board.ranks);
    let timestamp = board
        .updated_at
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string();

    MessageTemplate::Leaderboard.get()?.render(context! {
        auto => auto,
        region => board.region.label(),
        timestamp => timestamp,
        board => lines,
        more => more,
        failed => board.failed.len(),
    })
}

fn render(reply: &Reply) -> Result<String, minijinja::Error> {
    match reply {
        Reply::Help(default_region) => MessageTemplate::Help.get()?.render(context! {
            regions => region_list(),
            default_region => default_region.to_string(),
        }),
        Reply::Registered {
            player,
            region,
            snapshot,
        } => MessageTemplate::Registered.get()?.render(context! {
            player => player.key(),
            region => region.to_string(),
            tier => snapshot.tier_name,
            rated => snapshot.tier_name != UNRATED,
            rr => snapshot.rr,
        }),
        Reply::Unregistered { player, found } => MessageTemplate::Unregistered
            .get()?
            .render(context! { player => player.key(), found => found }),
        Reply::Rank {
            player,
            region,
            snapshot,
        } => MessageTemplate::Rank.get()?.render(context! {
            player => player.key(),
            region => region.to_string(),
            tier => snapshot.tier_name,
            rated => snapshot.tier_name != UNRATED,
            rr => snapshot.rr,
            peak_tier => snapshot.peak_tier,
            peak_rated => snapshot.peak_tier != UNRATED,
            peak_rr => snapshot.peak_rr,
            leaderboard_rank => snapshot.leaderboard_rank,
        }),
        Reply::Leaderboard(board) => render_board(board, false),
        Reply::AutoLeaderboard(board) => render_board(board, true),
        Reply::AutoLeaderboardDisabled => MessageTemplate::AutoLeaderboardDisabled.get()?.render({}),
        Reply::DeleteLeaderboard { .. } => MessageTemplate::LeaderboardDeleted.get()?.render({}),
        Reply::NoAutoLeaderboard => MessageTemplate::NoAutoLeaderboard.get()?.render({}),
        Reply::NoPlayers(region) => MessageTemplate::NoPlayers
            .get()?
            .render(context! { region => region.label() }),
        Reply::Failure(Failure::PlayerNotFound(player)) => MessageTemplate::PlayerNotFound
            .get()?
            .render(context! { player => player }),
        Reply::Failure(Failure::RateLimited) => MessageTemplate::RateLimited.get()?.render({}),
        Reply::Failure(Failure::Unavailable) => MessageTemplate::Unavailable.get()?.render({}),
        Reply::Usage(error) => MessageTemplate::Usage.get()?.render(context! {
            reason => error.to_string(),
            usage => error.usage(),
        }),
    }
}

impl Reply {
    pub fn render(&self) -> BotResult<String> {
        render(self).map_err(|e| BotError::Parse(format!("Could not render reply. {e}")))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = render(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(name: &str, tier: &str, rr: i64) -> PlayerRank {
        PlayerRank {
            player: PlayerIdentity::new(name, "EU1"),
            snapshot: RankSnapshot {
                tier_name: tier.to_string(),
                rr,
                ..RankSnapshot::unrated()
            },
        }
    }

    #[test]
    fn leaderboard_footer_counts_hidden_players() {
        let board = Board {
            region: Region::Eu,
            ranks: (0..23).map(|i| ranked(&format!("P{i}"), "Gold 2", i)).collect(),
            failed: vec![PlayerIdentity::new("Late", "EU1")],
            updated_at: Utc::now(),
        };
        let text = Reply::Leaderboard(board).to_string();
        assert!(text.contains("Europe"));
        assert!(text.contains("and 3 more"));
        assert!(text.contains("1 player could not be fetched"));
        assert!(!text.contains("P20#EU1"));
    }

    #[test]
    fn empty_board_says_nobody_is_registered() {
        let text = Reply::AutoLeaderboard(Board::empty(Region::Na)).to_string();
        assert!(text.contains("No registered players"));
        assert!(text.contains("North America"));
        assert!(!text.contains("```"));
    }

    #[test]
    fn rank_shows_placement_when_known() {
        let snapshot = RankSnapshot {
            tier_name: "Radiant".to_string(),
            rr: 512,
            peak_tier: "Radiant".to_string(),
            peak_rr: 600,
            leaderboard_rank: Some(42),
        };
        let text = Reply::Rank {
            player: PlayerIdentity::new("Ace", "EU1"),
            region: Region::Eu,
            snapshot,
        }
        .to_string();
        assert!(text.contains("512 RR"));
        assert!(text.contains("#42"));
    }

    #[test]
    fn usage_reply_quotes_usage() {
        let error = CommandError::InvalidArguments {
            usage: "!rank Name#TAG [region]",
        };
        let text = Reply::Usage(error).to_string();
        assert!(text.contains("!rank Name#TAG [region]"));
    }

    #[test]
    fn failures_map_to_friendly_kinds() {
        let player = PlayerIdentity::new("Ace", "EU1");
        assert_eq!(
            Failure::from_error(&BotError::NotFound("x".into()), &player),
            Failure::PlayerNotFound("Ace#EU1".to_string())
        );
        assert_eq!(
            Failure::from_error(&BotError::RateLimited, &player),
            Failure::RateLimited
        );
        assert_eq!(
            Failure::from_error(&BotError::Timeout, &player),
            Failure::Unavailable
        );
    }
}
