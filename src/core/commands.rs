use crate::valorant::{rank::PlayerIdentity, region::Region};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use strum::IntoEnumIterator;

const COMMANDS: [&'static str; 7] = [
    "!help",
    "!register",
    "!unregister",
    "!rank",
    "!leaderboard",
    "!auto-leaderboard",
    "!delete-leaderboard",
];
// Command word, then whatever follows it
static REGEX_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*(![a-z-]+)(?:\s+(.*))?$").unwrap());

const USAGE_HELP: &str = "!help";
const USAGE_REGISTER: &str = "!register Name#TAG [region]";
const USAGE_UNREGISTER: &str = "!unregister Name#TAG";
const USAGE_RANK: &str = "!rank Name#TAG [region]";
const USAGE_LEADERBOARD: &str = "!leaderboard [region]";
const USAGE_AUTO_LEADERBOARD: &str = "!auto-leaderboard on [region] | !auto-leaderboard off";
const USAGE_DELETE_LEADERBOARD: &str = "!delete-leaderboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Register(PlayerIdentity, Option<Region>),
    Unregister(PlayerIdentity),
    Rank(PlayerIdentity, Option<Region>),
    Leaderboard(Option<Region>),
    AutoLeaderboardOn(Option<Region>),
    AutoLeaderboardOff,
    DeleteLeaderboard,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command {0}")]
    Unknown(String),
    #[error("Unknown region '{region}', expected one of {}", region_list())]
    UnknownRegion { region: String, usage: &'static str },
    #[error("Invalid arguments")]
    InvalidArguments { usage: &'static str },
}

impl CommandError {
    pub fn usage(&self) -> &'static str {
        match self {
            CommandError::Unknown(_) => USAGE_HELP,
            CommandError::UnknownRegion { usage, .. } => usage,
            CommandError::InvalidArguments { usage } => usage,
        }
    }
}

pub fn region_list() -> String {
    Region::iter().map(|r| r.to_string()).join(", ")
}

fn split_command(input: &str) -> Option<(String, &str)> {
    let captures = REGEX_COMMAND.captures(input)?;
    let command = captures.get(1)?.as_str().to_lowercase();
    let args = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    Some((command, args))
}

fn region_arg(arg: &str, usage: &'static str) -> Result<Region, CommandError> {
    Region::from_str(arg).map_err(|_| CommandError::UnknownRegion {
        region: arg.to_string(),
        usage,
    })
}

fn optional_region(args: &str, usage: &'static str) -> Result<Option<Region>, CommandError> {
    let mut words = args.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => Ok(None),
        (Some(region), None) => region_arg(region, usage).map(Some),
        _ => Err(CommandError::InvalidArguments { usage }),
    }
}

// Riot names may contain spaces, so the region is only split off when the
// last word cannot be part of the ID.
fn player_and_region(
    args: &str,
    usage: &'static str,
) -> Result<(PlayerIdentity, Option<Region>), CommandError> {
    let invalid = CommandError::InvalidArguments { usage };
    match args.rsplit_once(char::is_whitespace) {
        Some((head, last)) if !last.contains('#') => {
            let region = region_arg(last, usage)?;
            let player = PlayerIdentity::parse(head).ok_or(invalid)?;
            Ok((player, Some(region)))
        }
        _ => PlayerIdentity::parse(args)
            .map(|player| (player, None))
            .ok_or(invalid),
    }
}

impl Command {
    pub fn is_command(input: &str) -> bool {
        split_command(input)
            .map(|(command, _)| COMMANDS.contains(&command.as_str()))
            .unwrap_or_default()
    }

    pub fn build_from(input: &str) -> Result<Command, CommandError> {
        let (command, args) =
            split_command(input).ok_or_else(|| CommandError::Unknown(input.to_string()))?;

        match command.as_str() {
            cmd if cmd == COMMANDS[0] => Ok(Command::Help),
            cmd if cmd == COMMANDS[1] => {
                let (player, region) = player_and_region(args, USAGE_REGISTER)?;
                Ok(Command::Register(player, region))
            }
            cmd if cmd == COMMANDS[2] => PlayerIdentity::parse(args)
                .map(Command::Unregister)
                .ok_or(CommandError::InvalidArguments {
                    usage: USAGE_UNREGISTER,
                }),
            cmd if cmd == COMMANDS[3] => {
                let (player, region) = player_and_region(args, USAGE_RANK)?;
                Ok(Command::Rank(player, region))
            }
            cmd if cmd == COMMANDS[4] => {
                optional_region(args, USAGE_LEADERBOARD).map(Command::Leaderboard)
            }
            cmd if cmd == COMMANDS[5] => {
                let (switch, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                match (switch.to_lowercase().as_str(), rest.trim()) {
                    ("on", rest) => optional_region(rest, USAGE_AUTO_LEADERBOARD)
                        .map(Command::AutoLeaderboardOn),
                    ("off", "") => Ok(Command::AutoLeaderboardOff),
                    _ => Err(CommandError::InvalidArguments {
                        usage: USAGE_AUTO_LEADERBOARD,
                    }),
                }
            }
            cmd if cmd == COMMANDS[6] => match args.is_empty() {
                true => Ok(Command::DeleteLeaderboard),
                false => Err(CommandError::InvalidArguments {
                    usage: USAGE_DELETE_LEADERBOARD,
                }),
            },
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_commands_only() {
        assert!(Command::is_command("!help"));
        assert!(Command::is_command("  !leaderboard eu"));
        assert!(Command::is_command("!Auto-Leaderboard on"));
        assert!(!Command::is_command("hello !help"));
        assert!(!Command::is_command("!helpme"));
        assert!(!Command::is_command("!"));
    }

    #[test]
    fn register_with_and_without_region() {
        assert_eq!(
            Command::build_from("!register Ace#EU1"),
            Ok(Command::Register(PlayerIdentity::new("Ace", "EU1"), None))
        );
        assert_eq!(
            Command::build_from("!register Ace#EU1 EU"),
            Ok(Command::Register(
                PlayerIdentity::new("Ace", "EU1"),
                Some(Region::Eu)
            ))
        );
    }

    #[test]
    fn names_may_contain_spaces() {
        assert_eq!(
            Command::build_from("!rank Player Name#JP1"),
            Ok(Command::Rank(PlayerIdentity::new("Player Name", "JP1"), None))
        );
        assert_eq!(
            Command::build_from("!rank Player Name#JP1 kr"),
            Ok(Command::Rank(
                PlayerIdentity::new("Player Name", "JP1"),
                Some(Region::Kr)
            ))
        );
    }

    #[test]
    fn rejects_unknown_region() {
        let error = Command::build_from("!rank Ace#EU1 mars").unwrap_err();
        assert_eq!(
            error,
            CommandError::UnknownRegion {
                region: "mars".to_string(),
                usage: USAGE_RANK
            }
        );
        assert!(error.to_string().contains("latam"));
    }

    #[test]
    fn rejects_missing_riot_id() {
        assert_eq!(
            Command::build_from("!register"),
            Err(CommandError::InvalidArguments {
                usage: USAGE_REGISTER
            })
        );
        assert_eq!(
            Command::build_from("!unregister Ace"),
            Err(CommandError::InvalidArguments {
                usage: USAGE_UNREGISTER
            })
        );
    }

    #[test]
    fn leaderboard_commands() {
        assert_eq!(
            Command::build_from("!leaderboard"),
            Ok(Command::Leaderboard(None))
        );
        assert_eq!(
            Command::build_from("!leaderboard na"),
            Ok(Command::Leaderboard(Some(Region::Na)))
        );
        assert_eq!(
            Command::build_from("!auto-leaderboard on br"),
            Ok(Command::AutoLeaderboardOn(Some(Region::Br)))
        );
        assert_eq!(
            Command::build_from("!auto-leaderboard OFF"),
            Ok(Command::AutoLeaderboardOff)
        );
        assert!(Command::build_from("!auto-leaderboard maybe").is_err());
        assert_eq!(
            Command::build_from("!delete-leaderboard"),
            Ok(Command::DeleteLeaderboard)
        );
    }
}
