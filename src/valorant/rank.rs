use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{cmp::Reverse, fmt};

pub const UNRATED: &str = "Unrated";

// Competitive tiers from highest to lowest, as reported by the API.
const TIER_ORDER: [(&'static str, i8); 10] = [
    ("Radiant", 8),
    ("Immortal", 7),
    ("Ascendant", 6),
    ("Diamond", 5),
    ("Platinum", 4),
    ("Gold", 3),
    ("Silver", 2),
    ("Bronze", 1),
    ("Iron", 0),
    (UNRATED, -1),
];
const UNKNOWN_TIER: i8 = -2;

// Riot ID of a player. Equality is exact on both halves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub name: String,
    pub tag: String,
}

impl PlayerIdentity {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        PlayerIdentity {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parses a `Name#TAG` Riot ID, splitting on the first `#`.
    pub fn parse(input: &str) -> Option<Self> {
        let (name, tag) = input.split_once('#')?;
        let (name, tag) = (name.trim(), tag.trim());
        match (name.is_empty(), tag.is_empty()) {
            (false, false) => Some(PlayerIdentity::new(name, tag)),
            _ => None,
        }
    }

    /// Cache and retry queue key.
    pub fn key(&self) -> String {
        format!("{}#{}", self.name, self.tag)
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub tier_name: String,
    pub rr: i64,
    pub peak_tier: String,
    pub peak_rr: i64,
    pub leaderboard_rank: Option<u64>,
}

impl RankSnapshot {
    pub fn unrated() -> Self {
        RankSnapshot {
            tier_name: UNRATED.to_string(),
            rr: 0,
            peak_tier: UNRATED.to_string(),
            peak_rr: 0,
            leaderboard_rank: None,
        }
    }

    /// (tier, division, rr) ordering key, highest first once reversed.
    pub fn ordering_key(&self) -> (i8, u8, i64) {
        let (tier, division) = tier_value(&self.tier_name);
        match tier {
            -1 => (-1, 0, 0),
            _ => (tier, division, self.rr),
        }
    }
}

// A snapshot along with the player it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRank {
    pub player: PlayerIdentity,
    pub snapshot: RankSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub puuid: String,
    pub name: String,
    pub tag: String,
    pub region: Option<String>,
    pub account_level: Option<u64>,
}

/// "Ascendant 2" => (6, 2), "Radiant" => (8, 0)
pub fn tier_value(tier_name: &str) -> (i8, u8) {
    let mut parts = tier_name.split_whitespace();
    let tier = parts
        .next()
        .and_then(|name| {
            TIER_ORDER
                .iter()
                .find(|(tier, _)| *tier == name)
                .map(|(_, value)| *value)
        })
        .unwrap_or(UNKNOWN_TIER);
    let division = parts
        .next()
        .and_then(|d| d.parse::<u8>().ok())
        .unwrap_or_default();
    (tier, division)
}

/// Highest rank first. Stable for players with the same key.
pub fn sort_by_rank(ranks: Vec<PlayerRank>) -> Vec<PlayerRank> {
    ranks
        .into_iter()
        .sorted_by_key(|r| Reverse(r.snapshot.ordering_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(name: &str, tier: &str, rr: i64) -> PlayerRank {
        PlayerRank {
            player: PlayerIdentity::new(name, "0000"),
            snapshot: RankSnapshot {
                tier_name: tier.to_string(),
                rr,
                ..RankSnapshot::unrated()
            },
        }
    }

    #[test]
    fn parses_riot_ids() {
        assert_eq!(
            PlayerIdentity::parse("Player Name#JP1"),
            Some(PlayerIdentity::new("Player Name", "JP1"))
        );
        // only the first '#' separates name and tag
        assert_eq!(
            PlayerIdentity::parse("a#b#c"),
            Some(PlayerIdentity::new("a", "b#c"))
        );
        assert_eq!(PlayerIdentity::parse("NoTag"), None);
        assert_eq!(PlayerIdentity::parse("#TAG"), None);
        assert_eq!(PlayerIdentity::parse("Name# "), None);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let a = PlayerIdentity::new("Foo", "EUW");
        let b = PlayerIdentity::new("foo", "EUW");
        assert_eq!(a.key(), "Foo#EUW");
        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn tier_values() {
        assert_eq!(tier_value("Radiant"), (8, 0));
        assert_eq!(tier_value("Ascendant 2"), (6, 2));
        assert_eq!(tier_value("Iron 1"), (0, 1));
        assert_eq!(tier_value("Unrated"), (-1, 0));
        assert_eq!(tier_value("Gold x"), (3, 0));
        assert_eq!(tier_value("Champion 1"), (-2, 1));
        assert_eq!(tier_value(""), (-2, 0));
    }

    #[test]
    fn sorts_highest_rank_first() {
        let sorted = sort_by_rank(vec![
            ranked("silver", "Silver 3", 90),
            ranked("unrated", "Unrated", 99),
            ranked("immortal", "Immortal 1", 10),
            ranked("asc2_low", "Ascendant 2", 15),
            ranked("asc2_high", "Ascendant 2", 80),
            ranked("asc3", "Ascendant 3", 0),
            ranked("radiant", "Radiant", 450),
            ranked("mystery", "Champion", 100),
        ]);

        let names = sorted
            .iter()
            .map(|r| r.player.name.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(
            names,
            vec![
                "radiant",
                "immortal",
                "asc3",
                "asc2_high",
                "asc2_low",
                "silver",
                "unrated",
                "mystery"
            ]
        );
    }

    #[test]
    fn unrated_ignores_rr() {
        let sorted = sort_by_rank(vec![
            ranked("first", "Unrated", 0),
            ranked("second", "Unrated", 100),
        ]);
        assert_eq!(sorted[0].player.name, "first");
        assert_eq!(sorted[1].player.name, "second");
    }
}
