use crate::valorant::rank::{PlayerRank, UNRATED};
use itertools::Itertools;

// Lines shown in a leaderboard message; the rest is summed up in a footer.
pub const MAX_BOARD_LINES: usize = 20;

fn rating(rank: &PlayerRank) -> String {
    match rank.snapshot.tier_name == UNRATED {
        true => "".to_string(),
        false => format!("{} RR", rank.snapshot.rr),
    }
}

// Display board from ranks already in leaderboard order
pub fn board(ranks: &[PlayerRank]) -> String {
    // the width of the maximum position to be displayed
    let width_pos = ranks.len().to_string().len();

    let width_name = ranks
        .iter()
        .map(|r| r.player.key().chars().count())
        .max()
        .unwrap_or_default();

    let width_tier = ranks
        .iter()
        .map(|r| r.snapshot.tier_name.chars().count())
        .max()
        .unwrap_or_default();

    let width_rr = ranks
        .iter()
        .map(|r| rating(r).len())
        .max()
        .unwrap_or_default();

    ranks
        .iter()
        .enumerate()
        .map(|(idx, rank)| {
            let line = format!(
                "{:>width_pos$}) {:<width_name$}  {:<width_tier$} {:>width_rr$}",
                // idx is zero-based
                idx + 1,
                rank.player.key(),
                rank.snapshot.tier_name,
                rating(rank),
            );
            line.trim_end().to_string()
        })
        .join("\n")
}

/// First `MAX_BOARD_LINES` lines of the board and how many players were left out.
pub fn truncated_board(ranks: &[PlayerRank]) -> (String, usize) {
    let shown = ranks.len().min(MAX_BOARD_LINES);
    (board(&ranks[..shown]), ranks.len() - shown)
}
