//! Weekly leaderboard ranking.
//!
//! Rank comes from weekly XP only. Core XP, tier and code never move a
//! member on the board; they only supply the displayed identity.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Share of the board counted as elite.
pub const ELITE_TOP_FRACTION: f64 = 0.05;

/// Anything that can be ranked on the weekly board.
pub trait WeeklyScore {
    fn weekly_xp(&self) -> u32;
}

/// A member row on the weekly board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub weekly_xp: u32,
    #[serde(default)]
    pub code_name: Option<String>,
    #[serde(default)]
    pub sub_name: Option<String>,
}

impl WeeklyScore for LeaderboardEntry {
    fn weekly_xp(&self) -> u32 {
        self.weekly_xp
    }
}

/// An entry with its 1-based rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked<T> {
    pub rank: u32,
    #[serde(flatten)]
    pub entry: T,
}

/// Sort by weekly XP descending and assign ranks. Ties keep input order.
pub fn rank_by_weekly_xp<T: WeeklyScore>(mut entries: Vec<T>) -> Vec<Ranked<T>> {
    entries.sort_by_key(|e| std::cmp::Reverse(e.weekly_xp()));
    entries
        .into_iter()
        .zip(1u32..)
        .map(|(entry, rank)| Ranked { rank, entry })
        .collect()
}

/// Last rank (inclusive) in the elite group; at least 1.
pub fn elite_cutoff_rank(total_entries: usize) -> u32 {
    let cutoff = (total_entries as f64 * ELITE_TOP_FRACTION).ceil() as u32;
    cutoff.max(1)
}

pub fn is_elite(rank: u32, total_entries: usize) -> bool {
    rank <= elite_cutoff_rank(total_entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, weekly_xp: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: user_id.to_string(),
            weekly_xp,
            code_name: None,
            sub_name: None,
        }
    }

    #[test]
    fn test_rank_by_weekly_xp() {
        let ranked = rank_by_weekly_xp(vec![entry("a", 50), entry("b", 300), entry("c", 50), entry("d", 120)]);
        let order: Vec<_> = ranked.iter().map(|r| (r.rank, r.entry.user_id.as_str())).collect();
        assert_eq!(order, vec![(1, "b"), (2, "d"), (3, "a"), (4, "c")]);
    }

    #[test]
    fn test_elite_cutoff() {
        assert_eq!(elite_cutoff_rank(0), 1);
        assert_eq!(elite_cutoff_rank(10), 1);
        assert_eq!(elite_cutoff_rank(21), 2);
        assert_eq!(elite_cutoff_rank(100), 5);
        assert!(is_elite(5, 100));
        assert!(!is_elite(6, 100));
    }

    #[test]
    fn test_ranked_row_is_flat_on_the_wire() {
        let ranked = rank_by_weekly_xp(vec![entry("a", 10)]);
        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["rank"], 1);
        assert_eq!(json["user_id"], "a");
    }
}
