//! Scores, leaderboard descriptors and leaderboard queries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single submitted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Player that achieved the score.
    pub player_id: String,
    /// Leaderboard the score belongs to.
    pub leaderboard_id: String,
    /// When the score was reported.
    pub date: DateTime<Utc>,
    /// Raw score value.
    pub value: f64,
    /// Human readable value, e.g. `"12 points"`.
    pub formatted_value: String,
    /// 1-based rank, or 0 when unranked.
    #[serde(default)]
    pub rank: u32,
}

impl ScoreRecord {
    /// Creates an unranked score.
    pub fn new(
        player_id: impl Into<String>,
        leaderboard_id: impl Into<String>,
        date: DateTime<Utc>,
        value: f64,
        formatted_value: impl Into<String>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            leaderboard_id: leaderboard_id.into(),
            date,
            value,
            formatted_value: formatted_value.into(),
            rank: 0,
        }
    }

    /// Returns a copy of this score with the given rank.
    pub fn ranked(&self, rank: u32) -> Self {
        Self {
            rank,
            ..self.clone()
        }
    }
}

/// Inclusive range of values a leaderboard accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl ScoreRange {
    /// Creates a range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` lies inside the range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns true if `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::new(f64::MIN, f64::MAX)
    }
}

/// Static description of a leaderboard, taken from game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardDescriptor {
    /// Stable leaderboard identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Suffix used when the value is exactly one, e.g. `"point"`.
    #[serde(default)]
    pub score_format_suffix_singular: String,
    /// Suffix used otherwise, e.g. `"points"`.
    #[serde(default)]
    pub score_format_suffix_plural: String,
    /// Accepted score values.
    #[serde(default)]
    pub score_range: ScoreRange,
}

impl LeaderboardDescriptor {
    /// Creates a descriptor with empty suffixes and an unbounded range.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score_format_suffix_singular: String::new(),
            score_format_suffix_plural: String::new(),
            score_range: ScoreRange::default(),
        }
    }

    /// Sets the singular and plural suffixes.
    pub fn with_suffixes(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.score_format_suffix_singular = singular.into();
        self.score_format_suffix_plural = plural.into();
        self
    }

    /// Sets the accepted score range.
    pub fn with_score_range(mut self, range: ScoreRange) -> Self {
        self.score_range = range;
        self
    }

    /// Formats a value with the matching suffix.
    pub fn format_score(&self, value: f64) -> String {
        let number = if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{:.2}", value)
        };
        let suffix = if value == 1.0 {
            &self.score_format_suffix_singular
        } else {
            &self.score_format_suffix_plural
        };
        if suffix.is_empty() {
            number
        } else {
            format!("{} {}", number, suffix)
        }
    }
}

/// Which players a leaderboard query covers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerScope {
    /// Every player.
    #[default]
    Global,
    /// Only the listed players.
    Players(Vec<String>),
}

impl PlayerScope {
    /// Returns true if the scope covers `player_id`.
    pub fn includes(&self, player_id: &str) -> bool {
        match self {
            PlayerScope::Global => true,
            PlayerScope::Players(ids) => ids.iter().any(|id| id == player_id),
        }
    }
}

/// Which time window a leaderboard query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeScope {
    /// The last 24 hours.
    Today,
    /// The last 7 days.
    Week,
    /// No time restriction.
    #[default]
    AllTime,
}

impl TimeScope {
    /// Returns the earliest date inside this scope, relative to `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeScope::Today => Some(now - Duration::days(1)),
            TimeScope::Week => Some(now - Duration::days(7)),
            TimeScope::AllTime => None,
        }
    }

    /// Returns true if `date` falls inside this scope.
    pub fn includes(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).map_or(true, |cutoff| date >= cutoff)
    }
}

/// A window of ranks, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRange {
    /// First rank to return (1-based).
    pub start: u32,
    /// Maximum number of entries.
    pub length: u32,
}

impl RankRange {
    /// Creates a range. A `start` of 0 is treated as 1.
    pub fn new(start: u32, length: u32) -> Self {
        Self {
            start: start.max(1),
            length,
        }
    }

    /// Returns true if `rank` is inside the window.
    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.start && rank < self.start.saturating_add(self.length)
    }
}

impl Default for RankRange {
    fn default() -> Self {
        Self::new(1, 25)
    }
}

/// A leaderboard query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreQuery {
    /// Players to include.
    pub player_scope: PlayerScope,
    /// Time window.
    pub time_scope: TimeScope,
    /// Rank window.
    pub range: RankRange,
}

impl ScoreQuery {
    /// Creates a query.
    pub fn new(player_scope: PlayerScope, time_scope: TimeScope, range: RankRange) -> Self {
        Self {
            player_scope,
            time_scope,
            range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uses_singular_for_one() {
        let board = LeaderboardDescriptor::new("high", "High Scores").with_suffixes("point", "points");

        assert_eq!(board.format_score(1.0), "1 point");
        assert_eq!(board.format_score(12.0), "12 points");
        assert_eq!(board.format_score(0.0), "0 points");
        assert_eq!(board.format_score(2.5), "2.50 points");
    }

    #[test]
    fn format_without_suffix() {
        let board = LeaderboardDescriptor::new("time", "Best Time");
        assert_eq!(board.format_score(42.0), "42");
    }

    #[test]
    fn score_range_bounds() {
        let range = ScoreRange::new(0.0, 100.0);
        assert!(range.contains(0.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(100.5));
        assert!(!range.contains(-1.0));
        assert!(!ScoreRange::new(5.0, 1.0).is_valid());
    }

    #[test]
    fn time_scope_cutoffs() {
        let now = Utc::now();
        let yesterday = now - Duration::hours(23);
        let last_month = now - Duration::days(30);

        assert!(TimeScope::Today.includes(yesterday, now));
        assert!(!TimeScope::Today.includes(last_month, now));
        assert!(TimeScope::Week.includes(now - Duration::days(6), now));
        assert!(!TimeScope::Week.includes(last_month, now));
        assert!(TimeScope::AllTime.includes(last_month, now));
    }

    #[test]
    fn rank_range_window() {
        let range = RankRange::new(0, 3);
        assert_eq!(range.start, 1);
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(4));
    }

    #[test]
    fn player_scope_membership() {
        let scope = PlayerScope::Players(vec!["p1".into(), "p2".into()]);
        assert!(scope.includes("p2"));
        assert!(!scope.includes("p3"));
        assert!(PlayerScope::Global.includes("anyone"));
    }
}
