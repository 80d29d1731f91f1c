//! Scores recorded on this device, per leaderboard.

use chrono::{DateTime, Utc};
use laurel_protocol::{
    LeaderboardDescriptor, PlayerScope, RankRange, ScoreQuery, ScoreRecord, TimeScope,
};
use std::collections::HashMap;

/// A configured leaderboard and the scores recorded locally for it.
///
/// Queries rank each player's best score in the window, highest value
/// first; ties go to the earlier score.
///
/// With a retention limit, a player over the limit loses their oldest score
/// that is not their best, so all-time and recent windows both stay served.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    descriptor: LeaderboardDescriptor,
    scores: Vec<ScoreRecord>,
    retention: Option<usize>,
}

impl Leaderboard {
    /// Creates an empty leaderboard.
    pub fn new(descriptor: LeaderboardDescriptor) -> Self {
        Self {
            descriptor,
            scores: Vec::new(),
            retention: None,
        }
    }

    /// Keeps at most `per_player` scores for each player (at least one).
    pub fn with_retention(mut self, per_player: usize) -> Self {
        self.retention = Some(per_player.max(1));
        self
    }

    /// Returns the leaderboard id.
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Returns the configuration entry.
    pub fn descriptor(&self) -> &LeaderboardDescriptor {
        &self.descriptor
    }

    /// Builds a score for this leaderboard without recording it.
    pub fn make_score(&self, player_id: &str, value: f64, date: DateTime<Utc>) -> ScoreRecord {
        ScoreRecord::new(
            player_id,
            self.descriptor.id.clone(),
            date,
            value,
            self.descriptor.format_score(value),
        )
    }

    /// Records a score. Returns false if the value is outside the range.
    pub fn add_score(&mut self, player_id: &str, value: f64, date: DateTime<Utc>) -> bool {
        if !self.descriptor.score_range.contains(value) {
            return false;
        }
        let score = self.make_score(player_id, value, date);
        self.scores.push(score);
        self.enforce_retention(player_id);
        true
    }

    /// Records an already built score, ignoring it if it belongs elsewhere.
    pub fn insert(&mut self, score: ScoreRecord) {
        if score.leaderboard_id == self.descriptor.id {
            let player_id = score.player_id.clone();
            self.scores.push(score);
            self.enforce_retention(&player_id);
        }
    }

    /// Re-attributes scores from `from` to `to`. Returns how many changed.
    pub fn restamp(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for score in self.scores.iter_mut().filter(|s| s.player_id == from) {
            score.player_id = to.to_string();
            changed += 1;
        }
        if changed > 0 {
            self.enforce_retention(to);
        }
        changed
    }

    fn enforce_retention(&mut self, player_id: &str) {
        let Some(limit) = self.retention else {
            return;
        };
        loop {
            let mine: Vec<usize> = (0..self.scores.len())
                .filter(|&i| self.scores[i].player_id == player_id)
                .collect();
            if mine.len() <= limit {
                return;
            }
            let best = mine.iter().copied().reduce(|best, i| {
                let (a, b) = (&self.scores[best], &self.scores[i]);
                if b.value > a.value || (b.value == a.value && b.date < a.date) {
                    i
                } else {
                    best
                }
            });
            let oldest = mine
                .iter()
                .copied()
                .filter(|&i| Some(i) != best)
                .min_by_key(|&i| self.scores[i].date);
            match oldest {
                Some(index) => {
                    self.scores.remove(index);
                }
                None => return,
            }
        }
    }

    /// Drops every recorded score.
    pub fn remove_all_scores(&mut self) {
        self.scores.clear();
    }

    /// Returns every recorded score in insertion order, unranked.
    pub fn all_scores(&self) -> &[ScoreRecord] {
        &self.scores
    }

    /// Returns the number of recorded scores.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Runs a ranked query relative to `now`.
    pub fn query(&self, query: &ScoreQuery, now: DateTime<Utc>) -> Vec<ScoreRecord> {
        let mut best: HashMap<&str, &ScoreRecord> = HashMap::new();
        for score in &self.scores {
            if !query.player_scope.includes(&score.player_id)
                || !query.time_scope.includes(score.date, now)
            {
                continue;
            }
            best.entry(score.player_id.as_str())
                .and_modify(|current| {
                    if score.value > current.value
                        || (score.value == current.value && score.date < current.date)
                    {
                        *current = score;
                    }
                })
                .or_insert(score);
        }

        let mut ranked: Vec<&ScoreRecord> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.ranked(i as u32 + 1))
            .filter(|s| query.range.contains(s.rank))
            .collect()
    }

    /// Ranked scores for the listed players.
    pub fn scores_for_players(
        &self,
        player_ids: &[String],
        time_scope: TimeScope,
        range: RankRange,
        now: DateTime<Utc>,
    ) -> Vec<ScoreRecord> {
        let query = ScoreQuery::new(PlayerScope::Players(player_ids.to_vec()), time_scope, range);
        self.query(&query, now)
    }
}
