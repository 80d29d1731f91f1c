//! Property-based test generators using proptest.
//!
//! Ids are drawn from the sample game so generated operations always hit
//! the configured universe unless a strategy says otherwise.

use crate::fixtures::{ACHIEVEMENT_IDS, HIGH_SCORES};
use laurel_protocol::{ScoreRecord, Snapshot};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for picking a configured achievement id.
pub fn achievement_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(ACHIEVEMENT_IDS.to_vec()).prop_map(str::to_string)
}

/// Strategy for ids that are not configured.
pub fn unknown_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("unknown_[a-z]{1,8}").expect("Invalid regex")
}

/// Strategy for percentages already inside `[0, 100]`.
pub fn percentage_strategy() -> impl Strategy<Value = f64> {
    0.0..=100.0f64
}

/// Strategy for reported values, including some outside `[0, 100]`.
pub fn reported_value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => percentage_strategy(),
        1 => -50.0..0.0f64,
        1 => 100.0..500.0f64,
        1 => Just(100.0),
    ]
}

/// Strategy for a sequence of `(id, value)` progress reports.
pub fn report_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec(
        (achievement_id_strategy(), reported_value_strategy()),
        0..=max_len,
    )
}

/// Strategy for id to percentage maps over the configured ids.
///
/// Ids may be missing, like a remote copy that never saw them.
pub fn progress_map_strategy() -> impl Strategy<Value = BTreeMap<String, f64>> {
    prop::collection::btree_map(achievement_id_strategy(), percentage_strategy(), 0..=3)
}

/// Strategy for scores accepted by the sample leaderboard.
pub fn score_value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![(0u32..100_000).prop_map(f64::from), 0.0..1_000_000.0f64]
}

/// Strategy for snapshots holding achievements only, as older builds wrote.
pub fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (progress_map_strategy(), prop::option::of("[a-z]{1,8}"))
        .prop_map(|(achievements, player_id)| Snapshot {
            player_id,
            ..Snapshot::from_achievements(achievements)
        })
}

/// Strategy for queued scores on the sample leaderboard.
pub fn queued_scores_strategy(max_len: usize) -> impl Strategy<Value = Vec<ScoreRecord>> {
    prop::collection::vec(score_value_strategy(), 0..=max_len).prop_map(|values| {
        values
            .into_iter()
            .map(|value| {
                ScoreRecord::new(
                    "local",
                    HIGH_SCORES,
                    Default::default(),
                    value,
                    value.to_string(),
                )
            })
            .collect()
    })
}
