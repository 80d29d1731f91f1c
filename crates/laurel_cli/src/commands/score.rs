//! Score command implementation.

use super::{open_engine, save_engine, CommandResult};
use chrono::Utc;
use laurel_protocol::ScoreRecord;
use std::path::Path;

/// Runs the score command.
pub fn run(
    config: &Path,
    snapshot: &Path,
    leaderboard: &str,
    value: f64,
    player: Option<&str>,
) -> CommandResult<()> {
    let record = apply(config, snapshot, leaderboard, value, player)?;
    println!(
        "{}: {} for {}",
        record.leaderboard_id, record.formatted_value, record.player_id
    );
    Ok(())
}

/// Records a score and writes the snapshot back.
pub fn apply(
    config: &Path,
    snapshot: &Path,
    leaderboard: &str,
    value: f64,
    player: Option<&str>,
) -> CommandResult<ScoreRecord> {
    let mut engine = open_engine(config, snapshot)?;
    let record = match player {
        Some(player) => engine.report_score_for(player, value, leaderboard, Utc::now())?,
        None => engine.report_score(value, leaderboard)?,
    };
    save_engine(&engine, snapshot)?;
    Ok(record)
}
