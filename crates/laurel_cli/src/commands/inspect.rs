//! Inspect command implementation.

use super::{open_engine, CommandResult, OfflineEngine};
use serde::Serialize;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Player the snapshot was saved under.
    pub player_id: Option<String>,
    /// Every configured achievement.
    pub achievements: Vec<AchievementRow>,
    /// Sum of points over completed achievements.
    pub points_earned: i32,
    /// Sum of points over every achievement.
    pub points_total: i32,
    /// Ids waiting for remote confirmation.
    pub pending: Vec<String>,
    /// Ids whose last submission failed.
    pub failed: Vec<String>,
    /// Scores waiting for remote confirmation.
    pub queued_scores: usize,
    /// Player whose remote progress still needs a reset.
    pub reset_pending_for: Option<String>,
    /// Local scores per leaderboard.
    pub leaderboards: Vec<LeaderboardRow>,
}

/// One achievement line.
#[derive(Debug, Serialize)]
pub struct AchievementRow {
    /// Achievement id.
    pub id: String,
    /// Completion percentage.
    pub percentage: f64,
    /// Point value.
    pub points: i32,
    /// Whether a newer value awaits submission.
    pub pending: bool,
}

/// One leaderboard line.
#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    /// Leaderboard id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Number of locally recorded scores.
    pub scores: usize,
    /// Best local score, formatted.
    pub best: Option<String>,
}

/// Runs the inspect command.
pub fn run(config: &Path, snapshot: &Path, format: &str) -> CommandResult<()> {
    let engine = open_engine(config, snapshot)?;
    let result = collect(&engine, snapshot);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Gathers everything shown by `inspect`.
pub fn collect(engine: &OfflineEngine, snapshot: &Path) -> InspectResult {
    let achievements: Vec<AchievementRow> = engine
        .achievements()
        .into_iter()
        .map(|a| AchievementRow {
            pending: engine.pending().contains(&a.id),
            percentage: a.percentage_completed,
            points: a.points,
            id: a.id,
        })
        .collect();

    let points_earned = achievements
        .iter()
        .filter(|a| a.percentage >= laurel_protocol::COMPLETE)
        .map(|a| a.points)
        .sum();
    let points_total = achievements.iter().map(|a| a.points).sum();

    let leaderboards = engine
        .leaderboards()
        .map(|board| LeaderboardRow {
            id: board.id().to_string(),
            name: board.descriptor().name.clone(),
            scores: board.len(),
            best: board
                .all_scores()
                .iter()
                .max_by(|a, b| a.value.total_cmp(&b.value))
                .map(|s| s.formatted_value.clone()),
        })
        .collect();

    InspectResult {
        path: snapshot.display().to_string(),
        player_id: engine.save().player_id,
        achievements,
        points_earned,
        points_total,
        pending: engine.pending().iter().map(|(id, _)| id.to_string()).collect(),
        failed: engine.failed().ids(),
        queued_scores: engine.queued_scores().len(),
        reset_pending_for: engine.pending_reset().map(str::to_string),
        leaderboards,
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Laurel Snapshot: {}", result.path);
    println!("═══════════════════════════════════════════");
    println!(
        "Player:           {}",
        result.player_id.as_deref().unwrap_or("(none)")
    );
    println!(
        "Points:           {} / {}",
        result.points_earned, result.points_total
    );
    println!();

    println!("Achievements:");
    println!("───────────────────────────────────────────");
    for row in &result.achievements {
        let marker = if row.pending { " *" } else { "" };
        println!(
            "  {:<24} {:>6.1}%  {:>4} pts{}",
            row.id, row.percentage, row.points, marker
        );
    }
    println!();

    println!("Sync queue:");
    println!("───────────────────────────────────────────");
    println!("  Pending:        {}", result.pending.len());
    println!("  Failed:         {}", result.failed.len());
    println!("  Queued scores:  {}", result.queued_scores);
    if let Some(player) = &result.reset_pending_for {
        println!("  Reset owed:     {}", player);
    }

    if !result.leaderboards.is_empty() {
        println!();
        println!("Leaderboards:");
        println!("───────────────────────────────────────────");
        for row in &result.leaderboards {
            println!(
                "  {:<24} {:>4} scores  best {}",
                row.name,
                row.scores,
                row.best.as_deref().unwrap_or("-")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::save_engine;
    use crate::commands::testing::Workspace;

    #[test]
    fn collect_reports_points_and_queues() {
        let ws = Workspace::new("save.json");
        let mut engine = open_engine(&ws.config, &ws.snapshot).unwrap();
        engine.report_progress("first_win", 100.0).unwrap();
        engine.report_progress("no_death", 40.0).unwrap();
        engine.report_score(12.0, "high_scores").unwrap();
        save_engine(&engine, &ws.snapshot).unwrap();

        let engine = open_engine(&ws.config, &ws.snapshot).unwrap();
        let result = collect(&engine, &ws.snapshot);
        assert_eq!(result.points_earned, 10);
        assert_eq!(result.points_total, 30);
        assert_eq!(result.pending, vec!["first_win", "no_death"]);
        assert_eq!(result.queued_scores, 1);
        assert_eq!(result.leaderboards[0].best.as_deref(), Some("12 points"));
        assert!(result.achievements.iter().all(|a| a.pending));
    }

    #[test]
    fn json_output_serializes() {
        let ws = Workspace::new("save.json");
        let engine = open_engine(&ws.config, &ws.snapshot).unwrap();
        let text = serde_json::to_string(&collect(&engine, &ws.snapshot)).unwrap();
        assert!(text.contains("\"points_total\":30"));
    }
}
