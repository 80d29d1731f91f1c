//! Report command implementation.

use super::{open_engine, save_engine, CommandResult};
use laurel_engine::ReportOutcome;
use std::path::Path;

/// Runs the report command.
pub fn run(config: &Path, snapshot: &Path, id: &str, percentage: f64) -> CommandResult<()> {
    let outcome = apply(config, snapshot, id, percentage)?;
    match outcome {
        ReportOutcome::Unchanged => println!("{id}: unchanged"),
        ReportOutcome::Progressed => println!("{id}: progress recorded"),
        ReportOutcome::Completed => println!("{id}: completed"),
    }
    Ok(())
}

/// Records progress and writes the snapshot back when anything changed.
pub fn apply(
    config: &Path,
    snapshot: &Path,
    id: &str,
    percentage: f64,
) -> CommandResult<ReportOutcome> {
    let mut engine = open_engine(config, snapshot)?;
    let outcome = engine.report_progress(id, percentage)?;
    if outcome != ReportOutcome::Unchanged {
        save_engine(&engine, snapshot)?;
    }
    Ok(outcome)
}
