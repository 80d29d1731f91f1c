//! Reset command implementation.

use super::{open_engine, save_engine, CommandResult};
use std::path::Path;

/// Runs the reset command.
///
/// Only the local copy is cleared. The snapshot records that its owner still
/// owes a remote reset, which the game sends before its next sync.
pub fn run(config: &Path, snapshot: &Path) -> CommandResult<()> {
    let cleared = apply(config, snapshot)?;
    println!("Reset {cleared} achievement(s)");
    Ok(())
}

/// Zeroes every achievement and writes the snapshot back.
///
/// Returns how many achievements had progress.
pub fn apply(config: &Path, snapshot: &Path) -> CommandResult<usize> {
    let mut engine = open_engine(config, snapshot)?;
    let cleared = engine
        .achievements()
        .iter()
        .filter(|a| a.percentage_completed > 0.0)
        .count();
    engine.reset_achievements();
    save_engine(&engine, snapshot)?;
    Ok(cleared)
}
