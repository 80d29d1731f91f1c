//! CLI command implementations.
//!
//! Every command runs the engine offline: progress is applied locally and
//! written back to the snapshot, ready to be flushed by the game later.

pub mod export;
pub mod inspect;
pub mod report;
pub mod reset;
pub mod score;

use laurel_engine::{EngineConfig, GameConfig, OfflineGateway, ReconciliationEngine};
use laurel_protocol::Snapshot;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result type shared by the commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Engine used by every command.
pub type OfflineEngine = ReconciliationEngine<OfflineGateway>;

/// Returns true if `path` should be read and written as CBOR.
pub fn is_cbor(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cbor"))
}

/// Reads a game configuration from JSON.
pub fn read_config(path: &Path) -> CommandResult<GameConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    Ok(GameConfig::from_json_str(&text)?)
}

/// Reads a snapshot. A missing file is an empty snapshot.
pub fn read_snapshot(path: &Path) -> CommandResult<Snapshot> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot yet, starting empty");
        return Ok(Snapshot::default());
    }
    if is_cbor(path) {
        let bytes = std::fs::read(path)?;
        Ok(Snapshot::from_cbor(&bytes)?)
    } else {
        let text = std::fs::read_to_string(path)?;
        Ok(Snapshot::from_json(&text)?)
    }
}

/// Writes a snapshot, as CBOR when `cbor` is set and JSON otherwise.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot, cbor: bool) -> CommandResult<()> {
    if cbor {
        std::fs::write(path, snapshot.to_cbor()?)?;
    } else {
        std::fs::write(path, snapshot.to_json()?)?;
    }
    debug!(path = %path.display(), cbor, "snapshot written");
    Ok(())
}

/// Builds an offline engine from a config file and loads the snapshot.
pub fn open_engine(config_path: &Path, snapshot_path: &Path) -> CommandResult<OfflineEngine> {
    let game = read_config(config_path)?;
    let config = EngineConfig::new(game).with_sync_supported(false);
    let mut engine = ReconciliationEngine::new(config, Arc::new(OfflineGateway))?;
    let summary = engine.load(&read_snapshot(snapshot_path)?);
    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "snapshot entries not in config were dropped");
    }
    Ok(engine)
}

/// Writes the engine state back to the snapshot path in its own format.
pub fn save_engine(engine: &OfflineEngine, snapshot_path: &Path) -> CommandResult<()> {
    write_snapshot(snapshot_path, &engine.save(), is_cbor(snapshot_path))
}
