//! Sample configurations and engine helpers.
//!
//! The sample game has three achievements and one leaderboard, which is
//! enough to exercise every engine path.

use laurel_engine::{
    EngineConfig, GameConfig, MockGateway, OfflineGateway, ReconciliationEngine, RetryConfig,
};
use laurel_protocol::{LeaderboardDescriptor, PlayerIdentity, ScoreRange, Snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Achievement worth 10 points.
pub const FIRST_WIN: &str = "first_win";
/// Achievement worth 20 points.
pub const NO_DEATH: &str = "no_death";
/// Achievement worth 50 points.
pub const SPEED_RUN: &str = "speed_run";
/// Leaderboard accepting scores in `[0, 1_000_000]`.
pub const HIGH_SCORES: &str = "high_scores";

/// Every sample achievement id, in configuration order.
pub const ACHIEVEMENT_IDS: [&str; 3] = [FIRST_WIN, NO_DEATH, SPEED_RUN];

/// Returns the sample game configuration.
pub fn sample_game() -> GameConfig {
    GameConfig::new()
        .with_achievement(FIRST_WIN, 10)
        .with_achievement(NO_DEATH, 20)
        .with_achievement(SPEED_RUN, 50)
        .with_leaderboard(
            LeaderboardDescriptor::new(HIGH_SCORES, "High Scores")
                .with_suffixes("point", "points")
                .with_score_range(ScoreRange::new(0.0, 1_000_000.0)),
        )
}

/// Returns the sample game configuration as JSON, the way a host ships it.
pub fn sample_game_json() -> String {
    r#"{
  "achievements": [
    { "id": "first_win", "points": 10 },
    { "id": "no_death", "points": 20 },
    { "id": "speed_run", "points": 50 }
  ],
  "leaderboards": [
    {
      "id": "high_scores",
      "name": "High Scores",
      "score_format_suffix_singular": "point",
      "score_format_suffix_plural": "points",
      "score_range": { "min": 0.0, "max": 1000000.0 }
    }
  ]
}"#
    .to_string()
}

/// Returns an engine configuration that retries on every flush.
pub fn sample_config() -> EngineConfig {
    EngineConfig::new(sample_game()).with_retry(RetryConfig::immediate())
}

/// Creates an engine with no remote service.
pub fn offline_engine() -> ReconciliationEngine<OfflineGateway> {
    ReconciliationEngine::new(sample_config(), Arc::new(OfflineGateway))
        .expect("sample config is valid")
}

/// Creates an engine backed by a mock gateway, not yet authenticated.
pub fn mock_engine(player_id: &str) -> (ReconciliationEngine<MockGateway>, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::new(PlayerIdentity::new(player_id, player_id)));
    let engine = ReconciliationEngine::new(sample_config(), Arc::clone(&gateway))
        .expect("sample config is valid");
    (engine, gateway)
}

/// Creates an engine backed by a mock gateway and authenticates it.
pub fn online_engine(player_id: &str) -> (ReconciliationEngine<MockGateway>, Arc<MockGateway>) {
    let (mut engine, gateway) = mock_engine(player_id);
    engine
        .authenticate_local_player()
        .expect("mock gateway authenticates");
    (engine, gateway)
}

/// A snapshot file in a temporary directory, removed on drop.
pub struct TempSnapshot {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempSnapshot {
    /// Creates a temporary directory holding `file_name` (not yet written).
    pub fn new(file_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: temp_dir.path().join(file_name),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding the snapshot.
    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Writes `snapshot` as JSON.
    pub fn write_json(&self, snapshot: &Snapshot) {
        let text = snapshot.to_json().expect("Failed to encode snapshot");
        std::fs::write(&self.path, text).expect("Failed to write snapshot");
    }

    /// Reads the snapshot back as JSON.
    pub fn read_json(&self) -> Snapshot {
        let text = std::fs::read_to_string(&self.path).expect("Failed to read snapshot");
        Snapshot::from_json(&text).expect("Failed to decode snapshot")
    }
}

/// Runs `f` with a fresh temporary snapshot path.
pub fn with_temp_snapshot<F, R>(f: F) -> R
where
    F: FnOnce(&TempSnapshot) -> R,
{
    let snapshot = TempSnapshot::new("save.json");
    f(&snapshot)
}
