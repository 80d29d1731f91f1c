//! Configuration for the reconciliation engine.

use crate::achievement::{standard_factory, AchievementFactory};
use crate::error::{EngineError, EngineResult};
use laurel_protocol::{AchievementDescriptor, LeaderboardDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// The fixed universe of achievements and leaderboards a game declares.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameConfig {
    /// Known achievements, in display order.
    #[serde(default)]
    pub achievements: Vec<AchievementDescriptor>,
    /// Known leaderboards, in display order.
    #[serde(default)]
    pub leaderboards: Vec<LeaderboardDescriptor>,
}

impl GameConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an achievement.
    pub fn with_achievement(mut self, id: impl Into<String>, points: i32) -> Self {
        self.achievements.push(AchievementDescriptor::new(id, points));
        self
    }

    /// Adds a leaderboard.
    pub fn with_leaderboard(mut self, leaderboard: LeaderboardDescriptor) -> Self {
        self.leaderboards.push(leaderboard);
        self
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| EngineError::Config(format!("malformed game config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that ids are non-empty and unique and score ranges are ordered.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for achievement in &self.achievements {
            if achievement.id.is_empty() {
                return Err(EngineError::Config("achievement with empty id".into()));
            }
            if !seen.insert(achievement.id.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate achievement id: {}",
                    achievement.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for leaderboard in &self.leaderboards {
            if leaderboard.id.is_empty() {
                return Err(EngineError::Config("leaderboard with empty id".into()));
            }
            if !seen.insert(leaderboard.id.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate leaderboard id: {}",
                    leaderboard.id
                )));
            }
            if !leaderboard.score_range.is_valid() {
                return Err(EngineError::Config(format!(
                    "leaderboard {} has min > max",
                    leaderboard.id
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for the reconciliation engine.
#[derive(Clone)]
pub struct EngineConfig {
    /// Achievement and leaderboard universe.
    pub game: GameConfig,
    /// Whether the platform offers a remote service at all.
    pub sync_supported: bool,
    /// Whether this session may talk to the remote service.
    pub sync_enabled: bool,
    /// Player id stamped on scores recorded before anyone authenticates.
    pub local_player_id: String,
    /// Maximum number of achievements per submission batch.
    pub submit_batch_size: usize,
    /// Scores each player keeps per local leaderboard.
    pub scores_kept_per_player: usize,
    /// Retry configuration for failed submissions.
    pub retry: RetryConfig,
    /// Constructor for stored achievements.
    pub factory: AchievementFactory,
}

impl EngineConfig {
    /// Creates a configuration with sync supported and enabled.
    pub fn new(game: GameConfig) -> Self {
        Self {
            game,
            sync_supported: true,
            sync_enabled: true,
            local_player_id: "local".into(),
            submit_batch_size: 100,
            scores_kept_per_player: 25,
            retry: RetryConfig::default(),
            factory: standard_factory(),
        }
    }

    /// Sets whether the platform supports remote sync.
    pub fn with_sync_supported(mut self, supported: bool) -> Self {
        self.sync_supported = supported;
        self
    }

    /// Sets whether remote sync starts enabled.
    pub fn with_sync_enabled(mut self, enabled: bool) -> Self {
        self.sync_enabled = enabled;
        self
    }

    /// Sets the player id used for scores recorded offline.
    pub fn with_local_player_id(mut self, player_id: impl Into<String>) -> Self {
        self.local_player_id = player_id.into();
        self
    }

    /// Sets the submission batch size. Zero is treated as one.
    pub fn with_submit_batch_size(mut self, size: usize) -> Self {
        self.submit_batch_size = size.max(1);
        self
    }

    /// Sets how many scores each player keeps per local leaderboard. Zero
    /// is treated as one.
    pub fn with_scores_kept_per_player(mut self, count: usize) -> Self {
        self.scores_kept_per_player = count.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the achievement constructor.
    pub fn with_factory(mut self, factory: AchievementFactory) -> Self {
        self.factory = factory;
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("game", &self.game)
            .field("sync_supported", &self.sync_supported)
            .field("sync_enabled", &self.sync_enabled)
            .field("local_player_id", &self.local_player_id)
            .field("submit_batch_size", &self.submit_batch_size)
            .field("scores_kept_per_player", &self.scores_kept_per_player)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Configuration for retry behavior.
///
/// Failed submissions are never dropped. After `max_attempts` consecutive
/// failures an item is parked and retried only once per `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Consecutive failures before an item is parked.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on any delay, and the retry period of parked items.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to spread retries of different items apart.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration that retries on every flush.
    pub fn immediate() -> Self {
        Self {
            max_attempts: u32::MAX,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier. Values below one (and NaN) are treated
    /// as one.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Returns true once `failures` consecutive failures park an item.
    pub fn is_parked(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    /// Calculates how long to wait after `failures` consecutive failures of
    /// the item identified by `key`.
    pub fn delay_after_failures(&self, key: &str, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        if self.is_parked(failures) {
            return self.max_delay;
        }

        let multiplier = if self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let max_secs = self.max_delay.as_secs_f64();
        let base = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);
        // NaN (zero times infinity) falls through to the cap.
        let mut delay_secs = base.min(max_secs);

        if self.add_jitter {
            // Up to 25%, derived from the key so retries of different ids spread out.
            delay_secs = (delay_secs * (1.0 + 0.25 * key_jitter(key, failures))).min(max_secs);
        }

        Duration::try_from_secs_f64(delay_secs)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns when the next attempt may run after `failures` failures.
    ///
    /// Delays too long for the platform clock are shortened to
    /// [`LONGEST_WAIT`].
    pub fn next_attempt_at(&self, key: &str, failures: u32, now: Instant) -> Instant {
        let delay = self.delay_after_failures(key, failures);
        now.checked_add(delay)
            .or_else(|| now.checked_add(LONGEST_WAIT))
            .unwrap_or(now)
    }
}

/// Ceiling applied when a retry delay would overflow [`Instant`].
pub const LONGEST_WAIT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

fn key_jitter(key: &str, failures: u32) -> f64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    failures.hash(&mut hasher);
    (hasher.finish() % 1000) as f64 / 1000.0
}
