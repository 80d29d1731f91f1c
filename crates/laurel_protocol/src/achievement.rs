//! Achievement records and descriptors.

use serde::{Deserialize, Serialize};

/// Percentage at which an achievement counts as completed.
pub const COMPLETE: f64 = 100.0;

/// Static description of an achievement, taken from game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDescriptor {
    /// Stable achievement identifier.
    pub id: String,
    /// Point value shown to the player.
    #[serde(default)]
    pub points: i32,
}

impl AchievementDescriptor {
    /// Creates a new descriptor.
    pub fn new(id: impl Into<String>, points: i32) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }
}

/// The observable state of a single achievement.
///
/// This is the payload carried by engine events. It is a copy: mutating it
/// has no effect on the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementRecord {
    /// Stable achievement identifier.
    pub id: String,
    /// Completion in the range `[0, 100]`.
    pub percentage_completed: f64,
    /// Point value, informational only.
    pub points: i32,
}

impl AchievementRecord {
    /// Creates a record with zero progress.
    pub fn new(id: impl Into<String>, points: i32) -> Self {
        Self {
            id: id.into(),
            percentage_completed: 0.0,
            points,
        }
    }

    /// Creates a record from a descriptor.
    pub fn from_descriptor(descriptor: &AchievementDescriptor) -> Self {
        Self::new(descriptor.id.clone(), descriptor.points)
    }

    /// Returns the record with the given progress.
    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage_completed = percentage;
        self
    }

    /// Returns true once the achievement has reached 100%.
    pub fn is_completed(&self) -> bool {
        self.percentage_completed >= COMPLETE
    }
}

/// Clamps a reported percentage into `[0, 100]`.
///
/// Returns `None` for NaN, which cannot be ordered against stored progress.
pub fn clamp_percentage(percentage: f64) -> Option<f64> {
    if percentage.is_nan() {
        None
    } else {
        Some(percentage.clamp(0.0, COMPLETE))
    }
}
