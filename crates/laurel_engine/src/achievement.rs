//! The achievement capability and its default implementation.

use laurel_protocol::{AchievementDescriptor, AchievementRecord};
use std::fmt;
use std::sync::Arc;

/// Capability set every stored achievement provides.
///
/// Games that need extra per-achievement state (unlock timestamps, hidden
/// flags, ...) implement this trait and plug a constructor into
/// [`EngineConfig::with_factory`](crate::EngineConfig::with_factory).
pub trait Achievement: Send + Sync + fmt::Debug {
    /// Stable identifier.
    fn identifier(&self) -> &str;

    /// Current completion in `[0, 100]`.
    fn percentage_completed(&self) -> f64;

    /// Overwrites the completion value. Only the engine calls this.
    fn set_percentage_completed(&mut self, percentage: f64);

    /// Point value.
    fn points(&self) -> i32;

    /// Called after a new value was accepted and queued for submission.
    fn progress_reported(&mut self) {}

    /// Called after the remote service confirmed the queued value.
    fn progress_flushed(&mut self) {}

    /// Returns a data copy of the achievement.
    fn record(&self) -> AchievementRecord {
        AchievementRecord {
            id: self.identifier().to_string(),
            percentage_completed: self.percentage_completed(),
            points: self.points(),
        }
    }
}

/// Builds an achievement from its configuration entry.
pub type AchievementFactory =
    Arc<dyn Fn(&AchievementDescriptor) -> Box<dyn Achievement> + Send + Sync>;

/// Returns the factory producing [`StandardAchievement`]s.
pub fn standard_factory() -> AchievementFactory {
    Arc::new(
        |descriptor: &AchievementDescriptor| -> Box<dyn Achievement> {
            Box::new(StandardAchievement::from_descriptor(descriptor))
        },
    )
}

/// The default achievement: id, percentage and points, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardAchievement {
    identifier: String,
    percentage_completed: f64,
    points: i32,
}

impl StandardAchievement {
    /// Creates an achievement with zero progress.
    pub fn new(identifier: impl Into<String>, points: i32) -> Self {
        Self {
            identifier: identifier.into(),
            percentage_completed: 0.0,
            points,
        }
    }

    /// Creates an achievement from a descriptor.
    pub fn from_descriptor(descriptor: &AchievementDescriptor) -> Self {
        Self::new(descriptor.id.clone(), descriptor.points)
    }
}

impl Achievement for StandardAchievement {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn percentage_completed(&self) -> f64 {
        self.percentage_completed
    }

    fn set_percentage_completed(&mut self, percentage: f64) {
        self.percentage_completed = percentage;
    }

    fn points(&self) -> i32 {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_factory_builds_zeroed_records() {
        let factory = standard_factory();
        let achievement = factory(&AchievementDescriptor::new("no_death", 20));

        assert_eq!(achievement.identifier(), "no_death");
        assert_eq!(achievement.points(), 20);
        assert_eq!(achievement.percentage_completed(), 0.0);
    }

    #[test]
    fn record_copies_state() {
        let mut achievement = StandardAchievement::new("first_win", 10);
        achievement.set_percentage_completed(55.0);

        let record = achievement.record();
        assert_eq!(record, AchievementRecord::new("first_win", 10).with_percentage(55.0));
    }
}
