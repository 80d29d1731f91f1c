//! Local achievement store.

use crate::achievement::{Achievement, AchievementFactory};
use laurel_protocol::{clamp_percentage, AchievementDescriptor, AchievementRecord};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Counts reported by [`LocalStore::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries applied to known achievements.
    pub restored: usize,
    /// Entries skipped (unknown id or unusable value).
    pub skipped: usize,
}

/// Owns exactly one achievement per configured id.
///
/// The id universe is fixed at construction; nothing is ever added or
/// removed afterwards.
#[derive(Debug)]
pub struct LocalStore {
    achievements: Vec<Box<dyn Achievement>>,
    index: HashMap<String, usize>,
}

impl LocalStore {
    /// Creates a store with one zeroed achievement per descriptor.
    ///
    /// Descriptors are expected to be validated already; a repeated id keeps
    /// its first entry.
    pub fn new(descriptors: &[AchievementDescriptor], factory: &AchievementFactory) -> Self {
        let mut achievements: Vec<Box<dyn Achievement>> = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if index.contains_key(&descriptor.id) {
                continue;
            }
            index.insert(descriptor.id.clone(), achievements.len());
            achievements.push(factory(descriptor));
        }

        Self {
            achievements,
            index,
        }
    }

    /// Returns true if `id` belongs to the configured universe.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the achievement for `id`.
    pub fn get(&self, id: &str) -> Option<&dyn Achievement> {
        self.index.get(id).map(|&i| self.achievements[i].as_ref())
    }

    /// Returns the achievement for `id` mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Achievement + 'static)> {
        match self.index.get(id) {
            Some(&i) => Some(self.achievements[i].as_mut()),
            None => None,
        }
    }

    /// Returns the current percentage for `id`.
    pub fn percentage(&self, id: &str) -> Option<f64> {
        self.get(id).map(|a| a.percentage_completed())
    }

    /// Returns every record in configuration order.
    pub fn records(&self) -> Vec<AchievementRecord> {
        self.achievements.iter().map(|a| a.record()).collect()
    }

    /// Iterates over ids in configuration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.achievements.iter().map(|a| a.identifier())
    }

    /// Returns the number of configured achievements.
    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    /// Returns true if no achievements are configured.
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }

    /// Replaces every percentage with the snapshot's value.
    ///
    /// Ids missing from the snapshot become 0%. Unknown ids and non-finite
    /// values are skipped; out-of-range values are clamped.
    pub fn load(&mut self, snapshot: &BTreeMap<String, f64>) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for achievement in &mut self.achievements {
            achievement.set_percentage_completed(0.0);
        }

        for (id, &value) in snapshot {
            let Some(percentage) = Some(value)
                .filter(|v| v.is_finite())
                .and_then(clamp_percentage)
            else {
                debug!(id = %id, "skipping unusable snapshot value");
                summary.skipped += 1;
                continue;
            };
            match self.get_mut(id) {
                Some(achievement) => {
                    achievement.set_percentage_completed(percentage);
                    summary.restored += 1;
                }
                None => {
                    debug!(id = %id, "skipping unknown achievement in snapshot");
                    summary.skipped += 1;
                }
            }
        }

        summary
    }

    /// Returns id to percentage for every configured achievement.
    pub fn save(&self) -> BTreeMap<String, f64> {
        self.achievements
            .iter()
            .map(|a| (a.identifier().to_string(), a.percentage_completed()))
            .collect()
    }

    /// Sets every achievement back to 0%.
    pub fn reset_all(&mut self) {
        for achievement in &mut self.achievements {
            achievement.set_percentage_completed(0.0);
        }
    }
}
