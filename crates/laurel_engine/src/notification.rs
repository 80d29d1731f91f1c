//! Pacing queue between completion events and an on-screen banner.

use crate::observer::{EngineObserver, ObserverResult};
use laurel_protocol::AchievementRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Queues completed achievements for a display that shows one at a time.
///
/// The engine may complete several achievements in one frame. Register this
/// queue as an observer, then drive it from the UI: `next_to_display` hands
/// out the next banner when none is showing, and `display_finished` retires
/// the current one and hands out the next.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<AchievementRecord>,
    showing: Option<AchievementRecord>,
}

impl NotificationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an achievement for display.
    pub fn notify(&self, achievement: AchievementRecord) {
        self.state.lock().waiting.push_back(achievement);
    }

    /// Starts displaying the next achievement if nothing is showing.
    pub fn next_to_display(&self) -> Option<AchievementRecord> {
        let mut state = self.state.lock();
        if state.showing.is_some() {
            return None;
        }
        let next = state.waiting.pop_front()?;
        state.showing = Some(next.clone());
        Some(next)
    }

    /// Retires the current banner and starts the next one, if any.
    pub fn display_finished(&self) -> Option<AchievementRecord> {
        self.state.lock().showing = None;
        self.next_to_display()
    }

    /// Returns the achievement currently on screen.
    pub fn showing(&self) -> Option<AchievementRecord> {
        self.state.lock().showing.clone()
    }

    /// Returns the number of achievements waiting behind the current one.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting.len()
    }
}

impl EngineObserver for NotificationQueue {
    fn on_completed(&self, achievement: &AchievementRecord) -> ObserverResult {
        self.notify(achievement.clone());
        Ok(())
    }

    fn on_reset(&self) -> ObserverResult {
        self.state.lock().waiting.clear();
        Ok(())
    }
}
