//! Observers for asserting on engine events.

use laurel_engine::{
    EngineEvent, EngineObserver, ObserverResult, ReconciliationEngine, RemoteGateway,
};
use laurel_protocol::{AchievementRecord, PlayerIdentity};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every event it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder and registers it with `engine`.
    ///
    /// Keep the returned `Arc`: the engine holds only a weak handle.
    pub fn attach<G: RemoteGateway>(engine: &mut ReconciliationEngine<G>) -> Arc<Self> {
        let observer = Arc::new(Self::new());
        engine.add_observer(&observer);
        observer
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded event names.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(EngineEvent::name).collect()
    }

    /// Returns how many events named `name` were recorded.
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    /// Returns the ids of completed achievements, in order.
    pub fn completed_ids(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Completed(record) => Some(record.id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: EngineEvent) -> ObserverResult {
        self.events.lock().push(event);
        Ok(())
    }
}

impl EngineObserver for RecordingObserver {
    fn on_authenticated(&self, player: &PlayerIdentity) -> ObserverResult {
        self.push(EngineEvent::Authenticated(player.clone()))
    }

    fn on_progressed(&self, achievement: &AchievementRecord) -> ObserverResult {
        self.push(EngineEvent::Progressed(achievement.clone()))
    }

    fn on_completed(&self, achievement: &AchievementRecord) -> ObserverResult {
        self.push(EngineEvent::Completed(achievement.clone()))
    }

    fn on_loaded(&self) -> ObserverResult {
        self.push(EngineEvent::Loaded)
    }

    fn on_reset(&self) -> ObserverResult {
        self.push(EngineEvent::Reset)
    }
}

/// Fails every callback, optionally by panicking.
#[derive(Debug, Default)]
pub struct FailingObserver {
    panics: bool,
}

impl FailingObserver {
    /// Returns errors from every callback.
    pub fn erroring() -> Self {
        Self { panics: false }
    }

    /// Panics in every callback.
    pub fn panicking() -> Self {
        Self { panics: true }
    }

    fn fail(&self, event: &str) -> ObserverResult {
        if self.panics {
            panic!("observer panicked on {event}");
        }
        Err(format!("observer rejected {event}").into())
    }
}

impl EngineObserver for FailingObserver {
    fn on_authenticated(&self, _player: &PlayerIdentity) -> ObserverResult {
        self.fail("authenticated")
    }

    fn on_progressed(&self, _achievement: &AchievementRecord) -> ObserverResult {
        self.fail("progressed")
    }

    fn on_completed(&self, _achievement: &AchievementRecord) -> ObserverResult {
        self.fail("completed")
    }

    fn on_loaded(&self) -> ObserverResult {
        self.fail("loaded")
    }

    fn on_reset(&self) -> ObserverResult {
        self.fail("reset")
    }
}
