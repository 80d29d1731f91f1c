//! Observer registry and engine events.

use laurel_protocol::{AchievementRecord, PlayerIdentity};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::warn;

/// Error an observer may return from a callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by observer callbacks.
pub type ObserverResult = Result<(), ObserverError>;

/// Receives engine events. Every callback defaults to doing nothing.
///
/// Callbacks run synchronously on the thread that drives the engine. A
/// callback that fails (or panics) is logged and skipped; the remaining
/// observers still receive the event.
pub trait EngineObserver: Send + Sync {
    /// A player authenticated with the remote service.
    fn on_authenticated(&self, _player: &PlayerIdentity) -> ObserverResult {
        Ok(())
    }

    /// An achievement's local percentage increased.
    fn on_progressed(&self, _achievement: &AchievementRecord) -> ObserverResult {
        Ok(())
    }

    /// An achievement reached 100%.
    fn on_completed(&self, _achievement: &AchievementRecord) -> ObserverResult {
        Ok(())
    }

    /// Local progress was reconciled against the remote service.
    fn on_loaded(&self) -> ObserverResult {
        Ok(())
    }

    /// All achievements were reset.
    fn on_reset(&self) -> ObserverResult {
        Ok(())
    }
}

/// An event fanned out to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// See [`EngineObserver::on_authenticated`].
    Authenticated(PlayerIdentity),
    /// See [`EngineObserver::on_progressed`].
    Progressed(AchievementRecord),
    /// See [`EngineObserver::on_completed`].
    Completed(AchievementRecord),
    /// See [`EngineObserver::on_loaded`].
    Loaded,
    /// See [`EngineObserver::on_reset`].
    Reset,
}

impl EngineEvent {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Authenticated(_) => "authenticated",
            EngineEvent::Progressed(_) => "progressed",
            EngineEvent::Completed(_) => "completed",
            EngineEvent::Loaded => "loaded",
            EngineEvent::Reset => "reset",
        }
    }

    fn deliver(&self, observer: &dyn EngineObserver) -> ObserverResult {
        match self {
            EngineEvent::Authenticated(player) => observer.on_authenticated(player),
            EngineEvent::Progressed(record) => observer.on_progressed(record),
            EngineEvent::Completed(record) => observer.on_completed(record),
            EngineEvent::Loaded => observer.on_loaded(),
            EngineEvent::Reset => observer.on_reset(),
        }
    }
}

/// Counts from a single fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Observers that handled the event.
    pub delivered: usize,
    /// Observers that returned an error or panicked.
    pub failed: usize,
}

/// Ordered set of non-owning observer handles.
///
/// Registration order is notification order. The registry never keeps an
/// observer alive: once the caller drops its last `Arc`, the handle is
/// pruned on the next fan-out.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Weak<dyn EngineObserver>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Returns false if it was already registered.
    pub fn add<O: EngineObserver + 'static>(&mut self, observer: &Arc<O>) -> bool {
        let handle: Weak<O> = Arc::downgrade(observer);
        let handle: Weak<dyn EngineObserver> = handle;
        if self.position(&handle).is_some() {
            return false;
        }
        self.observers.push(handle);
        true
    }

    /// Unregisters an observer. Returns false if it was not registered.
    pub fn remove<O: EngineObserver + 'static>(&mut self, observer: &Arc<O>) -> bool {
        let handle: Weak<O> = Arc::downgrade(observer);
        let handle: Weak<dyn EngineObserver> = handle;
        match self.position(&handle) {
            Some(index) => {
                self.observers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of live observers.
    pub fn len(&self) -> usize {
        self.observers.iter().filter(|o| o.strong_count() > 0).count()
    }

    /// Returns true if no live observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every handle.
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Delivers `event` to every live observer in registration order.
    pub fn emit(&mut self, event: &EngineEvent) -> Delivery {
        self.observers.retain(|o| o.strong_count() > 0);

        let mut delivery = Delivery::default();
        for (index, handle) in self.observers.iter().enumerate() {
            let Some(observer) = handle.upgrade() else {
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| event.deliver(observer.as_ref()))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(e)) => {
                    warn!(event = event.name(), observer = index, error = %e, "observer failed");
                    delivery.failed += 1;
                }
                Err(_) => {
                    warn!(event = event.name(), observer = index, "observer panicked");
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    fn position(&self, handle: &Weak<dyn EngineObserver>) -> Option<usize> {
        let target = handle.as_ptr() as *const ();
        self.observers
            .iter()
            .position(|o| o.as_ptr() as *const () == target)
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
