//! # Laurel Engine
//!
//! Offline-first achievement and leaderboard reconciliation.
//!
//! This crate provides:
//! - A local achievement store with a fixed id universe
//! - A pending queue of unconfirmed values with bounded retry and backoff
//! - Max-merge reconciliation against a remote service
//! - Local leaderboards with ranked queries
//! - Observer fan-out through non-owning handles
//! - A remote gateway abstraction with offline and mock implementations
//!
//! ## Architecture
//!
//! Local state always changes first. Every increase is queued and later
//! flushed to the [`RemoteGateway`]; values leave the queue only once the
//! service confirms them. After authentication the engine reconciles with
//! the remote copy, merging both sides when the player changed device.
//!
//! ## Key Invariants
//!
//! - Progress never decreases, and 100% is absorbing
//! - Nothing queued is dropped because of a remote failure
//! - A queued value is removed only when the exact value was confirmed
//! - Resets always complete locally

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod achievement;
mod config;
mod engine;
mod error;
mod gateway;
mod leaderboard;
mod notification;
mod observer;
mod queue;
mod state;
mod store;

pub use achievement::{standard_factory, Achievement, AchievementFactory, StandardAchievement};
pub use config::{EngineConfig, GameConfig, RetryConfig, LONGEST_WAIT};
pub use engine::ReconciliationEngine;
pub use error::{EngineError, EngineResult};
pub use gateway::{MockGateway, OfflineGateway, RemoteGateway};
pub use leaderboard::Leaderboard;
pub use notification::NotificationQueue;
pub use observer::{
    Delivery, EngineEvent, EngineObserver, ObserverError, ObserverRegistry, ObserverResult,
};
pub use queue::{FailedList, FailedSubmission, PendingQueue, QueuedScore, ScoreQueue};
pub use state::{
    FlushReport, FlushTicket, MergeReport, RemoteReset, ReportOutcome, SkipReason, SyncStats,
    SyncStatus,
};
pub use store::{LoadSummary, LocalStore};
