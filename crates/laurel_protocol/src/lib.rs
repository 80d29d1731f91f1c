//! # Laurel Protocol
//!
//! Record types and wire shapes shared by the Laurel sync engine and its
//! remote gateways.
//!
//! This crate provides:
//! - `AchievementRecord` and `AchievementDescriptor`
//! - `ScoreRecord`, `LeaderboardDescriptor` and leaderboard query types
//! - `Snapshot`, the logical save/load shape, with CBOR and JSON helpers
//! - Gateway messages (`PlayerIdentity`, submission batches and responses)
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod achievement;
mod error;
mod messages;
mod score;
mod snapshot;

pub use achievement::{clamp_percentage, AchievementDescriptor, AchievementRecord, COMPLETE};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    AchievementBatch, AchievementSubmission, ItemStatus, PlayerIdentity, ScoreBatch,
    SubmitResponse,
};
pub use score::{
    LeaderboardDescriptor, PlayerScope, RankRange, ScoreQuery, ScoreRange, ScoreRecord, TimeScope,
};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
