//! Sync flags, statistics and per-operation reports.

use laurel_protocol::AchievementBatch;
use std::time::Instant;

/// How the local cache relates to the remote account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// The platform offers a remote service.
    pub is_sync_supported: bool,
    /// This session may talk to the remote service.
    pub is_sync_enabled: bool,
    /// Local progress was reconciled since the current player authenticated.
    pub is_synced: bool,
    /// The authenticated player differs from the snapshot owner, so the next
    /// reconciliation merges both sides instead of trusting local progress.
    pub has_changed_device: bool,
}

impl SyncStatus {
    /// Returns true if remote calls are allowed at all.
    pub fn allows_remote(&self) -> bool {
        self.is_sync_supported && self.is_sync_enabled
    }
}

/// Why a flush did not talk to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The platform has no remote service.
    SyncUnsupported,
    /// Remote sync is switched off.
    SyncDisabled,
    /// No player has authenticated.
    NotAuthenticated,
    /// The gateway reports itself unreachable.
    GatewayUnavailable,
    /// An earlier reset-all has not reached the remote service yet.
    ResetOutstanding,
    /// Nothing is queued, or everything queued is waiting out a backoff.
    NothingDue,
}

/// Outcome of a single flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Items sent to the remote service.
    pub submitted: usize,
    /// Ids (or, for scores, leaderboard ids) the service confirmed.
    pub confirmed: Vec<String>,
    /// Ids the service did not confirm; they stay queued.
    pub failed: Vec<String>,
    /// Set when the flush was a no-op.
    pub skipped: Option<SkipReason>,
}

impl FlushReport {
    pub(crate) fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// Returns true if every submitted item was confirmed.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_none() && self.failed.is_empty()
    }
}

/// A batch handed out by `begin_flush` and settled by `complete_flush`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushTicket {
    /// The batch to send.
    pub batch: AchievementBatch,
}

/// What a progress report changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The value did not exceed the stored one.
    Unchanged,
    /// The value increased and was queued.
    Progressed,
    /// The value reached 100% for the first time.
    Completed,
}

/// Outcome of reconciling local progress with the remote service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Ids whose local value was raised to the remote one.
    pub raised_locally: Vec<String>,
    /// Ids queued because the local value exceeds the remote one.
    pub queued_for_remote: Vec<String>,
    /// Whether both sides were merged (device change) rather than only
    /// adopting higher remote values.
    pub merged_both_ways: bool,
}

/// What happened to the remote half of a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReset {
    /// The remote service cleared its copy.
    Succeeded,
    /// The remote call failed; local progress was cleared anyway.
    Failed(String),
    /// The remote service was not reachable.
    Skipped(SkipReason),
}

/// Statistics about engine activity.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Achievement flushes that reached the gateway.
    pub flushes: u64,
    /// Flushes skipped because the gateway was unreachable.
    pub flushes_skipped: u64,
    /// Achievement submissions sent.
    pub achievements_submitted: u64,
    /// Achievement submissions confirmed.
    pub achievements_confirmed: u64,
    /// Achievement submissions that failed.
    pub achievements_failed: u64,
    /// Scores sent.
    pub scores_submitted: u64,
    /// Scores confirmed.
    pub scores_confirmed: u64,
    /// Scores that failed.
    pub scores_failed: u64,
    /// Reconciliations with the remote service.
    pub merges: u64,
    /// Resets performed.
    pub resets: u64,
    /// Last time a flush reached the gateway.
    pub last_flush_time: Option<Instant>,
    /// Last remote error message.
    pub last_error: Option<String>,
}
