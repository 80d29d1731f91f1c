//! The reconciliation engine.
//!
//! ## Achievement path
//!
//! ```text
//! report_progress ──► LocalStore ──► PendingQueue ──► flush ──► RemoteGateway
//!                        │                              │
//!                        └──► observers                 └──► FailedList (retry)
//! ```
//!
//! Local state changes first and never waits on the remote service. A value
//! leaves the pending queue only once the service confirms exactly that
//! value; failures stay queued and are retried with backoff.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gateway::RemoteGateway;
use crate::leaderboard::Leaderboard;
use crate::observer::{EngineEvent, EngineObserver, ObserverRegistry};
use crate::queue::{FailedList, PendingQueue, ScoreQueue};
use crate::state::{
    FlushReport, FlushTicket, MergeReport, RemoteReset, ReportOutcome, SkipReason, SyncStats,
    SyncStatus,
};
use crate::store::{LoadSummary, LocalStore};
use chrono::{DateTime, Utc};
use laurel_protocol::{
    clamp_percentage, AchievementBatch, AchievementRecord, AchievementSubmission, ItemStatus,
    PlayerIdentity, ScoreBatch, ScoreQuery, ScoreRecord, Snapshot, SubmitResponse, COMPLETE,
    SNAPSHOT_VERSION,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Offline-first achievement and leaderboard engine.
///
/// The engine is owned by a single caller and takes `&mut self` for every
/// mutation. Remote calls go through `G`; when the gateway is unreachable
/// the engine keeps working locally and queues everything for later.
pub struct ReconciliationEngine<G: RemoteGateway> {
    config: EngineConfig,
    gateway: Arc<G>,
    store: LocalStore,
    pending: PendingQueue,
    failed: FailedList,
    scores: ScoreQueue,
    leaderboards: BTreeMap<String, Leaderboard>,
    observers: ObserverRegistry,
    status: SyncStatus,
    player: Option<PlayerIdentity>,
    snapshot_owner: Option<String>,
    reset_owed_to: Option<String>,
    next_batch_id: u64,
    stats: SyncStats,
}

impl<G: RemoteGateway> ReconciliationEngine<G> {
    /// Creates an engine with every achievement at 0%.
    pub fn new(config: EngineConfig, gateway: Arc<G>) -> EngineResult<Self> {
        config.game.validate()?;

        let store = LocalStore::new(&config.game.achievements, &config.factory);
        let leaderboards = config
            .game
            .leaderboards
            .iter()
            .map(|d| {
                let board =
                    Leaderboard::new(d.clone()).with_retention(config.scores_kept_per_player);
                (d.id.clone(), board)
            })
            .collect();
        let status = SyncStatus {
            is_sync_supported: config.sync_supported,
            is_sync_enabled: config.sync_enabled,
            is_synced: false,
            has_changed_device: false,
        };

        debug!(
            achievements = store.len(),
            leaderboards = config.game.leaderboards.len(),
            "engine created"
        );

        Ok(Self {
            config,
            gateway,
            store,
            pending: PendingQueue::new(),
            failed: FailedList::new(),
            scores: ScoreQueue::new(),
            leaderboards,
            observers: ObserverRegistry::new(),
            status,
            player: None,
            snapshot_owner: None,
            reset_owed_to: None,
            next_batch_id: 1,
            stats: SyncStats::default(),
        })
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Registers an observer. The engine keeps only a weak handle.
    pub fn add_observer<O: EngineObserver + 'static>(&mut self, observer: &Arc<O>) -> bool {
        self.observers.add(observer)
    }

    /// Unregisters an observer.
    pub fn remove_observer<O: EngineObserver + 'static>(&mut self, observer: &Arc<O>) -> bool {
        self.observers.remove(observer)
    }

    // ------------------------------------------------------------------
    // Authentication and reconciliation
    // ------------------------------------------------------------------

    /// Authenticates with the remote service and reconciles progress.
    ///
    /// A failed reconciliation is logged and leaves `is_synced` false; the
    /// authentication itself still succeeds.
    pub fn authenticate_local_player(&mut self) -> EngineResult<PlayerIdentity> {
        if !self.status.allows_remote() {
            return Err(EngineError::SyncDisabled);
        }

        let player = match self.gateway.authenticate() {
            Ok(player) => player,
            Err(e) => {
                warn!(error = %e, "authentication failed");
                self.stats.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.status.has_changed_device =
            self.snapshot_owner.as_deref() != Some(player.player_id.as_str());
        self.status.is_synced = false;
        self.player = Some(player.clone());
        let adopted = self.adopt_local_scores(&player.player_id);

        info!(
            player = %player.player_id,
            changed_device = self.status.has_changed_device,
            adopted_scores = adopted,
            "local player authenticated"
        );
        self.observers
            .emit(&EngineEvent::Authenticated(player.clone()));

        if let Err(e) = self.sync_with_remote() {
            warn!(error = %e, "reconciliation after authentication failed");
        }

        Ok(player)
    }

    /// Fetches remote progress and reconciles it with local progress.
    ///
    /// After a device change both sides are merged and ids where local is
    /// ahead are queued for submission. Otherwise only higher remote values
    /// are adopted.
    pub fn sync_with_remote(&mut self) -> EngineResult<MergeReport> {
        let player = self.remote_player().map_err(skip_error)?;
        self.deliver_outstanding_reset(&player)?;

        let remote = match self.gateway.fetch_remote_achievements(&player) {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "fetching remote achievements failed");
                self.stats.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let both_ways = self.status.has_changed_device;
        let report = self.reconcile(&remote, both_ways);
        self.status.has_changed_device = false;
        self.snapshot_owner = Some(player.player_id);
        Ok(report)
    }

    /// Max-merges remote progress into local progress in both directions.
    ///
    /// Every id ends at `max(local, remote)`; ids where local is ahead are
    /// queued for submission.
    pub fn merge_remote(&mut self, remote: &BTreeMap<String, f64>) -> MergeReport {
        self.reconcile(remote, true)
    }

    fn reconcile(&mut self, remote: &BTreeMap<String, f64>, both_ways: bool) -> MergeReport {
        let mut report = MergeReport {
            merged_both_ways: both_ways,
            ..MergeReport::default()
        };

        for id in remote.keys().filter(|id| !self.store.contains(id)) {
            debug!(id = %id, "ignoring unknown remote achievement");
        }

        let ids: Vec<String> = self.store.ids().map(str::to_string).collect();
        for id in ids {
            let remote_value = remote
                .get(&id)
                .copied()
                .filter(|v| v.is_finite())
                .and_then(clamp_percentage)
                .unwrap_or(0.0);
            let Some(achievement) = self.store.get_mut(&id) else {
                continue;
            };
            let local = achievement.percentage_completed();

            if remote_value > local {
                achievement.set_percentage_completed(remote_value);
                self.settle_if_covered(&id, remote_value);
                report.raised_locally.push(id);
            } else if both_ways && local > remote_value {
                self.pending.insert(id.as_str(), local);
                self.failed.make_due(&id);
                report.queued_for_remote.push(id);
            }
        }

        self.status.is_synced = true;
        self.stats.merges += 1;
        info!(
            raised = report.raised_locally.len(),
            queued = report.queued_for_remote.len(),
            both_ways,
            "achievements reconciled"
        );
        self.observers.emit(&EngineEvent::Loaded);
        report
    }

    /// Drops a queued value the remote service already holds.
    fn settle_if_covered(&mut self, id: &str, remote_value: f64) {
        if self.pending.is_in_flight(id) {
            return;
        }
        if let Some(queued) = self.pending.get(id) {
            if queued <= remote_value {
                self.pending.confirm(&AchievementSubmission::new(id, queued));
                self.failed.remove(id);
            }
        }
    }

    /// Sends a reset-all that `player` still owes the remote service.
    ///
    /// Until it lands, remote progress must not be merged back and local
    /// values must not be submitted.
    fn deliver_outstanding_reset(&mut self, player: &PlayerIdentity) -> EngineResult<()> {
        if self.reset_owed_to.as_deref() != Some(player.player_id.as_str()) {
            return Ok(());
        }
        match self.gateway.reset_achievements(player) {
            Ok(()) => {
                info!(player = %player.player_id, "outstanding remote reset delivered");
                self.reset_owed_to = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "outstanding remote reset failed");
                self.stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Attributes scores recorded before sign-in to `player_id`.
    fn adopt_local_scores(&mut self, player_id: &str) -> usize {
        let local = self.config.local_player_id.as_str();
        if local == player_id {
            return 0;
        }
        let mut adopted = self.scores.restamp(local, player_id);
        for board in self.leaderboards.values_mut() {
            adopted += board.restamp(local, player_id);
        }
        adopted
    }

    // ------------------------------------------------------------------
    // Achievement progress
    // ------------------------------------------------------------------

    /// Records progress for an achievement.
    ///
    /// Values are clamped to `[0, 100]`. Progress never regresses: a value
    /// at or below the stored one changes nothing. An increase is queued for
    /// submission whether or not sync is enabled.
    pub fn report_progress(&mut self, id: &str, percentage: f64) -> EngineResult<ReportOutcome> {
        let achievement = self
            .store
            .get_mut(id)
            .ok_or_else(|| EngineError::unknown_achievement(id))?;
        let value = clamp_percentage(percentage).ok_or_else(|| EngineError::InvalidProgress {
            id: id.to_string(),
            value: percentage,
        })?;

        let previous = achievement.percentage_completed();
        if value <= previous {
            debug!(id, value, previous, "progress not above stored value");
            return Ok(ReportOutcome::Unchanged);
        }

        achievement.set_percentage_completed(value);
        achievement.progress_reported();
        let record = achievement.record();

        self.pending.insert(id, value);
        self.failed.reset_backoff(id);

        let outcome = if value >= COMPLETE && previous < COMPLETE {
            ReportOutcome::Completed
        } else {
            ReportOutcome::Progressed
        };

        debug!(id, value, previous, "achievement progressed");
        self.observers.emit(&EngineEvent::Progressed(record.clone()));
        if outcome == ReportOutcome::Completed {
            info!(id, points = record.points, "achievement completed");
            self.observers.emit(&EngineEvent::Completed(record));
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Flushing
    // ------------------------------------------------------------------

    /// Submits every due pending value.
    pub fn flush(&mut self) -> FlushReport {
        self.flush_at(Instant::now())
    }

    /// Submits every pending value due at `now`.
    ///
    /// Values are sent in batches of at most `submit_batch_size`; each id is
    /// submitted at most once per call.
    pub fn flush_at(&mut self, now: Instant) -> FlushReport {
        let mut attempted = BTreeSet::new();
        let mut report = FlushReport::default();

        loop {
            let ticket = match self.take_ticket(now, &attempted) {
                Ok(ticket) => ticket,
                Err(reason) => {
                    if report.submitted == 0 {
                        self.note_skip(reason);
                        report.skipped = Some(reason);
                    }
                    return report;
                }
            };
            attempted.extend(ticket.batch.submissions.iter().map(|s| s.id.clone()));

            let result = self.gateway.submit_achievements(&ticket.batch);
            let part = self.complete_flush_at(ticket, result, now);
            report.submitted += part.submitted;
            report.confirmed.extend(part.confirmed);
            report.failed.extend(part.failed);
        }
    }

    /// Submits every pending value, ignoring retry backoff.
    pub fn force_flush(&mut self) -> FlushReport {
        for id in self.failed.ids() {
            self.failed.make_due(&id);
        }
        self.flush_at(Instant::now())
    }

    /// Takes the next batch of due values and marks it in flight.
    ///
    /// The caller submits `ticket.batch` however it likes and hands the
    /// outcome to [`complete_flush`](Self::complete_flush). While the batch is
    /// outstanding, further calls only pick up ids not already in flight.
    pub fn begin_flush(&mut self) -> Result<FlushTicket, SkipReason> {
        self.begin_flush_at(Instant::now())
    }

    /// [`begin_flush`](Self::begin_flush) with an explicit clock.
    pub fn begin_flush_at(&mut self, now: Instant) -> Result<FlushTicket, SkipReason> {
        self.take_ticket(now, &BTreeSet::new()).map_err(|reason| {
            self.note_skip(reason);
            reason
        })
    }

    /// Settles a batch handed out by [`begin_flush`](Self::begin_flush).
    pub fn complete_flush(
        &mut self,
        ticket: FlushTicket,
        result: EngineResult<SubmitResponse>,
    ) -> FlushReport {
        self.complete_flush_at(ticket, result, Instant::now())
    }

    /// [`complete_flush`](Self::complete_flush) with an explicit clock.
    pub fn complete_flush_at(
        &mut self,
        ticket: FlushTicket,
        result: EngineResult<SubmitResponse>,
        now: Instant,
    ) -> FlushReport {
        let submissions = ticket.batch.submissions;
        let mut report = FlushReport {
            submitted: submissions.len(),
            ..FlushReport::default()
        };

        match result {
            Ok(response) => {
                for (index, submission) in submissions.iter().enumerate() {
                    match response.status(index) {
                        Some(ItemStatus::Accepted) => {
                            self.confirm(submission);
                            report.confirmed.push(submission.id.clone());
                        }
                        Some(ItemStatus::Rejected { reason }) => {
                            self.fail(submission, reason, now);
                            report.failed.push(submission.id.clone());
                        }
                        None => {
                            self.fail(submission, "no status returned", now);
                            report.failed.push(submission.id.clone());
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    batch = ticket.batch.batch_id,
                    error = %e,
                    "achievement batch failed"
                );
                let reason = e.to_string();
                for submission in &submissions {
                    self.fail(submission, &reason, now);
                    report.failed.push(submission.id.clone());
                }
            }
        }

        info!(
            batch = ticket.batch.batch_id,
            confirmed = report.confirmed.len(),
            failed = report.failed.len(),
            "achievement batch settled"
        );
        report
    }

    fn take_ticket(
        &mut self,
        now: Instant,
        exclude: &BTreeSet<String>,
    ) -> Result<FlushTicket, SkipReason> {
        let player = self.remote_player()?;
        if self.deliver_outstanding_reset(&player).is_err() {
            return Err(SkipReason::ResetOutstanding);
        }

        let failed = &self.failed;
        let submissions = self
            .pending
            .take_batch(self.config.submit_batch_size, |id| {
                !exclude.contains(id) && failed.is_due(id, now)
            });
        if submissions.is_empty() {
            return Err(SkipReason::NothingDue);
        }

        let batch = AchievementBatch {
            batch_id: self.next_batch_id,
            player_id: player.player_id,
            submissions,
        };
        self.next_batch_id += 1;
        self.stats.flushes += 1;
        self.stats.achievements_submitted += batch.len() as u64;
        self.stats.last_flush_time = Some(now);

        debug!(batch = batch.batch_id, size = batch.len(), "achievement batch taken");
        Ok(FlushTicket { batch })
    }

    fn confirm(&mut self, submission: &AchievementSubmission) {
        self.stats.achievements_confirmed += 1;
        self.failed.remove(&submission.id);
        if self.pending.confirm(submission) {
            if let Some(achievement) = self.store.get_mut(&submission.id) {
                achievement.progress_flushed();
            }
        } else {
            debug!(id = %submission.id, "newer value stays queued");
        }
    }

    fn fail(&mut self, submission: &AchievementSubmission, reason: &str, now: Instant) {
        self.stats.achievements_failed += 1;
        self.stats.last_error = Some(reason.to_string());
        self.pending.release(&submission.id);

        // A reset while the batch was in flight leaves nothing to retry.
        if !self.pending.contains(&submission.id) {
            return;
        }

        let retry = &self.config.retry;
        let entry = self
            .failed
            .record_failure(&submission.id, reason, now, retry);
        if retry.is_parked(entry.attempts) {
            warn!(
                id = %entry.id,
                attempts = entry.attempts,
                "submission parked, retrying at the slowest rate"
            );
        } else {
            debug!(id = %entry.id, attempts = entry.attempts, reason, "submission failed");
        }
    }

    fn note_skip(&mut self, reason: SkipReason) {
        if reason != SkipReason::NothingDue {
            self.stats.flushes_skipped += 1;
            debug!(?reason, "flush skipped");
        }
    }

    /// Returns the player to submit for, or why the remote is unreachable.
    fn remote_player(&self) -> Result<PlayerIdentity, SkipReason> {
        if !self.status.is_sync_supported {
            return Err(SkipReason::SyncUnsupported);
        }
        if !self.status.is_sync_enabled {
            return Err(SkipReason::SyncDisabled);
        }
        let player = self.player.clone().ok_or(SkipReason::NotAuthenticated)?;
        if !self.gateway.is_available() {
            return Err(SkipReason::GatewayUnavailable);
        }
        Ok(player)
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Zeroes every achievement and clears everything queued for them.
    ///
    /// The local clear always completes; the remote reset is attempted only
    /// when the service is reachable. A remote reset that fails or is skipped
    /// is owed by the current player (or the snapshot owner) and is sent
    /// before that player's next reconciliation or flush.
    pub fn reset_achievements(&mut self) -> RemoteReset {
        self.store.reset_all();
        self.pending.clear();
        self.failed.clear();

        let remote = match self.remote_player() {
            Err(reason) => RemoteReset::Skipped(reason),
            Ok(player) => match self.gateway.reset_achievements(&player) {
                Ok(()) => RemoteReset::Succeeded,
                Err(e) => {
                    warn!(error = %e, "remote reset failed");
                    self.stats.last_error = Some(e.to_string());
                    RemoteReset::Failed(e.to_string())
                }
            },
        };

        self.reset_owed_to = match remote {
            RemoteReset::Succeeded => None,
            _ => self
                .player
                .as_ref()
                .map(|p| p.player_id.clone())
                .or_else(|| self.snapshot_owner.clone()),
        };

        self.stats.resets += 1;
        info!(remote = ?remote, owed_to = ?self.reset_owed_to, "achievements reset");
        self.observers.emit(&EngineEvent::Reset);
        remote
    }

    // ------------------------------------------------------------------
    // Scores
    // ------------------------------------------------------------------

    /// Records a score for the current player and queues it.
    ///
    /// Before authentication scores are stamped with the configured local
    /// player id. The gateway is never contacted.
    pub fn report_score(&mut self, value: f64, leaderboard_id: &str) -> EngineResult<ScoreRecord> {
        let player_id = self
            .player
            .as_ref()
            .map(|p| p.player_id.clone())
            .unwrap_or_else(|| self.config.local_player_id.clone());
        self.report_score_for(&player_id, value, leaderboard_id, Utc::now())
    }

    /// Records a score for `player_id` at `date` and queues it.
    pub fn report_score_for(
        &mut self,
        player_id: &str,
        value: f64,
        leaderboard_id: &str,
        date: DateTime<Utc>,
    ) -> EngineResult<ScoreRecord> {
        let board = self
            .leaderboards
            .get_mut(leaderboard_id)
            .ok_or_else(|| EngineError::UnknownLeaderboard {
                id: leaderboard_id.to_string(),
            })?;

        let range = board.descriptor().score_range;
        if !range.contains(value) {
            return Err(EngineError::ScoreOutOfRange {
                leaderboard_id: leaderboard_id.to_string(),
                value,
                min: range.min,
                max: range.max,
            });
        }

        let record = board.make_score(player_id, value, date);
        board.insert(record.clone());
        self.scores.push(record.clone());

        debug!(
            leaderboard = leaderboard_id,
            player = player_id,
            value,
            "score recorded"
        );
        Ok(record)
    }

    /// Submits every due queued score.
    pub fn flush_scores(&mut self) -> FlushReport {
        self.flush_scores_at(Instant::now())
    }

    /// Submits every queued score due at `now`.
    pub fn flush_scores_at(&mut self, now: Instant) -> FlushReport {
        let player = match self.remote_player() {
            Ok(player) => player,
            Err(reason) => {
                self.note_skip(reason);
                return FlushReport::skipped(reason);
            }
        };

        let due = self.scores.take_due(now);
        if due.is_empty() {
            return FlushReport::skipped(SkipReason::NothingDue);
        }

        let batch = ScoreBatch {
            player_id: player.player_id,
            scores: due.iter().map(|s| s.record.clone()).collect(),
        };
        self.stats.scores_submitted += batch.scores.len() as u64;
        self.stats.last_flush_time = Some(now);

        let mut report = FlushReport {
            submitted: batch.scores.len(),
            ..FlushReport::default()
        };

        let result = self.gateway.submit_scores(&batch);
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, scores = batch.scores.len(), "score batch failed");
                self.stats.last_error = Some(e.to_string());
                SubmitResponse::default()
            }
        };

        for (index, score) in due.into_iter().enumerate() {
            let accepted = response.status(index).is_some_and(ItemStatus::is_accepted);
            if accepted {
                self.stats.scores_confirmed += 1;
                report.confirmed.push(score.record.leaderboard_id.clone());
            } else {
                self.stats.scores_failed += 1;
                report.failed.push(score.record.leaderboard_id.clone());
                self.scores.requeue(score, now, &self.config.retry);
            }
        }

        info!(
            confirmed = report.confirmed.len(),
            failed = report.failed.len(),
            "score batch settled"
        );
        report
    }

    /// Queries a leaderboard, remotely when reachable and locally otherwise.
    pub fn fetch_scores(
        &self,
        leaderboard_id: &str,
        query: &ScoreQuery,
    ) -> EngineResult<Vec<ScoreRecord>> {
        let board =
            self.leaderboards
                .get(leaderboard_id)
                .ok_or_else(|| EngineError::UnknownLeaderboard {
                    id: leaderboard_id.to_string(),
                })?;

        if self.remote_player().is_ok() {
            match self.gateway.fetch_scores(leaderboard_id, query) {
                Ok(scores) => return Ok(scores),
                Err(e) => {
                    warn!(leaderboard = leaderboard_id, error = %e, "remote score query failed, using local scores");
                }
            }
        }

        Ok(board.query(query, Utc::now()))
    }

    /// Returns the local leaderboard for `id`.
    pub fn leaderboard(&self, id: &str) -> Option<&Leaderboard> {
        self.leaderboards.get(id)
    }

    /// Returns the local leaderboard for `id` mutably.
    ///
    /// Scores added this way are local only; they are not queued.
    pub fn leaderboard_mut(&mut self, id: &str) -> Option<&mut Leaderboard> {
        self.leaderboards.get_mut(id)
    }

    /// Iterates over local leaderboards in id order.
    pub fn leaderboards(&self) -> impl Iterator<Item = &Leaderboard> {
        self.leaderboards.values()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Captures the current state as a snapshot.
    pub fn save(&self) -> Snapshot {
        let owner = self
            .player
            .as_ref()
            .filter(|_| !self.status.has_changed_device)
            .map(|p| p.player_id.clone())
            .or_else(|| self.snapshot_owner.clone());

        Snapshot {
            version: SNAPSHOT_VERSION,
            player_id: owner,
            achievements: self.store.save(),
            pending: self.pending.to_map(),
            failed: self.failed.ids(),
            reset_pending_for: self.reset_owed_to.clone(),
            queued_scores: self.scores.records(),
            leaderboards: self
                .leaderboards
                .iter()
                .filter(|(_, board)| !board.is_empty())
                .map(|(id, board)| (id.clone(), board.all_scores().to_vec()))
                .collect(),
        }
    }

    /// Replaces local state with a snapshot.
    ///
    /// Entries for unconfigured achievements or leaderboards are skipped.
    /// Restored failures are due immediately.
    pub fn load(&mut self, snapshot: &Snapshot) -> LoadSummary {
        let summary = self.store.load(&snapshot.achievements);

        self.pending.clear();
        for (id, &value) in &snapshot.pending {
            match clamp_percentage(value).filter(|_| self.store.contains(id)) {
                Some(value) => self.pending.insert(id.as_str(), value),
                None => debug!(id = %id, "skipping pending entry"),
            }
        }

        self.failed = FailedList::restore(
            snapshot
                .failed
                .iter()
                .filter(|id| self.pending.contains(id))
                .cloned(),
        );

        self.scores = ScoreQueue::new();
        for score in &snapshot.queued_scores {
            if self.leaderboards.contains_key(&score.leaderboard_id) {
                self.scores.push(score.clone());
            }
        }

        for board in self.leaderboards.values_mut() {
            board.remove_all_scores();
        }
        for (id, scores) in &snapshot.leaderboards {
            match self.leaderboards.get_mut(id) {
                Some(board) => scores.iter().cloned().for_each(|s| board.insert(s)),
                None => debug!(leaderboard = %id, "skipping unknown leaderboard"),
            }
        }

        self.snapshot_owner = snapshot.player_id.clone();
        self.reset_owed_to = snapshot.reset_pending_for.clone();
        if let Some(player) = &self.player {
            self.status.has_changed_device =
                self.snapshot_owner.as_deref() != Some(player.player_id.as_str());
            self.status.is_synced = false;
        }

        info!(
            restored = summary.restored,
            skipped = summary.skipped,
            pending = self.pending.len(),
            failed = self.failed.len(),
            queued_scores = self.scores.len(),
            "snapshot loaded"
        );
        summary
    }

    /// Drops every observer and returns a final snapshot.
    pub fn shutdown(mut self) -> Snapshot {
        self.observers.clear();
        let snapshot = self.save();
        info!(pending = snapshot.pending.len(), "engine shut down");
        snapshot
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns every achievement in configuration order.
    pub fn achievements(&self) -> Vec<AchievementRecord> {
        self.store.records()
    }

    /// Returns the achievement for `id`.
    pub fn achievement(&self, id: &str) -> Option<AchievementRecord> {
        self.store.get(id).map(|a| a.record())
    }

    /// Returns the pending queue.
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Returns the failed list.
    pub fn failed(&self) -> &FailedList {
        &self.failed
    }

    /// Returns the outgoing score queue.
    pub fn queued_scores(&self) -> &ScoreQueue {
        &self.scores
    }

    /// Returns the sync flags.
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Returns activity statistics.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Returns the authenticated player.
    pub fn player(&self) -> Option<&PlayerIdentity> {
        self.player.as_ref()
    }

    /// Returns the player still owed a remote reset, if any.
    pub fn pending_reset(&self) -> Option<&str> {
        self.reset_owed_to.as_deref()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Switches remote sync on or off for this session.
    pub fn set_sync_enabled(&mut self, enabled: bool) {
        self.status.is_sync_enabled = enabled;
        info!(enabled, "remote sync toggled");
    }
}

fn skip_error(reason: SkipReason) -> EngineError {
    match reason {
        SkipReason::SyncUnsupported | SkipReason::SyncDisabled => EngineError::SyncDisabled,
        SkipReason::NotAuthenticated => {
            EngineError::AuthenticationUnavailable("no authenticated player".into())
        }
        SkipReason::ResetOutstanding => EngineError::remote_retryable("reset not delivered"),
        SkipReason::GatewayUnavailable | SkipReason::NothingDue => {
            EngineError::remote_retryable("gateway unavailable")
        }
    }
}
