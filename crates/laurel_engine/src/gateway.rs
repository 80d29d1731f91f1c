//! Remote service abstraction.

use crate::error::{EngineError, EngineResult};
use laurel_protocol::{
    AchievementBatch, ItemStatus, PlayerIdentity, ScoreBatch, ScoreQuery, ScoreRecord,
    SubmitResponse, COMPLETE,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A remote achievement/leaderboard service.
///
/// This trait abstracts the network layer so the engine can run against a
/// real service client, an offline stub, or a mock in tests. Calls may fail
/// at any time; the engine treats every failure as recoverable.
pub trait RemoteGateway: Send + Sync {
    /// Authenticates the local player.
    fn authenticate(&self) -> EngineResult<PlayerIdentity>;

    /// Fetches the player's achievement percentages as stored remotely.
    fn fetch_remote_achievements(
        &self,
        player: &PlayerIdentity,
    ) -> EngineResult<BTreeMap<String, f64>>;

    /// Submits achievement progress. Must be idempotent per `(id, percentage)`.
    fn submit_achievements(&self, batch: &AchievementBatch) -> EngineResult<SubmitResponse>;

    /// Submits scores.
    fn submit_scores(&self, batch: &ScoreBatch) -> EngineResult<SubmitResponse>;

    /// Clears the player's remote achievement progress.
    fn reset_achievements(&self, player: &PlayerIdentity) -> EngineResult<()>;

    /// Fetches ranked scores for a leaderboard.
    fn fetch_scores(&self, leaderboard_id: &str, query: &ScoreQuery)
        -> EngineResult<Vec<ScoreRecord>>;

    /// Returns false when the service is known to be unreachable.
    fn is_available(&self) -> bool {
        true
    }
}

/// A gateway for builds without any remote service.
///
/// Every call fails with [`EngineError::AuthenticationUnavailable`] or
/// [`EngineError::RemoteUnavailable`], so the engine records locally only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

impl RemoteGateway for OfflineGateway {
    fn authenticate(&self) -> EngineResult<PlayerIdentity> {
        Err(EngineError::AuthenticationUnavailable(
            "no remote service configured".into(),
        ))
    }

    fn fetch_remote_achievements(
        &self,
        _player: &PlayerIdentity,
    ) -> EngineResult<BTreeMap<String, f64>> {
        Err(EngineError::remote_fatal("offline"))
    }

    fn submit_achievements(&self, _batch: &AchievementBatch) -> EngineResult<SubmitResponse> {
        Err(EngineError::remote_fatal("offline"))
    }

    fn submit_scores(&self, _batch: &ScoreBatch) -> EngineResult<SubmitResponse> {
        Err(EngineError::remote_fatal("offline"))
    }

    fn reset_achievements(&self, _player: &PlayerIdentity) -> EngineResult<()> {
        Err(EngineError::remote_fatal("offline"))
    }

    fn fetch_scores(
        &self,
        _leaderboard_id: &str,
        _query: &ScoreQuery,
    ) -> EngineResult<Vec<ScoreRecord>> {
        Err(EngineError::remote_fatal("offline"))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// An in-memory remote service for testing.
///
/// Accepted submissions are stored (keeping the highest percentage per id),
/// so later fetches observe them. Failures can be switched on globally or
/// per achievement id.
#[derive(Debug)]
pub struct MockGateway {
    connected: AtomicBool,
    player: Mutex<Option<PlayerIdentity>>,
    remote_achievements: Mutex<BTreeMap<String, f64>>,
    remote_scores: Mutex<Vec<ScoreRecord>>,
    failing_ids: Mutex<BTreeSet<String>>,
    fail_submissions: AtomicBool,
    fail_reset: AtomicBool,
    submitted_batches: Mutex<Vec<AchievementBatch>>,
    submitted_scores: Mutex<Vec<ScoreBatch>>,
    reset_calls: AtomicUsize,
}

impl MockGateway {
    /// Creates a connected mock that authenticates as `player`.
    pub fn new(player: PlayerIdentity) -> Self {
        Self {
            connected: AtomicBool::new(true),
            player: Mutex::new(Some(player)),
            remote_achievements: Mutex::new(BTreeMap::new()),
            remote_scores: Mutex::new(Vec::new()),
            failing_ids: Mutex::new(BTreeSet::new()),
            fail_submissions: AtomicBool::new(false),
            fail_reset: AtomicBool::new(false),
            submitted_batches: Mutex::new(Vec::new()),
            submitted_scores: Mutex::new(Vec::new()),
            reset_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a mock with no player signed in.
    pub fn signed_out() -> Self {
        let gateway = Self::new(PlayerIdentity::new("", ""));
        *gateway.player.lock() = None;
        gateway
    }

    /// Sets the player returned by `authenticate`, or none.
    pub fn set_player(&self, player: Option<PlayerIdentity>) {
        *self.player.lock() = player;
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Replaces the remotely stored achievement percentages.
    pub fn set_remote_achievements(&self, achievements: BTreeMap<String, f64>) {
        *self.remote_achievements.lock() = achievements;
    }

    /// Returns the remotely stored achievement percentages.
    pub fn remote_achievements(&self) -> BTreeMap<String, f64> {
        self.remote_achievements.lock().clone()
    }

    /// Replaces the remotely stored scores.
    pub fn set_remote_scores(&self, scores: Vec<ScoreRecord>) {
        *self.remote_scores.lock() = scores;
    }

    /// Makes every submission fail (or succeed again).
    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Makes submissions for `id` be rejected.
    pub fn fail_id(&self, id: impl Into<String>) {
        self.failing_ids.lock().insert(id.into());
    }

    /// Stops rejecting submissions for `id`.
    pub fn heal_id(&self, id: &str) {
        self.failing_ids.lock().remove(id);
    }

    /// Makes `reset_achievements` fail.
    pub fn set_fail_reset(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    /// Returns every achievement batch received.
    pub fn submitted_batches(&self) -> Vec<AchievementBatch> {
        self.submitted_batches.lock().clone()
    }

    /// Returns every score batch received.
    pub fn submitted_scores(&self) -> Vec<ScoreBatch> {
        self.submitted_scores.lock().clone()
    }

    /// Returns how many times `reset_achievements` was called.
    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }

    fn check_connected(&self) -> EngineResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(EngineError::remote_retryable("not connected"))
        }
    }
}

impl RemoteGateway for MockGateway {
    fn authenticate(&self) -> EngineResult<PlayerIdentity> {
        if !self.is_available() {
            return Err(EngineError::AuthenticationUnavailable("not connected".into()));
        }
        self.player
            .lock()
            .clone()
            .ok_or_else(|| EngineError::AuthenticationUnavailable("no player signed in".into()))
    }

    fn fetch_remote_achievements(
        &self,
        _player: &PlayerIdentity,
    ) -> EngineResult<BTreeMap<String, f64>> {
        self.check_connected()?;
        Ok(self.remote_achievements.lock().clone())
    }

    fn submit_achievements(&self, batch: &AchievementBatch) -> EngineResult<SubmitResponse> {
        self.check_connected()?;
        self.submitted_batches.lock().push(batch.clone());
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(EngineError::remote_retryable("service unavailable"));
        }

        let failing = self.failing_ids.lock();
        let mut remote = self.remote_achievements.lock();
        let statuses = batch
            .submissions
            .iter()
            .map(|submission| {
                if failing.contains(&submission.id) {
                    return ItemStatus::rejected("rejected by mock");
                }
                let stored = remote.entry(submission.id.clone()).or_insert(0.0);
                *stored = stored.max(submission.percentage.min(COMPLETE));
                ItemStatus::Accepted
            })
            .collect();

        Ok(SubmitResponse::new(statuses))
    }

    fn submit_scores(&self, batch: &ScoreBatch) -> EngineResult<SubmitResponse> {
        self.check_connected()?;
        self.submitted_scores.lock().push(batch.clone());
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(EngineError::remote_retryable("service unavailable"));
        }
        self.remote_scores.lock().extend(batch.scores.iter().cloned());
        Ok(SubmitResponse::all_accepted(batch.scores.len()))
    }

    fn reset_achievements(&self, _player: &PlayerIdentity) -> EngineResult<()> {
        self.check_connected()?;
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err(EngineError::remote_retryable("reset failed"));
        }
        self.remote_achievements.lock().clear();
        Ok(())
    }

    fn fetch_scores(
        &self,
        leaderboard_id: &str,
        query: &ScoreQuery,
    ) -> EngineResult<Vec<ScoreRecord>> {
        self.check_connected()?;
        let mut scores: Vec<ScoreRecord> = self
            .remote_scores
            .lock()
            .iter()
            .filter(|s| s.leaderboard_id == leaderboard_id)
            .filter(|s| query.player_scope.includes(&s.player_id))
            .cloned()
            .collect();
        scores.sort_by(|a, b| b.value.total_cmp(&a.value));
        Ok(scores
            .iter()
            .enumerate()
            .map(|(i, s)| s.ranked(i as u32 + 1))
            .filter(|s| query.range.contains(s.rank))
            .collect())
    }

    fn is_available(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
