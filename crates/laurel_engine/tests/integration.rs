//! Integration tests for the engine against a shared in-memory service.

use laurel_engine::{
    EngineConfig, EngineError, EngineObserver, EngineResult, GameConfig, NotificationQueue,
    ObserverResult, ReconciliationEngine, RemoteGateway, RemoteReset, RetryConfig, SkipReason,
};
use laurel_protocol::{
    AchievementBatch, AchievementRecord, ItemStatus, LeaderboardDescriptor, PlayerIdentity,
    ScoreBatch, ScoreQuery, ScoreRange, ScoreRecord, Snapshot, SubmitResponse,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Remote service shared by every device, keyed by player.
#[derive(Default)]
struct Service {
    achievements: Mutex<BTreeMap<String, BTreeMap<String, f64>>>,
    scores: Mutex<Vec<ScoreRecord>>,
}

impl Service {
    fn progress(&self, player_id: &str) -> BTreeMap<String, f64> {
        self.achievements
            .lock()
            .get(player_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// One device's connection to the service.
struct DeviceGateway {
    service: Arc<Service>,
    player: Mutex<PlayerIdentity>,
    online: AtomicBool,
    submissions: AtomicUsize,
}

impl DeviceGateway {
    fn new(service: &Arc<Service>, player_id: &str) -> Arc<Self> {
        Arc::new(Self {
            service: Arc::clone(service),
            player: Mutex::new(PlayerIdentity::new(player_id, player_id.to_uppercase())),
            online: AtomicBool::new(true),
            submissions: AtomicUsize::new(0),
        })
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn sign_in_as(&self, player_id: &str) {
        *self.player.lock() = PlayerIdentity::new(player_id, player_id.to_uppercase());
    }

    fn check(&self) -> EngineResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(EngineError::remote_retryable("offline"))
        }
    }
}

impl RemoteGateway for DeviceGateway {
    fn authenticate(&self) -> EngineResult<PlayerIdentity> {
        self.check()
            .map_err(|e| EngineError::AuthenticationUnavailable(e.to_string()))?;
        Ok(self.player.lock().clone())
    }

    fn fetch_remote_achievements(
        &self,
        player: &PlayerIdentity,
    ) -> EngineResult<BTreeMap<String, f64>> {
        self.check()?;
        Ok(self.service.progress(&player.player_id))
    }

    fn submit_achievements(&self, batch: &AchievementBatch) -> EngineResult<SubmitResponse> {
        self.check()?;
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let mut all = self.service.achievements.lock();
        let stored = all.entry(batch.player_id.clone()).or_default();
        for submission in &batch.submissions {
            let value = stored.entry(submission.id.clone()).or_insert(0.0);
            *value = value.max(submission.percentage);
        }
        Ok(SubmitResponse::all_accepted(batch.len()))
    }

    fn submit_scores(&self, batch: &ScoreBatch) -> EngineResult<SubmitResponse> {
        self.check()?;
        self.service.scores.lock().extend(batch.scores.iter().cloned());
        Ok(SubmitResponse::all_accepted(batch.scores.len()))
    }

    fn reset_achievements(&self, player: &PlayerIdentity) -> EngineResult<()> {
        self.check()?;
        self.service.achievements.lock().remove(&player.player_id);
        Ok(())
    }

    fn fetch_scores(
        &self,
        leaderboard_id: &str,
        query: &ScoreQuery,
    ) -> EngineResult<Vec<ScoreRecord>> {
        self.check()?;
        let mut scores: Vec<ScoreRecord> = self
            .service
            .scores
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
            .collect())
    }

    fn is_available(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Gateway whose achievement submissions fail a fixed number of times.
struct FlakyGateway {
    inner: Arc<DeviceGateway>,
    failures_left: AtomicUsize,
}

impl RemoteGateway for FlakyGateway {
    fn authenticate(&self) -> EngineResult<PlayerIdentity> {
        self.inner.authenticate()
    }

    fn fetch_remote_achievements(
        &self,
        player: &PlayerIdentity,
    ) -> EngineResult<BTreeMap<String, f64>> {
        self.inner.fetch_remote_achievements(player)
    }

    fn submit_achievements(&self, batch: &AchievementBatch) -> EngineResult<SubmitResponse> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Ok(SubmitResponse::new(vec![
                ItemStatus::rejected("try later");
                batch.len()
            ]));
        }
        self.inner.submit_achievements(batch)
    }

    fn submit_scores(&self, batch: &ScoreBatch) -> EngineResult<SubmitResponse> {
        self.inner.submit_scores(batch)
    }

    fn reset_achievements(&self, player: &PlayerIdentity) -> EngineResult<()> {
        self.inner.reset_achievements(player)
    }

    fn fetch_scores(
        &self,
        leaderboard_id: &str,
        query: &ScoreQuery,
    ) -> EngineResult<Vec<ScoreRecord>> {
        self.inner.fetch_scores(leaderboard_id, query)
    }
}

fn game() -> GameConfig {
    GameConfig::new()
        .with_achievement("first_win", 10)
        .with_achievement("no_death", 20)
        .with_achievement("speed_run", 50)
        .with_leaderboard(
            LeaderboardDescriptor::new("high_scores", "High Scores")
                .with_suffixes("point", "points")
                .with_score_range(ScoreRange::new(0.0, 100_000.0)),
        )
}

fn device<G: RemoteGateway>(gateway: &Arc<G>) -> ReconciliationEngine<G> {
    let config = EngineConfig::new(game()).with_retry(RetryConfig::immediate());
    ReconciliationEngine::new(config, Arc::clone(gateway)).unwrap()
}

fn map(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
    items.iter().map(|(id, p)| (id.to_string(), *p)).collect()
}

fn percentages<G: RemoteGateway>(engine: &ReconciliationEngine<G>) -> BTreeMap<String, f64> {
    engine
        .achievements()
        .into_iter()
        .map(|a| (a.id, a.percentage_completed))
        .collect()
}

#[test]
fn two_devices_converge_through_the_service() {
    let service = Arc::new(Service::default());
    let phone_gateway = DeviceGateway::new(&service, "alice");
    let console_gateway = DeviceGateway::new(&service, "alice");

    let mut phone = device(&phone_gateway);
    phone.authenticate_local_player().unwrap();
    phone.report_progress("first_win", 100.0).unwrap();
    phone.report_progress("no_death", 30.0).unwrap();
    assert!(phone.flush().is_clean());

    let mut console = device(&console_gateway);
    console.report_progress("no_death", 60.0).unwrap();
    console.authenticate_local_player().unwrap();
    assert!(console.flush().is_clean());

    phone.sync_with_remote().unwrap();

    let expected = map(&[("first_win", 100.0), ("no_death", 60.0), ("speed_run", 0.0)]);
    assert_eq!(percentages(&phone), expected);
    assert_eq!(percentages(&console), expected);
    assert_eq!(
        service.progress("alice"),
        map(&[("first_win", 100.0), ("no_death", 60.0)])
    );
}

#[test]
fn offline_progress_survives_restart() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "bob");
    gateway.set_online(false);

    let mut engine = device(&gateway);
    assert!(engine.authenticate_local_player().is_err());
    engine.report_progress("speed_run", 75.0).unwrap();
    engine.report_score(4200.0, "high_scores").unwrap();
    assert_eq!(engine.flush().skipped, Some(SkipReason::NotAuthenticated));

    let bytes = engine.shutdown().to_cbor().unwrap();

    gateway.set_online(true);
    let mut restarted = device(&gateway);
    restarted.load(&Snapshot::from_cbor(&bytes).unwrap());
    assert_eq!(restarted.pending().get("speed_run"), Some(75.0));

    restarted.authenticate_local_player().unwrap();
    assert!(restarted.flush().is_clean());
    assert!(restarted.flush_scores().is_clean());

    assert_eq!(service.progress("bob"), map(&[("speed_run", 75.0)]));
    let scores = service.scores.lock().clone();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].player_id, "bob");
}

#[test]
fn signing_in_as_another_player_merges_progress() {
    let service = Arc::new(Service::default());
    service
        .achievements
        .lock()
        .insert("carol".into(), map(&[("no_death", 90.0)]));

    let gateway = DeviceGateway::new(&service, "dave");
    let mut engine = device(&gateway);
    engine.authenticate_local_player().unwrap();
    engine.report_progress("first_win", 40.0).unwrap();
    engine.flush();
    let snapshot = engine.save();
    assert_eq!(snapshot.player_id.as_deref(), Some("dave"));

    gateway.sign_in_as("carol");
    let mut engine = device(&gateway);
    engine.load(&snapshot);
    engine.authenticate_local_player().unwrap();

    assert_eq!(
        percentages(&engine),
        map(&[("first_win", 40.0), ("no_death", 90.0), ("speed_run", 0.0)])
    );
    assert!(engine.flush().is_clean());
    assert_eq!(
        service.progress("carol"),
        map(&[("first_win", 40.0), ("no_death", 90.0)])
    );
    assert_eq!(engine.save().player_id.as_deref(), Some("carol"));
}

#[test]
fn rejected_submissions_retry_with_backoff() {
    let service = Arc::new(Service::default());
    let gateway = Arc::new(FlakyGateway {
        inner: DeviceGateway::new(&service, "erin"),
        failures_left: AtomicUsize::new(2),
    });
    let retry = RetryConfig::new(5)
        .with_initial_delay(Duration::from_secs(1))
        .with_backoff_multiplier(2.0)
        .with_jitter(false);
    let mut engine =
        ReconciliationEngine::new(EngineConfig::new(game()).with_retry(retry), Arc::clone(&gateway))
            .unwrap();
    engine.authenticate_local_player().unwrap();
    engine.report_progress("first_win", 100.0).unwrap();

    let start = Instant::now();
    assert_eq!(engine.flush_at(start).failed.len(), 1);
    assert_eq!(
        engine.flush_at(start + Duration::from_millis(500)).skipped,
        Some(SkipReason::NothingDue)
    );

    assert_eq!(engine.flush_at(start + Duration::from_secs(1)).failed.len(), 1);
    let retry_at = engine.failed().get("first_win").unwrap().next_attempt_at.unwrap();
    assert_eq!(retry_at, start + Duration::from_secs(3));

    let report = engine.flush_at(retry_at);
    assert_eq!(report.confirmed, vec!["first_win".to_string()]);
    assert!(engine.failed().is_empty());
    assert_eq!(service.progress("erin"), map(&[("first_win", 100.0)]));
    assert_eq!(engine.stats().achievements_failed, 2);
    assert_eq!(engine.stats().achievements_confirmed, 1);
}

#[test]
fn outstanding_batch_does_not_block_new_ids() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "fay");
    let mut engine = device(&gateway);
    engine.authenticate_local_player().unwrap();

    engine.report_progress("first_win", 10.0).unwrap();
    let first = engine.begin_flush().unwrap();
    engine.report_progress("no_death", 20.0).unwrap();
    let second = engine.begin_flush().unwrap();

    assert_eq!(first.batch.submissions.len(), 1);
    assert_eq!(second.batch.submissions.len(), 1);
    assert_eq!(second.batch.submissions[0].id, "no_death");
    assert_ne!(first.batch.batch_id, second.batch.batch_id);

    let second_result = gateway.submit_achievements(&second.batch);
    engine.complete_flush(second, second_result);
    engine.complete_flush(first, Err(EngineError::remote_retryable("timeout")));

    assert_eq!(engine.pending().to_map(), map(&[("first_win", 10.0)]));
    assert!(engine.failed().contains("first_win"));
}

#[test]
fn reset_reaches_the_service_when_online() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "gus");
    let mut engine = device(&gateway);
    engine.authenticate_local_player().unwrap();
    engine.report_progress("no_death", 100.0).unwrap();
    engine.flush();

    assert_eq!(engine.reset_achievements(), RemoteReset::Succeeded);
    assert!(service.progress("gus").is_empty());
    assert_eq!(engine.stats().resets, 1);
}

#[test]
fn reset_made_offline_reaches_the_service_later() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "jo");
    let mut engine = device(&gateway);
    engine.authenticate_local_player().unwrap();
    engine.report_progress("first_win", 100.0).unwrap();
    assert!(engine.flush().is_clean());

    gateway.set_online(false);
    assert_eq!(
        engine.reset_achievements(),
        RemoteReset::Skipped(SkipReason::GatewayUnavailable)
    );
    let snapshot = engine.shutdown();

    gateway.set_online(true);
    let mut restarted = device(&gateway);
    restarted.load(&snapshot);
    restarted.authenticate_local_player().unwrap();

    assert_eq!(restarted.achievement("first_win").unwrap().percentage_completed, 0.0);
    assert!(restarted.status().is_synced);
    assert_eq!(restarted.pending_reset(), None);
    assert!(service.progress("jo").is_empty());
}

#[test]
fn remote_scores_preferred_and_local_fallback() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "hal");
    let mut engine = device(&gateway);
    engine.authenticate_local_player().unwrap();
    engine.report_score(900.0, "high_scores").unwrap();
    engine.flush_scores();
    service.scores.lock().push(ScoreRecord::new(
        "ivy",
        "high_scores",
        chrono::Utc::now(),
        1500.0,
        "1500 points",
    ));

    let remote = engine
        .fetch_scores("high_scores", &ScoreQuery::default())
        .unwrap();
    assert_eq!(remote.len(), 2);
    assert_eq!(remote[0].player_id, "ivy");

    gateway.set_online(false);
    let local = engine
        .fetch_scores("high_scores", &ScoreQuery::default())
        .unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].player_id, "hal");
    assert_eq!(local[0].formatted_value, "900 points");
}

struct Completions(Mutex<Vec<String>>);

impl EngineObserver for Completions {
    fn on_completed(&self, achievement: &AchievementRecord) -> ObserverResult {
        self.0.lock().push(achievement.id.clone());
        Ok(())
    }
}

#[test]
fn observers_are_not_kept_alive() {
    let service = Arc::new(Service::default());
    let gateway = DeviceGateway::new(&service, "jo");
    let mut engine = device(&gateway);

    let completions = Arc::new(Completions(Mutex::new(Vec::new())));
    let banners = Arc::new(NotificationQueue::new());
    engine.add_observer(&completions);
    engine.add_observer(&banners);

    engine.report_progress("first_win", 100.0).unwrap();
    drop(completions);
    engine.report_progress("no_death", 100.0).unwrap();

    assert_eq!(banners.next_to_display().map(|r| r.id), Some("first_win".into()));
    assert_eq!(banners.waiting(), 1);
    assert_eq!(banners.display_finished().map(|r| r.id), Some("no_death".into()));
}
