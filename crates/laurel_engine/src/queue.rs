//! Pending submissions, the failed list and the outgoing score queue.
//!
//! # Invariants
//!
//! - Every id in the failed list is also in the pending queue.
//! - An id is removed from the pending queue only when the value confirmed
//!   by the remote service equals the value still queued.
//! - Nothing is ever dropped because of a remote failure.

use crate::config::RetryConfig;
use laurel_protocol::{AchievementSubmission, ScoreRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Achievement values waiting for remote confirmation.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    entries: BTreeMap<String, f64>,
    in_flight: BTreeMap<String, f64>,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `percentage` for `id`, replacing any older value.
    pub fn insert(&mut self, id: impl Into<String>, percentage: f64) {
        self.entries.insert(id.into(), percentage);
    }

    /// Returns the queued value for `id`.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.entries.get(id).copied()
    }

    /// Returns true if `id` is queued.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns true if `id` is part of an outstanding batch.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Returns the number of queued ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns number of ids in outstanding batches.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Iterates over queued `(id, percentage)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, &p)| (id.as_str(), p))
    }

    /// Returns a copy of the queued values.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries.clone()
    }

    /// Marks up to `limit` due ids as in flight and returns their submissions.
    ///
    /// Ids already in flight are skipped; `is_due` filters the rest.
    pub fn take_batch(
        &mut self,
        limit: usize,
        mut is_due: impl FnMut(&str) -> bool,
    ) -> Vec<AchievementSubmission> {
        let batch: Vec<AchievementSubmission> = self
            .entries
            .iter()
            .filter(|(id, _)| !self.in_flight.contains_key(id.as_str()))
            .filter(|(id, _)| is_due(id))
            .take(limit)
            .map(|(id, &p)| AchievementSubmission::new(id.clone(), p))
            .collect();

        for submission in &batch {
            self.in_flight
                .insert(submission.id.clone(), submission.percentage);
        }
        batch
    }

    /// Settles a confirmed submission.
    ///
    /// Returns true if the id left the queue. A newer value reported while
    /// the submission was in flight stays queued.
    pub fn confirm(&mut self, submission: &AchievementSubmission) -> bool {
        self.in_flight.remove(&submission.id);
        if self.entries.get(&submission.id) == Some(&submission.percentage) {
            self.entries.remove(&submission.id);
            true
        } else {
            false
        }
    }

    /// Settles a failed submission; the queued value is kept.
    pub fn release(&mut self, id: &str) {
        self.in_flight.remove(id);
    }

    /// Drops everything, including in-flight bookkeeping.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
    }
}

/// Retry bookkeeping for one failed id.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedSubmission {
    /// Achievement id.
    pub id: String,
    /// Consecutive failures.
    pub attempts: u32,
    /// Earliest time the next automatic retry may run.
    pub next_attempt_at: Option<Instant>,
    /// Reason given by the last failure.
    pub last_error: String,
}

/// Ordered list of ids whose last submission failed, oldest failure first.
#[derive(Debug, Clone, Default)]
pub struct FailedList {
    entries: Vec<FailedSubmission>,
}

impl FailedList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores ids from a snapshot. Restored ids are due immediately.
    pub fn restore(ids: impl IntoIterator<Item = String>) -> Self {
        let mut seen = BTreeSet::new();
        let entries = ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .map(|id| FailedSubmission {
                id,
                attempts: 0,
                next_attempt_at: None,
                last_error: String::new(),
            })
            .collect();
        Self { entries }
    }

    /// Records a failure and schedules the next attempt.
    ///
    /// Returns the updated entry.
    pub fn record_failure(
        &mut self,
        id: &str,
        reason: impl Into<String>,
        now: Instant,
        retry: &RetryConfig,
    ) -> &FailedSubmission {
        let position = match self.entries.iter().position(|e| e.id == id) {
            Some(position) => position,
            None => {
                self.entries.push(FailedSubmission {
                    id: id.to_string(),
                    attempts: 0,
                    next_attempt_at: None,
                    last_error: String::new(),
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[position];
        entry.attempts = entry.attempts.saturating_add(1);
        entry.next_attempt_at = Some(retry.next_attempt_at(id, entry.attempts, now));
        entry.last_error = reason.into();
        entry
    }

    /// Removes `id` after a successful submission.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Makes `id` due immediately, keeping its failure count.
    pub fn make_due(&mut self, id: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.next_attempt_at = None;
        }
    }

    /// Makes `id` due immediately and forgets its earlier failures.
    pub fn reset_backoff(&mut self, id: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.attempts = 0;
            entry.next_attempt_at = None;
        }
    }

    /// Returns true unless `id` is waiting out a backoff delay at `now`.
    pub fn is_due(&self, id: &str, now: Instant) -> bool {
        self.get(id)
            .and_then(|e| e.next_attempt_at)
            .map_or(true, |at| at <= now)
    }

    /// Returns the entry for `id`.
    pub fn get(&self, id: &str) -> Option<&FailedSubmission> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Returns true if `id` is in the list.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns the failed ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Iterates over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &FailedSubmission> {
        self.entries.iter()
    }

    /// Returns the number of failed ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has failed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A score waiting for remote confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedScore {
    /// The score.
    pub record: ScoreRecord,
    /// Consecutive failures.
    pub attempts: u32,
    /// Earliest time the next automatic retry may run.
    pub next_attempt_at: Option<Instant>,
}

impl QueuedScore {
    /// Wraps a freshly reported score.
    pub fn new(record: ScoreRecord) -> Self {
        Self {
            record,
            attempts: 0,
            next_attempt_at: None,
        }
    }

    /// Returns true unless the score is waiting out a backoff delay.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }
}

/// Outgoing scores in report order.
#[derive(Debug, Clone, Default)]
pub struct ScoreQueue {
    entries: Vec<QueuedScore>,
}

impl ScoreQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a score.
    pub fn push(&mut self, record: ScoreRecord) {
        self.entries.push(QueuedScore::new(record));
    }

    /// Removes and returns every score due at `now`, keeping the rest.
    pub fn take_due(&mut self, now: Instant) -> Vec<QueuedScore> {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|s| s.is_due(now));
        self.entries = waiting;
        due
    }

    /// Puts a failed score back, scheduling its next attempt.
    pub fn requeue(&mut self, mut score: QueuedScore, now: Instant, retry: &RetryConfig) {
        score.attempts = score.attempts.saturating_add(1);
        let key = format!("{}:{}", score.record.leaderboard_id, score.record.date);
        score.next_attempt_at = Some(retry.next_attempt_at(&key, score.attempts, now));
        self.entries.push(score);
    }

    /// Re-attributes queued scores from `from` to `to`. Returns how many
    /// changed.
    pub fn restamp(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for score in self.entries.iter_mut().filter(|s| s.record.player_id == from) {
            score.record.player_id = to.to_string();
            changed += 1;
        }
        changed
    }

    /// Returns the queued scores.
    pub fn records(&self) -> Vec<ScoreRecord> {
        self.entries.iter().map(|s| s.record.clone()).collect()
    }

    /// Iterates over queued entries.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedScore> {
        self.entries.iter()
    }

    /// Returns the number of queued scores.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn retry() -> RetryConfig {
        RetryConfig::new(3)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10))
            .with_jitter(false)
    }

    #[test]
    fn insert_overwrites() {
        let mut queue = PendingQueue::new();
        queue.insert("first_win", 50.0);
        queue.insert("first_win", 100.0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("first_win"), Some(100.0));
    }

    #[test]
    fn take_batch_skips_in_flight_and_respects_limit() {
        let mut queue = PendingQueue::new();
        queue.insert("a", 10.0);
        queue.insert("b", 20.0);
        queue.insert("c", 30.0);

        let first = queue.take_batch(2, |_| true);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "a");
        assert_eq!(queue.in_flight_count(), 2);

        let second = queue.take_batch(10, |_| true);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "c");
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn confirm_keeps_newer_value() {
        let mut queue = PendingQueue::new();
        queue.insert("a", 40.0);
        let batch = queue.take_batch(10, |_| true);

        queue.insert("a", 90.0);
        assert!(!queue.confirm(&batch[0]));
        assert_eq!(queue.get("a"), Some(90.0));
        assert!(!queue.is_in_flight("a"));
    }

    #[test]
    fn confirm_removes_matching_value() {
        let mut queue = PendingQueue::new();
        queue.insert("a", 40.0);
        let batch = queue.take_batch(10, |_| true);
        assert!(queue.confirm(&batch[0]));
        assert!(queue.is_empty());
    }

    #[test]
    fn release_keeps_entry() {
        let mut queue = PendingQueue::new();
        queue.insert("a", 40.0);
        queue.take_batch(10, |_| true);
        queue.release("a");
        assert_eq!(queue.get("a"), Some(40.0));
        assert_eq!(queue.in_flight_count(), 0);
    }

    #[test]
    fn failed_list_backoff() {
        let mut failed = FailedList::new();
        let now = Instant::now();

        let entry = failed.record_failure("a", "timeout", now, &retry());
        assert_eq!(entry.attempts, 1);
        assert!(!failed.is_due("a", now));
        assert!(failed.is_due("a", now + Duration::from_secs(1)));

        failed.record_failure("a", "timeout", now, &retry());
        assert!(!failed.is_due("a", now + Duration::from_secs(1)));
        assert!(failed.is_due("a", now + Duration::from_secs(2)));
        assert_eq!(failed.len(), 1);
    }

    #[test]
    fn failed_list_parks_after_max_attempts() {
        let mut failed = FailedList::new();
        let now = Instant::now();
        for _ in 0..3 {
            failed.record_failure("a", "down", now, &retry());
        }
        let entry = failed.get("a").unwrap();
        assert_eq!(entry.attempts, 3);
        assert_eq!(entry.next_attempt_at, Some(now + Duration::from_secs(10)));
    }

    #[test]
    fn failed_list_keeps_order_and_make_due() {
        let mut failed = FailedList::new();
        let now = Instant::now();
        failed.record_failure("b", "x", now, &retry());
        failed.record_failure("a", "x", now, &retry());
        assert_eq!(failed.ids(), vec!["b".to_string(), "a".to_string()]);

        failed.make_due("a");
        assert!(failed.is_due("a", now));
        assert_eq!(failed.get("a").unwrap().attempts, 1);

        assert!(failed.remove("b"));
        assert!(!failed.remove("b"));
        assert_eq!(failed.ids(), vec!["a".to_string()]);
    }

    #[test]
    fn reset_backoff_forgets_failures() {
        let mut failed = FailedList::new();
        let now = Instant::now();
        for _ in 0..3 {
            failed.record_failure("a", "down", now, &retry());
        }

        failed.reset_backoff("a");
        assert!(failed.is_due("a", now));
        assert_eq!(failed.get("a").unwrap().attempts, 0);

        let entry = failed.record_failure("a", "down", now, &retry());
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.next_attempt_at, Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn uncapped_retry_schedules_without_overflow() {
        let uncapped = RetryConfig::new(2).with_max_delay(Duration::MAX);
        let mut failed = FailedList::new();
        let now = Instant::now();
        for _ in 0..4 {
            failed.record_failure("a", "down", now, &uncapped);
        }
        assert!(!failed.is_due("a", now + Duration::from_secs(3600)));

        let mut queue = ScoreQueue::new();
        queue.push(ScoreRecord::new("p1", "high", Utc::now(), 10.0, "10"));
        for _ in 0..4 {
            let due = queue.take_due(now + crate::config::LONGEST_WAIT);
            for score in due {
                queue.requeue(score, now, &uncapped);
            }
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn restamp_only_touches_matching_player() {
        let mut queue = ScoreQueue::new();
        queue.push(ScoreRecord::new("local", "high", Utc::now(), 10.0, "10"));
        queue.push(ScoreRecord::new("p2", "high", Utc::now(), 20.0, "20"));

        assert_eq!(queue.restamp("local", "p1"), 1);
        let players: Vec<String> = queue.records().into_iter().map(|s| s.player_id).collect();
        assert_eq!(players, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn restore_deduplicates() {
        let failed = FailedList::restore(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(failed.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(failed.is_due("a", Instant::now()));
    }

    #[test]
    fn score_queue_requeue_waits() {
        let mut queue = ScoreQueue::new();
        let now = Instant::now();
        queue.push(ScoreRecord::new("p1", "high", Utc::now(), 10.0, "10"));

        let due = queue.take_due(now);
        assert_eq!(due.len(), 1);
        assert!(queue.is_empty());

        for score in due {
            queue.requeue(score, now, &retry());
        }
        assert_eq!(queue.len(), 1);
        assert!(queue.take_due(now).is_empty());
        assert_eq!(queue.take_due(now + Duration::from_secs(1)).len(), 1);
    }
}
