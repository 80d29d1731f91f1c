//! Messages exchanged with a remote achievement/leaderboard service.

use crate::score::ScoreRecord;
use serde::{Deserialize, Serialize};

/// An authenticated player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Stable player identifier issued by the remote service.
    pub player_id: String,
    /// Display name.
    pub alias: String,
}

impl PlayerIdentity {
    /// Creates a new identity.
    pub fn new(player_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            alias: alias.into(),
        }
    }
}

/// One achievement value to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementSubmission {
    /// Achievement identifier.
    pub id: String,
    /// Percentage to record remotely.
    pub percentage: f64,
}

impl AchievementSubmission {
    /// Creates a submission.
    pub fn new(id: impl Into<String>, percentage: f64) -> Self {
        Self {
            id: id.into(),
            percentage,
        }
    }
}

/// A batch of achievement submissions for one player.
///
/// Remote services are expected to treat a submission as idempotent by
/// `(id, percentage)`: the same batch may be delivered more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementBatch {
    /// Locally assigned batch number, unique per engine instance.
    pub batch_id: u64,
    /// Player the progress belongs to.
    pub player_id: String,
    /// Submissions in queue order.
    pub submissions: Vec<AchievementSubmission>,
}

impl AchievementBatch {
    /// Returns the number of submissions.
    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    /// Returns true if the batch carries nothing.
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}

/// A batch of scores submitted by one authenticated player.
///
/// Each record keeps its own `player_id`. Scores recorded before sign-in are
/// re-attributed to the signed-in player when they authenticate, so a record
/// differs from the batch player only when it was reported for someone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBatch {
    /// Authenticated player submitting the batch.
    pub player_id: String,
    /// Scores in report order.
    pub scores: Vec<ScoreRecord>,
}

/// Outcome for a single item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// The service recorded the item.
    Accepted,
    /// The service did not record the item.
    Rejected {
        /// Reason reported by the service.
        reason: String,
    },
}

impl ItemStatus {
    /// Creates a rejected status.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if the item was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, ItemStatus::Accepted)
    }
}

/// Per-item response to a batch submission.
///
/// `statuses[i]` answers item `i` of the batch. Items without a status are
/// treated as not acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// One status per submitted item, in batch order.
    pub statuses: Vec<ItemStatus>,
}

impl SubmitResponse {
    /// Creates a response accepting `count` items.
    pub fn all_accepted(count: usize) -> Self {
        Self {
            statuses: vec![ItemStatus::Accepted; count],
        }
    }

    /// Creates a response from explicit statuses.
    pub fn new(statuses: Vec<ItemStatus>) -> Self {
        Self { statuses }
    }

    /// Returns the status for item `index`, if the service answered it.
    pub fn status(&self, index: usize) -> Option<&ItemStatus> {
        self.statuses.get(index)
    }

    /// Returns the number of accepted items.
    pub fn accepted_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_accepted()).count()
    }
}
