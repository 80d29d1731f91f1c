//! The logical save/load shape of the local progress cache.
//!
//! A snapshot is plain data. Hosts persist it however they like; CBOR and
//! JSON helpers are provided for the common cases.

use crate::error::{ProtocolError, ProtocolResult};
use crate::score::ScoreRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Saved engine state.
///
/// Every field defaults when absent, so snapshots written by older builds
/// (or hand-written ones holding only `achievements`) still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u16,
    /// Player the snapshot was saved under, if any player had authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Achievement id to completion percentage.
    #[serde(default)]
    pub achievements: BTreeMap<String, f64>,
    /// Achievement values not yet confirmed by the remote service.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending: BTreeMap<String, f64>,
    /// Ids whose last submission failed, oldest failure first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
    /// Player whose remote achievements still need a reset-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_pending_for: Option<String>,
    /// Scores not yet confirmed by the remote service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queued_scores: Vec<ScoreRecord>,
    /// Scores recorded on this device, per leaderboard.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub leaderboards: BTreeMap<String, Vec<ScoreRecord>>,
}

fn default_version() -> u16 {
    SNAPSHOT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            player_id: None,
            achievements: BTreeMap::new(),
            pending: BTreeMap::new(),
            failed: Vec::new(),
            reset_pending_for: None,
            queued_scores: Vec::new(),
            leaderboards: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    /// Creates a snapshot holding only achievement percentages.
    pub fn from_achievements(achievements: BTreeMap<String, f64>) -> Self {
        Self {
            achievements,
            ..Self::default()
        }
    }

    /// Encodes to CBOR.
    pub fn to_cbor(&self) -> ProtocolResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| ProtocolError::Cbor(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes from CBOR.
    pub fn from_cbor(bytes: &[u8]) -> ProtocolResult<Self> {
        let snapshot: Self =
            ciborium::from_reader(bytes).map_err(|e| ProtocolError::Cbor(e.to_string()))?;
        snapshot.check_version()
    }

    /// Encodes to pretty-printed JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes from JSON.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        snapshot.check_version()
    }

    fn check_version(self) -> ProtocolResult<Self> {
        if self.version > SNAPSHOT_VERSION {
            return Err(ProtocolError::invalid_structure(format!(
                "snapshot version {} is newer than supported version {}",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(self)
    }
}
