//! Error types for the reconciliation engine.

use laurel_protocol::ProtocolError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
///
/// Merge conflicts have no variant: they are always resolved by keeping the
/// higher percentage.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Progress was reported for an id outside the configured universe.
    #[error("unknown achievement: {id}")]
    UnknownAchievement {
        /// The reported id.
        id: String,
    },

    /// A score was reported for an unconfigured leaderboard.
    #[error("unknown leaderboard: {id}")]
    UnknownLeaderboard {
        /// The reported leaderboard id.
        id: String,
    },

    /// A reported percentage cannot be ordered (NaN).
    #[error("invalid progress {value} for achievement {id}")]
    InvalidProgress {
        /// Achievement id.
        id: String,
        /// The rejected value.
        value: f64,
    },

    /// A score lies outside its leaderboard's accepted range.
    #[error("score {value} outside [{min}, {max}] for leaderboard {leaderboard_id}")]
    ScoreOutOfRange {
        /// Leaderboard id.
        leaderboard_id: String,
        /// The rejected value.
        value: f64,
        /// Lowest accepted value.
        min: f64,
        /// Highest accepted value.
        max: f64,
    },

    /// No authenticated player is available.
    #[error("authentication unavailable: {0}")]
    AuthenticationUnavailable(String),

    /// The remote service could not be reached or failed.
    #[error("remote unavailable: {message}")]
    RemoteUnavailable {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// Remote sync is switched off for this session or platform.
    #[error("remote sync disabled")]
    SyncDisabled,

    /// The game configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Snapshot or message codec error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl EngineError {
    /// Creates a retryable remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable remote error.
    pub fn remote_fatal(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates an unknown achievement error.
    pub fn unknown_achievement(id: impl Into<String>) -> Self {
        Self::UnknownAchievement { id: id.into() }
    }

    /// Returns true if the failed call can be retried later.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RemoteUnavailable { retryable, .. } => *retryable,
            EngineError::AuthenticationUnavailable(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::remote_retryable("connection lost").is_retryable());
        assert!(!EngineError::remote_fatal("account banned").is_retryable());
        assert!(EngineError::AuthenticationUnavailable("offline".into()).is_retryable());
        assert!(!EngineError::unknown_achievement("x").is_retryable());
        assert!(!EngineError::SyncDisabled.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::unknown_achievement("unknown");
        assert_eq!(err.to_string(), "unknown achievement: unknown");

        let err = EngineError::ScoreOutOfRange {
            leaderboard_id: "high".into(),
            value: 5000.0,
            min: 0.0,
            max: 999.0,
        };
        assert!(err.to_string().contains("5000"));
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn protocol_errors_convert() {
        let err: EngineError = ProtocolError::invalid_structure("bad").into();
        assert!(matches!(err, EngineError::Protocol(_)));
    }
}
