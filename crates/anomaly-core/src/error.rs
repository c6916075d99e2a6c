//! Error types for catalog validation and diagnostic spawning.

use anomaly_events::AbortReason;
use thiserror::Error;

/// Problems found while validating rooms and anomaly definitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("anomaly id must not be empty")]
    EmptyAnomalyId,
    #[error("duplicate anomaly id '{0}'")]
    DuplicateAnomaly(String),
    #[error("anomaly '{0}' requires specific spawn points but lists no allowed tags")]
    MissingSpawnTags(String),
    #[error("anomaly '{id}' has min_time {min} after max_time {max}")]
    InvertedTimeWindow { id: String, min: f64, max: f64 },
    #[error("anomaly '{id}' has a negative or non-finite {field}")]
    InvalidDuration { id: String, field: &'static str },
    #[error("anomaly '{0}' has a non-finite weight")]
    InvalidWeight(String),
    #[error("anomaly '{0}' targets an empty prop group")]
    EmptyTargetGroup(String),
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("duplicate room id '{0}'")]
    DuplicateRoom(String),
    #[error("room '{0}' has zero capacity")]
    ZeroCapacity(String),
    #[error("duplicate prop id '{0}'")]
    DuplicateProp(String),
}

/// Failures of a diagnostic forced spawn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("unknown room '{0}'")]
    UnknownRoom(String),
    #[error("unknown anomaly '{0}'")]
    UnknownAnomaly(String),
    #[error("no spawn point in room '{room_id}' matches anomaly '{anomaly_id}'")]
    NoSpawnPoint { room_id: String, anomaly_id: String },
    #[error("room '{0}' is at capacity")]
    RoomFull(String),
    #[error("global anomaly limit reached")]
    GlobalCap,
    #[error("anomaly aborted during initialization: {0}")]
    Aborted(AbortReason),
}

impl SpawnError {
    /// True for the unknown-identifier failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SpawnError::UnknownRoom(_) | SpawnError::UnknownAnomaly(_) | SpawnError::NoSpawnPoint { .. }
        )
    }
}
