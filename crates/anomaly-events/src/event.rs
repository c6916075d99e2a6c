//! Scheduler Event Types
//!
//! Machine-readable record of everything the scheduler decided, written as
//! one JSON object per line.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::definition::AnomalyCategory;

/// Identity of one spawned anomaly instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Builds an id from 16 random bytes (seeded callers get reproducible ids).
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        InstanceId(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Why a spawn attempt did not produce an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The global concurrent limit is reached
    GlobalCap,
    /// Every room is at capacity
    NoEligibleRoom,
    /// No definition passed the filters for the picked room
    NoCandidates,
    /// Filter and resolver disagreed about spawn points
    SpawnPointFault,
}

/// Why an instance gave up during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// No prop of the required group exists in the room
    NoTarget,
    /// Every matching prop is controlled by another anomaly
    TargetLocked,
    /// No usable destination marker
    NoDestination,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoTarget => write!(f, "no target"),
            AbortReason::TargetLocked => write!(f, "target locked"),
            AbortReason::NoDestination => write!(f, "no destination"),
        }
    }
}

/// What ended an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveCause {
    /// A player report matched it
    Reported,
    /// Its own auto-resolve timer ran out
    Timeout,
    /// Manager-driven cleanup
    Forced,
}

/// Payload of a scheduler event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEventKind {
    Spawned {
        instance: InstanceId,
        anomaly_id: String,
        room_id: String,
        spawn_point: Option<String>,
        target: Option<String>,
        forced: bool,
    },
    SpawnSkipped {
        reason: SkipReason,
        room_id: Option<String>,
    },
    InitAborted {
        anomaly_id: String,
        room_id: String,
        reason: AbortReason,
    },
    Resolved {
        instance: InstanceId,
        anomaly_id: String,
        room_id: String,
        cause: ResolveCause,
    },
    ReportChecked {
        room_id: String,
        category: Option<AnomalyCategory>,
        key: Option<String>,
        matched: Option<InstanceId>,
    },
    AggressionChanged {
        from: u8,
        to: u8,
        active: usize,
    },
    Won,
}

/// One entry in the scheduler event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerEvent {
    /// Monotonic sequence number within a run
    pub sequence: u64,
    /// Game clock (seconds) when the event happened
    pub clock: f64,
    #[serde(flatten)]
    pub kind: SchedulerEventKind,
}

impl SchedulerEvent {
    pub fn new(sequence: u64, clock: f64, kind: SchedulerEventKind) -> Self {
        Self { sequence, clock, kind }
    }

    /// Serializes the event as a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses an event from a single JSONL line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Returns the instance this event concerns, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        match &self.kind {
            SchedulerEventKind::Spawned { instance, .. }
            | SchedulerEventKind::Resolved { instance, .. } => Some(*instance),
            SchedulerEventKind::ReportChecked { matched, .. } => *matched,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_jsonl_shape() {
        let id = InstanceId::from_random_bytes([7; 16]);
        let event = SchedulerEvent::new(
            3,
            12.5,
            SchedulerEventKind::Resolved {
                instance: id,
                anomaly_id: "move_vase".to_string(),
                room_id: "room_kitchen".to_string(),
                cause: ResolveCause::Reported,
            },
        );

        let line = event.to_jsonl().unwrap();
        assert!(line.contains(r#""event":"resolved""#));
        assert!(line.contains(r#""cause":"reported""#));
        assert!(!line.contains('\n'));

        let parsed = SchedulerEvent::from_jsonl(&line).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.instance(), Some(id));
    }

    #[test]
    fn test_instance_id_is_reproducible() {
        let a = InstanceId::from_random_bytes([1; 16]);
        let b = InstanceId::from_random_bytes([1; 16]);
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 32);
    }

    #[test]
    fn test_won_has_no_instance() {
        let event = SchedulerEvent::new(0, 420.0, SchedulerEventKind::Won);
        assert_eq!(event.instance(), None);
        assert_eq!(event.to_jsonl().unwrap(), r#"{"sequence":0,"clock":420.0,"event":"won"}"#);
    }
}
