//! Shared data types for the anomaly scheduler.
//!
//! This crate contains pure data structures with no scheduling logic:
//! catalog definitions, room layouts and the scheduler event stream.
//! It is a dependency for all other crates in the workspace.

pub mod definition;
pub mod event;
pub mod room;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export definition types
pub use definition::{
    AnomalyCategory, AnomalyDefinition, AnomalyKind, ColorChangeSpec, MovedObjectSpec,
    PlacementSpec, ReturnPolicy,
};

// Re-export event types
pub use event::{
    AbortReason, InstanceId, ResolveCause, SchedulerEvent, SchedulerEventKind, SkipReason,
};

// Re-export room types
pub use room::{MarkerSpec, Pose, PropSpec, Rgb, RoomSpec, SpawnPointSpec};

// Math types used by poses
pub use glam::{Quat, Vec3};
