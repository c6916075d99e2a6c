//! Anomaly spawn and lifecycle scheduling.
//!
//! The [`Scheduler`] ticks a game clock, admits anomalies into capacity-bound
//! rooms under cooldown, anti-repeat and spawn point rules, keeps exclusive
//! ownership of the props they disturb, and derives an aggression level from
//! the live count.

pub mod aggression;
pub mod catalog;
pub mod config;
pub mod error;
pub mod instance;
pub mod lock;
pub mod logger;
pub mod room;
pub mod scheduler;
pub mod selection;
pub mod signals;

pub use aggression::{AggressionStep, AggressionTable, MAX_AGGRESSION};
pub use catalog::Catalog;
pub use config::{default_world_toml, ConfigError, SchedulerConfig, WorldConfig};
pub use error::{CatalogError, SpawnError};
pub use instance::{AnomalyInstance, ControlledProp, LifecycleState, MotionPhase, Resolution};
pub use lock::{TargetGuard, TargetId, TargetLock};
pub use logger::EventLogger;
pub use room::{Marker, Prop, Room, RoomRegistry, SpawnPoint};
pub use scheduler::{find_report_match, Scheduler, SpawnOutcome};
pub use selection::weighted_pick;
pub use signals::{GameSignals, NullSignals, RecordingSignals};
