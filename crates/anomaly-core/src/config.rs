//! Configuration loading for the scheduler.
//!
//! Scheduler tuning, rooms and the anomaly catalog are loaded together from a
//! single TOML document.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use anomaly_events::{AnomalyDefinition, RoomSpec};

use crate::aggression::AggressionTable;
use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::room::RoomRegistry;

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on live anomalies across every room
    pub global_max_concurrent: usize,
    /// Mean seconds between spawn attempts
    pub base_spawn_interval: f64,
    /// Uniform jitter applied to the interval, in both directions
    pub spawn_jitter: f64,
    /// Floor for a jittered interval
    pub min_spawn_interval: f64,
    /// Game seconds per tick second
    pub time_scale: f64,
    /// Game clock at which the player wins; 0 disables the win signal
    pub win_time: f64,
    /// How many recent spawns are excluded from the next pick
    pub anti_repeat_buffer: usize,
    /// Seconds after spawning during which the same anomaly is excluded; 0 disables
    pub anti_repeat_window: f64,
    /// RNG seed; absent means seeded from entropy
    pub seed: Option<u64>,
    /// Live count → aggression level table
    pub aggression: AggressionTable,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            global_max_concurrent: 2,
            base_spawn_interval: 6.0,
            spawn_jitter: 2.0,
            min_spawn_interval: 0.05,
            time_scale: 1.0,
            win_time: 420.0,
            anti_repeat_buffer: 2,
            anti_repeat_window: 0.0,
            seed: None,
            aggression: AggressionTable::default(),
        }
    }
}

impl SchedulerConfig {
    /// Rejects settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("base_spawn_interval", self.base_spawn_interval),
            ("spawn_jitter", self.spawn_jitter),
            ("win_time", self.win_time),
            ("anti_repeat_window", self.anti_repeat_window),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidSetting {
                    field,
                    reason: "must be a finite, non-negative number",
                });
            }
        }
        let positive = [
            ("min_spawn_interval", self.min_spawn_interval),
            // A zero scale freezes the clock
            ("time_scale", self.time_scale),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidSetting {
                    field,
                    reason: "must be a finite, positive number",
                });
            }
        }
        Ok(())
    }
}

/// Complete world description: scheduler settings, rooms and catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub rooms: Vec<RoomSpec>,
    #[serde(default)]
    pub anomalies: Vec<AnomalyDefinition>,
}

impl WorldConfig {
    /// Loads a world from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// The built-in three-room house.
    pub fn default_world() -> Result<Self, ConfigError> {
        default_world_toml().parse()
    }

    /// Validates everything and produces the runtime pieces.
    pub fn build(self) -> Result<(SchedulerConfig, RoomRegistry, Catalog), ConfigError> {
        self.scheduler.validate()?;
        let rooms = RoomRegistry::from_specs(self.rooms)?;
        let catalog = Catalog::from_definitions(self.anomalies)?;

        for definition in catalog.iter() {
            let placeable = rooms
                .iter()
                .any(|room| room.has_valid_spawn_point(definition) && room.supports(&definition.kind));
            if !placeable {
                tracing::warn!("anomaly '{}' cannot spawn in any room", definition.id);
            }
        }
        Ok((self.scheduler, rooms, catalog))
    }
}

impl FromStr for WorldConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}

/// Errors that can occur while loading a world.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A ready-made house: kitchen, living room and bedroom.
pub fn default_world_toml() -> &'static str {
    r#"
[scheduler]
global_max_concurrent = 2
base_spawn_interval = 6.0
spawn_jitter = 2.0
win_time = 420.0
anti_repeat_buffer = 2

[[rooms]]
id = "room_kitchen"
capacity = 2
origin = { position = [0.0, 0.0, 0.0] }
spawn_points = [
    { tag = "table", pose = { position = [1.0, 0.8, 1.0] } },
    { tag = "counter", pose = { position = [3.0, 0.9, 0.5] } },
]
props = [
    { id = "kitchen_vase", group = "vase", pose = { position = [1.0, 0.8, 1.2] } },
    { id = "kitchen_kettle", group = "kettle", pose = { position = [3.0, 0.9, 0.4] }, tint = { r = 0.7, g = 0.7, b = 0.75 } },
]
markers = [
    { group = "shelf", pose = { position = [4.0, 1.8, 0.0] } },
    { group = "shelf", pose = { position = [0.5, 1.8, 3.0] } },
]

[[rooms]]
id = "room_living"
capacity = 2
origin = { position = [10.0, 0.0, 0.0] }
spawn_points = [
    { tag = "sofa", pose = { position = [11.0, 0.5, 2.0] } },
    { tag = "floor", pose = { position = [12.5, 0.0, 1.0] } },
]
props = [
    { id = "living_laptop", group = "laptop", pose = { position = [11.0, 0.7, 0.5] }, tint = { r = 0.2, g = 0.2, b = 0.2 } },
    { id = "living_mirror", group = "mirror", pose = { position = [14.0, 1.5, 0.0] } },
]
markers = [
    { group = "default", pose = { position = [13.0, 0.0, 3.0] } },
    { group = "default", pose = { position = [10.5, 1.0, 3.5] } },
]

[[rooms]]
id = "room_bedroom"
capacity = 1
origin = { position = [0.0, 0.0, 10.0] }
spawn_points = [
    { tag = "bed", pose = { position = [1.0, 0.6, 11.0] } },
    { tag = "floor", pose = { position = [2.0, 0.0, 12.0] } },
]
props = [
    { id = "bedroom_lamp", group = "lamp", pose = { position = [0.2, 0.9, 10.5] }, tint = { r = 1.0, g = 0.9, b = 0.6 } },
]

[[anomalies]]
id = "move_vase"
category = "object_movement"
weight = 0.5
global_cooldown = 60.0
per_room_cooldown = 90.0
allow_repeat_in_same_room = false
kind = { type = "moved_object", target_group = "vase", destination_group = "shelf", return_policy = "animate", move_back = 0.5 }

[[anomalies]]
id = "move_laptop"
category = "object_movement"
weight = 0.25
global_cooldown = 45.0
kind = { type = "moved_object", target_group = "laptop", destination_group = "default", choose_farthest = false }

[[anomalies]]
id = "laptop_color"
category = "color_change"
weight = 0.25
min_time = 30.0
global_cooldown = 60.0
kind = { type = "color_change", target_group = "laptop" }

[[anomalies]]
id = "mirror_color"
category = "color_change"
weight = 0.2
per_room_cooldown = 120.0
kind = { type = "color_change", target_group = "mirror", tint = { r = 0.9, g = 0.1, b = 0.1 } }

[[anomalies]]
id = "lamp_color"
category = "color_change"
weight = 0.2
global_cooldown = 30.0
kind = { type = "color_change", target_group = "lamp", auto_resolve_after = 90.0 }

[[anomalies]]
id = "extra_chair"
category = "extra_object"
weight = 0.3
requires_specific_spawn_points = true
allowed_spawn_tags = ["floor"]
per_room_cooldown = 60.0
kind = { type = "placement" }

[[anomalies]]
id = "shadow_figure"
category = "intruder"
weight = 0.15
min_time = 120.0
requires_specific_spawn_points = true
allowed_spawn_tags = ["bed", "sofa"]
allow_repeat_in_same_room = false
kind = { type = "placement", auto_resolve_after = 45.0 }
"#
}
