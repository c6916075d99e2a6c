//! Anomaly Definitions
//!
//! Immutable catalog records describing how each anomaly type may spawn.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::room::Rgb;

/// Report category an anomaly belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    ObjectMovement,
    ColorChange,
    ExtraObject,
    MissingObject,
    Intruder,
}

impl AnomalyCategory {
    /// Returns all category variants in report-menu order.
    pub fn all() -> &'static [AnomalyCategory] {
        &[
            AnomalyCategory::ObjectMovement,
            AnomalyCategory::ColorChange,
            AnomalyCategory::ExtraObject,
            AnomalyCategory::MissingObject,
            AnomalyCategory::Intruder,
        ]
    }

    /// Maps a report-menu index to a category.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }
}

impl fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyCategory::ObjectMovement => write!(f, "object_movement"),
            AnomalyCategory::ColorChange => write!(f, "color_change"),
            AnomalyCategory::ExtraObject => write!(f, "extra_object"),
            AnomalyCategory::MissingObject => write!(f, "missing_object"),
            AnomalyCategory::Intruder => write!(f, "intruder"),
        }
    }
}

/// What a forced resolve does to an object that is out of place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    /// Put the object back immediately and finish in the same call
    #[default]
    Snap,
    /// Play the return motion; the instance stays `Resolving` until it lands
    Animate,
}

/// An object that simply appears at the chosen spawn point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSpec {
    /// Seconds after activation before the anomaly clears itself (0 = never)
    pub auto_resolve_after: f64,
}

/// Relocates a prop to one of the room's destination markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovedObjectSpec {
    /// Prop group to move, e.g. "laptop"
    pub target_group: String,
    /// Marker group the prop may be moved to
    pub destination_group: String,
    /// Pick the farthest marker instead of a random one
    pub choose_farthest: bool,
    /// Seconds the outward motion takes
    pub move_out: f64,
    /// Seconds the return motion takes
    pub move_back: f64,
    /// Rotate the prop to the marker orientation as well
    pub copy_rotation: bool,
    pub return_policy: ReturnPolicy,
    pub auto_resolve_after: f64,
}

impl Default for MovedObjectSpec {
    fn default() -> Self {
        Self {
            target_group: "default".to_string(),
            destination_group: "default".to_string(),
            choose_farthest: true,
            move_out: 0.7,
            move_back: 0.7,
            copy_rotation: false,
            return_policy: ReturnPolicy::Snap,
            auto_resolve_after: 0.0,
        }
    }
}

/// Tints a prop with a colour that differs from its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorChangeSpec {
    pub target_group: String,
    /// Fixed tint; `None` draws a random bright colour
    pub tint: Option<Rgb>,
    pub auto_resolve_after: f64,
}

impl Default for ColorChangeSpec {
    fn default() -> Self {
        Self {
            target_group: "default".to_string(),
            tint: None,
            auto_resolve_after: 0.0,
        }
    }
}

/// The closed set of anomaly behaviours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalyKind {
    Placement(PlacementSpec),
    MovedObject(MovedObjectSpec),
    ColorChange(ColorChangeSpec),
}

impl AnomalyKind {
    /// Prop group the kind takes control of, if any.
    pub fn target_group(&self) -> Option<&str> {
        match self {
            AnomalyKind::Placement(_) => None,
            AnomalyKind::MovedObject(spec) => Some(&spec.target_group),
            AnomalyKind::ColorChange(spec) => Some(&spec.target_group),
        }
    }

    /// Marker group the kind needs in the room, if any.
    pub fn destination_group(&self) -> Option<&str> {
        match self {
            AnomalyKind::MovedObject(spec) => Some(&spec.destination_group),
            _ => None,
        }
    }

    /// Self-timeout in seconds; 0 disables it.
    pub fn auto_resolve_after(&self) -> f64 {
        match self {
            AnomalyKind::Placement(spec) => spec.auto_resolve_after,
            AnomalyKind::MovedObject(spec) => spec.auto_resolve_after,
            AnomalyKind::ColorChange(spec) => spec.auto_resolve_after,
        }
    }
}

impl Default for AnomalyKind {
    fn default() -> Self {
        AnomalyKind::Placement(PlacementSpec::default())
    }
}

fn default_weight() -> f32 {
    1.0
}

fn default_max_time() -> f64 {
    f64::MAX
}

fn default_true() -> bool {
    true
}

/// Catalog entry for one anomaly type. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDefinition {
    /// Unique id, e.g. "move_vase"
    pub id: String,
    pub category: AnomalyCategory,
    /// Relative spawn probability; negative values count as zero
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Earliest game-clock second the anomaly may spawn
    #[serde(default)]
    pub min_time: f64,
    /// Latest game-clock second the anomaly may spawn
    #[serde(default = "default_max_time")]
    pub max_time: f64,
    #[serde(default = "default_true")]
    pub allow_repeat_in_same_room: bool,
    /// Seconds after resolving before any room may spawn it again
    #[serde(default)]
    pub global_cooldown: f64,
    /// Seconds after resolving before the same room may spawn it again
    #[serde(default)]
    pub per_room_cooldown: f64,
    #[serde(default)]
    pub requires_specific_spawn_points: bool,
    /// Spawn point tags this anomaly accepts
    #[serde(default)]
    pub allowed_spawn_tags: Vec<String>,
    #[serde(default)]
    pub kind: AnomalyKind,
}

impl AnomalyDefinition {
    /// Creates a placement definition with permissive defaults.
    pub fn new(id: impl Into<String>, category: AnomalyCategory) -> Self {
        Self {
            id: id.into(),
            category,
            weight: default_weight(),
            min_time: 0.0,
            max_time: default_max_time(),
            allow_repeat_in_same_room: true,
            global_cooldown: 0.0,
            per_room_cooldown: 0.0,
            requires_specific_spawn_points: false,
            allowed_spawn_tags: Vec::new(),
            kind: AnomalyKind::default(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_time_window(mut self, min_time: f64, max_time: f64) -> Self {
        self.min_time = min_time;
        self.max_time = max_time;
        self
    }

    pub fn with_cooldowns(mut self, global: f64, per_room: f64) -> Self {
        self.global_cooldown = global;
        self.per_room_cooldown = per_room;
        self
    }

    pub fn with_repeat_in_same_room(mut self, allow: bool) -> Self {
        self.allow_repeat_in_same_room = allow;
        self
    }

    /// Restricts spawning to points carrying one of `tags`.
    pub fn with_spawn_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires_specific_spawn_points = true;
        self.allowed_spawn_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kind(mut self, kind: AnomalyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Weight clamped to be non-negative.
    pub fn effective_weight(&self) -> f32 {
        self.weight.max(0.0)
    }

    /// True when `clock` lies inside the eligibility window (inclusive).
    pub fn in_time_window(&self, clock: f64) -> bool {
        clock >= self.min_time && clock <= self.max_time
    }

    /// True when a spawn point with `tag` is acceptable for this definition.
    pub fn accepts_tag(&self, tag: &str) -> bool {
        !self.requires_specific_spawn_points || self.allowed_spawn_tags.iter().any(|t| t == tag)
    }
}
