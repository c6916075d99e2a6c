//! Room Records
//!
//! Static layout of rooms: spawn points, controllable props and destination
//! markers. Positions are carried through untouched by the scheduler.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position plus orientation. Serialized as `[x, y, z]` and `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            rotation: Quat::IDENTITY,
        }
    }
}

/// Linear RGB colour in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from hue, saturation and value, all in [0, 1].
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = (h.fract() + 1.0).fract() * 6.0;
        let i = h.floor();
        let f = h - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match i as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Rgb { r, g, b }
    }

    pub fn distance(self, other: Rgb) -> f32 {
        let (dr, dg, db) = (self.r - other.r, self.g - other.g, self.b - other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::WHITE
    }
}

/// Tagged location inside a room where an anomaly may be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointSpec {
    /// Logical tag, e.g. "table"
    pub tag: String,
    #[serde(default)]
    pub pose: Pose,
}

impl SpawnPointSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            pose: Pose::default(),
        }
    }
}

/// A controllable prop that anomalies may take over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSpec {
    /// World-unique identity used for target locking
    pub id: String,
    /// Logical group, e.g. "laptop" or "mirror"
    pub group: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub tint: Rgb,
}

impl PropSpec {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            pose: Pose::default(),
            tint: Rgb::WHITE,
        }
    }

    pub fn at(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }
}

fn default_marker_group() -> String {
    "default".to_string()
}

/// Place a moved prop may be relocated to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    #[serde(default = "default_marker_group")]
    pub group: String,
    #[serde(default)]
    pub pose: Pose,
}

impl MarkerSpec {
    pub fn new(group: impl Into<String>, pose: Pose) -> Self {
        Self {
            group: group.into(),
            pose,
        }
    }
}

fn default_capacity() -> usize {
    2
}

/// Static description of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub id: String,
    /// Maximum concurrent anomalies in this room
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub origin: Pose,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointSpec>,
    #[serde(default)]
    pub props: Vec<PropSpec>,
    #[serde(default)]
    pub markers: Vec<MarkerSpec>,
}

impl RoomSpec {
    pub fn new(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            capacity,
            origin: Pose::default(),
            spawn_points: Vec::new(),
            props: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_spawn_point(mut self, spawn_point: SpawnPointSpec) -> Self {
        self.spawn_points.push(spawn_point);
        self
    }

    pub fn with_prop(mut self, prop: PropSpec) -> Self {
        self.props.push(prop);
        self
    }

    pub fn with_marker(mut self, marker: MarkerSpec) -> Self {
        self.markers.push(marker);
        self
    }
}
