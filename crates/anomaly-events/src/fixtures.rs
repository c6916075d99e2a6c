//! Sample data fixtures for testing.
//!
//! This module provides ready-made worlds for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // anomaly-events = { path = "../anomaly-events", features = ["test-fixtures"] }
//!
//! use anomaly_events::fixtures;
//!
//! let world = fixtures::sample_world();
//! let (rooms, catalog) = fixtures::kitchen_vase();
//! ```

use serde::Deserialize;

use crate::{AnomalyCategory, AnomalyDefinition, RoomSpec, SpawnPointSpec};

/// Rooms and catalog loaded together.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleWorld {
    pub rooms: Vec<RoomSpec>,
    pub anomalies: Vec<AnomalyDefinition>,
}

/// Returns the sample house from the fixtures file.
///
/// Contains:
/// - 3 rooms (kitchen, living room, bedroom) with props and markers
/// - 7 anomalies covering every kind and category except missing objects
pub fn sample_world() -> SampleWorld {
    let json = include_str!("../tests/fixtures/sample_world.json");
    serde_json::from_str(json).expect("Failed to parse sample_world.json")
}

/// A kitchen with capacity 2 and a single "table" spawn point, plus a "vase"
/// placement that requires that tag.
pub fn kitchen_vase() -> (Vec<RoomSpec>, Vec<AnomalyDefinition>) {
    let rooms = vec![RoomSpec::new("kitchen", 2).with_spawn_point(SpawnPointSpec::new("table"))];
    let catalog = vec![AnomalyDefinition::new("vase", AnomalyCategory::ExtraObject)
        .with_weight(1.0)
        .with_spawn_tags(["table"])];
    (rooms, catalog)
}

/// A single room of the given capacity with one untagged-friendly spawn point
/// and two placement definitions `a` and `b`.
pub fn two_placements(capacity: usize) -> (Vec<RoomSpec>, Vec<AnomalyDefinition>) {
    let rooms = vec![RoomSpec::new("kitchen", capacity)
        .with_spawn_point(SpawnPointSpec::new("table"))
        .with_spawn_point(SpawnPointSpec::new("floor"))];
    let catalog = vec![
        AnomalyDefinition::new("a", AnomalyCategory::ExtraObject),
        AnomalyDefinition::new("b", AnomalyCategory::Intruder),
    ];
    (rooms, catalog)
}
