//! Room Registry
//!
//! Runtime view of the rooms: capacity, live anomaly count, spawn points and
//! the mutable state of every controllable prop.

use std::collections::{HashMap, HashSet};

use anomaly_events::{AnomalyDefinition, AnomalyKind, Pose, Rgb, RoomSpec};

use crate::error::CatalogError;
use crate::lock::TargetId;

/// A tagged spawn location. `room_id` points back at the owning room.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub room_id: String,
    pub tag: String,
    pub pose: Pose,
}

/// A controllable prop and its current, possibly disturbed, state.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub id: TargetId,
    pub group: String,
    /// Pose the prop was authored with
    pub home: Pose,
    pub pose: Pose,
    /// Tint the prop was authored with
    pub base_tint: Rgb,
    pub tint: Rgb,
}

impl Prop {
    /// True when the prop shows no disturbance.
    pub fn is_undisturbed(&self) -> bool {
        self.pose == self.home && self.tint == self.base_tint
    }
}

/// Destination a moved prop may be sent to.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub group: String,
    pub pose: Pose,
}

/// One room at runtime.
#[derive(Debug, Clone)]
pub struct Room {
    id: String,
    capacity: usize,
    origin: Pose,
    live_count: usize,
    spawn_points: Vec<SpawnPoint>,
    props: Vec<Prop>,
    markers: Vec<Marker>,
}

impl Room {
    fn from_spec(spec: RoomSpec) -> Self {
        let spawn_points = spec
            .spawn_points
            .into_iter()
            .map(|sp| SpawnPoint {
                room_id: spec.id.clone(),
                tag: sp.tag,
                pose: sp.pose,
            })
            .collect();
        let props = spec
            .props
            .into_iter()
            .map(|p| Prop {
                id: TargetId(p.id),
                group: p.group,
                home: p.pose,
                pose: p.pose,
                base_tint: p.tint,
                tint: p.tint,
            })
            .collect();
        let markers = spec
            .markers
            .into_iter()
            .map(|m| Marker {
                group: m.group,
                pose: m.pose,
            })
            .collect();

        Self {
            id: spec.id,
            capacity: spec.capacity,
            origin: spec.origin,
            live_count: 0,
            spawn_points,
            props,
            markers,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn origin(&self) -> Pose {
        self.origin
    }

    /// Anomalies currently live in this room.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn has_capacity(&self) -> bool {
        self.live_count < self.capacity
    }

    pub(crate) fn increment_live(&mut self) {
        self.live_count += 1;
    }

    pub(crate) fn decrement_live(&mut self) {
        self.live_count = self.live_count.saturating_sub(1);
    }

    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    /// Spawn points acceptable for `definition`, in room order.
    pub fn matching_spawn_points(&self, definition: &AnomalyDefinition) -> Vec<&SpawnPoint> {
        self.spawn_points
            .iter()
            .filter(|sp| definition.accepts_tag(&sp.tag))
            .collect()
    }

    /// True when `definition` can be placed here. Definitions without a
    /// spawn point requirement always qualify.
    pub fn has_valid_spawn_point(&self, definition: &AnomalyDefinition) -> bool {
        !definition.requires_specific_spawn_points
            || self.spawn_points.iter().any(|sp| definition.accepts_tag(&sp.tag))
    }

    /// True when the room contains whatever props and markers `kind` needs.
    pub fn supports(&self, kind: &AnomalyKind) -> bool {
        let has_target = match kind.target_group() {
            Some(group) => self.props.iter().any(|p| p.group == group),
            None => true,
        };
        let has_destination = match kind.destination_group() {
            Some(group) => self.markers_in(group).next().is_some(),
            None => true,
        };
        has_target && has_destination
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn prop(&self, id: &TargetId) -> Option<&Prop> {
        self.props.iter().find(|p| &p.id == id)
    }

    pub(crate) fn prop_at(&self, index: usize) -> &Prop {
        &self.props[index]
    }

    pub(crate) fn prop_at_mut(&mut self, index: usize) -> &mut Prop {
        &mut self.props[index]
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Markers of `group`; an empty group name matches every marker.
    pub fn markers_in<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers
            .iter()
            .filter(move |m| group.is_empty() || m.group == group)
    }
}

/// All rooms, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Vec<Room>,
    by_id: HashMap<String, usize>,
}

impl RoomRegistry {
    /// Validates the room specs and builds the registry. Prop ids must be
    /// unique across every room since they double as lock identities.
    pub fn from_specs(specs: impl IntoIterator<Item = RoomSpec>) -> Result<Self, CatalogError> {
        let mut registry = RoomRegistry::default();
        let mut prop_ids = HashSet::new();

        for spec in specs {
            if spec.id.trim().is_empty() {
                return Err(CatalogError::EmptyRoomId);
            }
            if registry.by_id.contains_key(&spec.id) {
                return Err(CatalogError::DuplicateRoom(spec.id));
            }
            if spec.capacity == 0 {
                return Err(CatalogError::ZeroCapacity(spec.id));
            }
            for prop in &spec.props {
                if !prop_ids.insert(prop.id.clone()) {
                    return Err(CatalogError::DuplicateProp(prop.id.clone()));
                }
            }
            registry.by_id.insert(spec.id.clone(), registry.rooms.len());
            registry.rooms.push(Room::from_spec(spec));
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.by_id.get(id).map(|&index| &self.rooms[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn at(&self, index: usize) -> &Room {
        &self.rooms[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut Room {
        &mut self.rooms[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Indices of rooms below capacity, in registry order.
    pub fn eligible_indices(&self) -> Vec<usize> {
        self.rooms
            .iter()
            .enumerate()
            .filter(|(_, room)| room.has_capacity())
            .map(|(index, _)| index)
            .collect()
    }

    /// Sum of live counts over every room.
    pub fn total_live(&self) -> usize {
        self.rooms.iter().map(Room::live_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_events::{
        AnomalyCategory, MarkerSpec, MovedObjectSpec, PropSpec, SpawnPointSpec,
    };

    fn kitchen() -> RoomSpec {
        RoomSpec::new("kitchen", 2)
            .with_spawn_point(SpawnPointSpec::new("table"))
            .with_spawn_point(SpawnPointSpec::new("counter"))
            .with_prop(PropSpec::new("kitchen_vase", "vase"))
            .with_marker(MarkerSpec::new("shelf", Pose::at(2.0, 1.0, 0.0)))
    }

    #[test]
    fn test_registry_lookup() {
        let registry = RoomRegistry::from_specs(vec![kitchen(), RoomSpec::new("hall", 1)]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.index_of("hall"), Some(1));
        assert_eq!(registry.get("kitchen").unwrap().spawn_points()[1].tag, "counter");
        assert_eq!(registry.get("kitchen").unwrap().spawn_points()[1].room_id, "kitchen");
        assert!(registry.get("attic").is_none());
    }

    #[test]
    fn test_registry_rejects_bad_rooms() {
        assert_eq!(
            RoomRegistry::from_specs(vec![kitchen(), kitchen()]).unwrap_err(),
            CatalogError::DuplicateRoom("kitchen".to_string())
        );
        assert_eq!(
            RoomRegistry::from_specs(vec![RoomSpec::new("void", 0)]).unwrap_err(),
            CatalogError::ZeroCapacity("void".to_string())
        );

        let twin = RoomSpec::new("hall", 1).with_prop(PropSpec::new("kitchen_vase", "vase"));
        assert_eq!(
            RoomRegistry::from_specs(vec![kitchen(), twin]).unwrap_err(),
            CatalogError::DuplicateProp("kitchen_vase".to_string())
        );
    }

    #[test]
    fn test_live_count_floors_at_zero() {
        let mut registry = RoomRegistry::from_specs(vec![kitchen()]).unwrap();
        let room = registry.at_mut(0);
        room.increment_live();
        room.decrement_live();
        room.decrement_live();
        assert_eq!(room.live_count(), 0);
    }

    #[test]
    fn test_eligible_rooms_respect_capacity() {
        let mut registry = RoomRegistry::from_specs(vec![kitchen(), RoomSpec::new("hall", 1)]).unwrap();
        registry.at_mut(1).increment_live();
        assert_eq!(registry.eligible_indices(), vec![0]);
        assert_eq!(registry.total_live(), 1);
    }

    #[test]
    fn test_spawn_point_matching() {
        let registry = RoomRegistry::from_specs(vec![kitchen()]).unwrap();
        let room = registry.at(0);

        let on_table = AnomalyDefinition::new("vase", AnomalyCategory::ExtraObject).with_spawn_tags(["table"]);
        assert!(room.has_valid_spawn_point(&on_table));
        assert_eq!(room.matching_spawn_points(&on_table).len(), 1);

        let on_bed = AnomalyDefinition::new("ghost", AnomalyCategory::Intruder).with_spawn_tags(["bed"]);
        assert!(!room.has_valid_spawn_point(&on_bed));

        let anywhere = AnomalyDefinition::new("draft", AnomalyCategory::Intruder);
        assert!(room.has_valid_spawn_point(&anywhere));
    }

    #[test]
    fn test_room_support_for_moved_objects() {
        let registry = RoomRegistry::from_specs(vec![kitchen()]).unwrap();
        let room = registry.at(0);

        let vase_to_shelf = AnomalyKind::MovedObject(MovedObjectSpec {
            target_group: "vase".to_string(),
            destination_group: "shelf".to_string(),
            ..MovedObjectSpec::default()
        });
        assert!(room.supports(&vase_to_shelf));

        let vase_to_floor = AnomalyKind::MovedObject(MovedObjectSpec {
            target_group: "vase".to_string(),
            destination_group: "floor".to_string(),
            ..MovedObjectSpec::default()
        });
        assert!(!room.supports(&vase_to_floor));
        assert!(room.supports(&AnomalyKind::default()));
    }
}
