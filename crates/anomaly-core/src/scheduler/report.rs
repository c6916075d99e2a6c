//! Reporting
//!
//! Maps a player report to the active instance it refers to. Matching runs
//! in strict priority passes over the room's active instances:
//!
//! 1. exact anomaly id
//! 2. target key (prop group, prop id, or a placement's spawn point tag)
//! 3. category
//! 4. anything, only when neither key nor category was given
//!
//! Instances already resolving are skipped.

use anomaly_events::{AnomalyCategory, InstanceId, ResolveCause, SchedulerEventKind};

use crate::instance::{AnomalyInstance, LifecycleState};
use crate::lock::TargetId;
use crate::signals::GameSignals;

use super::Scheduler;

/// Finds the instance a report refers to. Empty keys count as absent.
pub fn find_report_match(
    instances: &[AnomalyInstance],
    room_id: &str,
    category: Option<AnomalyCategory>,
    key: Option<&str>,
) -> Option<InstanceId> {
    let key = key.filter(|k| !k.is_empty());
    let in_room = move || {
        instances
            .iter()
            .filter(move |i| i.room_id() == room_id && i.state() == LifecycleState::Active)
    };

    if let Some(key) = key {
        if let Some(found) = in_room().find(|i| i.anomaly_id() == key) {
            return Some(found.id());
        }
        if let Some(found) = in_room().find(|i| i.matches_target_key(key)) {
            return Some(found.id());
        }
    }
    if let Some(category) = category {
        if let Some(found) = in_room().find(|i| i.definition().category == category) {
            return Some(found.id());
        }
    }
    if key.is_none() && category.is_none() {
        return in_room().next().map(AnomalyInstance::id);
    }
    None
}

impl<G: GameSignals> Scheduler<G> {
    /// Resolves the active instance in `room_id` that the report describes.
    /// Returns false when nothing matches or the room is unknown.
    pub fn check_report(
        &mut self,
        room_id: &str,
        category: Option<AnomalyCategory>,
        key: Option<&str>,
    ) -> bool {
        let key = key.filter(|k| !k.is_empty());
        if self.rooms.get(room_id).is_none() {
            tracing::debug!("report for unknown room '{}'", room_id);
            return false;
        }

        let matched = find_report_match(&self.active, room_id, category, key);
        self.record(SchedulerEventKind::ReportChecked {
            room_id: room_id.to_string(),
            category,
            key: key.map(str::to_string),
            matched,
        });

        match matched {
            Some(id) => {
                tracing::info!("report in '{}' matched {}", room_id, id);
                self.resolve_instance(id, ResolveCause::Reported)
            }
            None => {
                tracing::debug!(
                    "report in '{}' matched nothing (category={:?}, key={:?})",
                    room_id,
                    category,
                    key
                );
                false
            }
        }
    }

    /// Resolves whichever instance controls `target`, the capture path used
    /// when the player photographs a prop directly.
    pub fn report_target(&mut self, target: &TargetId) -> bool {
        let owner = self.prop_owner(target).filter(|&id| {
            self.instance(id)
                .is_some_and(|i| i.state() == LifecycleState::Active)
        });
        match owner {
            Some(id) => self.resolve_instance(id, ResolveCause::Reported),
            None => {
                tracing::debug!("no anomaly controls '{}'", target);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::config::SchedulerConfig;
    use crate::instance::LifecycleState;
    use crate::lock::TargetId;
    use crate::room::RoomRegistry;
    use crate::scheduler::Scheduler;
    use crate::signals::NullSignals;
    use anomaly_events::{
        AnomalyCategory, AnomalyDefinition, AnomalyKind, ColorChangeSpec, MarkerSpec,
        MovedObjectSpec, Pose, PropSpec, ReturnPolicy, RoomSpec, SpawnPointSpec,
    };

    fn living_room() -> Scheduler<NullSignals> {
        let rooms = vec![
            RoomSpec::new("living", 3)
                .with_spawn_point(SpawnPointSpec::new("sofa"))
                .with_prop(PropSpec::new("living_laptop", "laptop"))
                .with_prop(PropSpec::new("living_mirror", "mirror"))
                .with_marker(MarkerSpec::new("default", Pose::at(2.0, 0.0, 0.0))),
            RoomSpec::new("hall", 1),
        ];
        let anomalies = vec![
            AnomalyDefinition::new("laptop_color", AnomalyCategory::ColorChange).with_kind(
                AnomalyKind::ColorChange(ColorChangeSpec {
                    target_group: "laptop".to_string(),
                    ..ColorChangeSpec::default()
                }),
            ),
            AnomalyDefinition::new("mirror_color", AnomalyCategory::ColorChange).with_kind(
                AnomalyKind::ColorChange(ColorChangeSpec {
                    target_group: "mirror".to_string(),
                    ..ColorChangeSpec::default()
                }),
            ),
            AnomalyDefinition::new("doll", AnomalyCategory::ExtraObject).with_spawn_tags(["sofa"]),
            AnomalyDefinition::new("slow_mirror", AnomalyCategory::ObjectMovement).with_kind(
                AnomalyKind::MovedObject(MovedObjectSpec {
                    target_group: "mirror".to_string(),
                    return_policy: ReturnPolicy::Animate,
                    move_out: 0.5,
                    move_back: 1.0,
                    ..MovedObjectSpec::default()
                }),
            ),
        ];
        let config = SchedulerConfig {
            global_max_concurrent: 3,
            base_spawn_interval: 1_000.0,
            spawn_jitter: 0.0,
            seed: Some(3),
            ..SchedulerConfig::default()
        };
        Scheduler::new(
            config,
            RoomRegistry::from_specs(rooms).unwrap(),
            Catalog::from_definitions(anomalies).unwrap(),
            NullSignals,
        )
        .unwrap()
    }

    #[test]
    fn test_report_by_anomaly_id() {
        let mut scheduler = living_room();
        scheduler.force_spawn("living", "laptop_color").unwrap();
        let mirror = scheduler.force_spawn("living", "mirror_color").unwrap();

        assert!(scheduler.check_report("living", None, Some("mirror_color")));
        assert!(scheduler.instance(mirror).is_none());
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_report_by_target_key() {
        let mut scheduler = living_room();
        let laptop = scheduler.force_spawn("living", "laptop_color").unwrap();
        scheduler.force_spawn("living", "mirror_color").unwrap();

        assert!(scheduler.check_report("living", None, Some("laptop")));
        assert!(scheduler.instance(laptop).is_none());
        assert!(scheduler.rooms().get("living").unwrap().props()[0].is_undisturbed());
    }

    #[test]
    fn test_report_by_spawn_point_tag() {
        let mut scheduler = living_room();
        let doll = scheduler.force_spawn("living", "doll").unwrap();
        assert!(scheduler.check_report("living", None, Some("sofa")));
        assert!(scheduler.instance(doll).is_none());
    }

    #[test]
    fn test_key_matches_anomaly_id_or_prop_id() {
        let mut scheduler = living_room();
        let laptop = scheduler.force_spawn("living", "laptop_color").unwrap();
        let doll = scheduler.force_spawn("living", "doll").unwrap();

        let found = super::find_report_match(scheduler.active(), "living", None, Some("doll"));
        assert_eq!(found, Some(doll));
        let found = super::find_report_match(scheduler.active(), "living", None, Some("living_laptop"));
        assert_eq!(found, Some(laptop));
    }

    #[test]
    fn test_category_fallback_and_any() {
        let mut scheduler = living_room();
        let laptop = scheduler.force_spawn("living", "laptop_color").unwrap();
        let doll = scheduler.force_spawn("living", "doll").unwrap();

        let found = super::find_report_match(
            scheduler.active(),
            "living",
            Some(AnomalyCategory::ExtraObject),
            Some("unrelated"),
        );
        assert_eq!(found, Some(doll));

        let found = super::find_report_match(scheduler.active(), "living", None, None);
        assert_eq!(found, Some(laptop));
        let found = super::find_report_match(scheduler.active(), "living", None, Some(""));
        assert_eq!(found, Some(laptop));
    }

    #[test]
    fn test_unmatched_key_does_not_fall_through_to_any() {
        let mut scheduler = living_room();
        scheduler.force_spawn("living", "laptop_color").unwrap();

        assert!(!scheduler.check_report("living", None, Some("vase")));
        assert!(!scheduler.check_report("living", Some(AnomalyCategory::Intruder), None));
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_wrong_or_unknown_room() {
        let mut scheduler = living_room();
        scheduler.force_spawn("living", "laptop_color").unwrap();

        assert!(!scheduler.check_report("hall", None, None));
        assert!(!scheduler.check_report("attic", None, None));
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_resolving_instances_are_skipped() {
        let mut scheduler = living_room();
        let slow = scheduler.force_spawn("living", "slow_mirror").unwrap();
        scheduler.tick(1.0);

        assert!(scheduler.check_report("living", None, Some("mirror")));
        assert_eq!(scheduler.instance(slow).unwrap().state(), LifecycleState::Resolving);
        assert!(!scheduler.check_report("living", None, Some("mirror")));

        scheduler.tick(1.0);
        assert!(scheduler.instance(slow).is_none());
        assert!(scheduler.locks().is_empty());
    }

    #[test]
    fn test_report_target_resolves_owner() {
        let mut scheduler = living_room();
        let mirror = scheduler.force_spawn("living", "mirror_color").unwrap();

        assert!(!scheduler.report_target(&TargetId::from("living_laptop")));
        assert!(scheduler.report_target(&TargetId::from("living_mirror")));
        assert!(scheduler.instance(mirror).is_none());
        assert!(!scheduler.report_target(&TargetId::from("living_mirror")));
    }
}
