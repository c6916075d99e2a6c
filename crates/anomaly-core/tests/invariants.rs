//! Property tests over random tick/report/spawn sequences
//!
//! Capacity, lock exclusivity and world restoration must hold after every
//! operation, whatever order the host drives the scheduler in.

use std::collections::HashSet;

use anomaly_core::{
    LifecycleState, NullSignals, Scheduler, SchedulerConfig, TargetId, WorldConfig,
};
use anomaly_events::fixtures;
use anomaly_events::AnomalyCategory;
use proptest::prelude::*;

const ROOMS: [&str; 3] = ["room_kitchen", "room_living", "room_bedroom"];
const ANOMALIES: [&str; 7] = [
    "move_vase",
    "move_laptop",
    "laptop_color",
    "mirror_color",
    "lamp_color",
    "extra_chair",
    "shadow_figure",
];
const KEYS: [&str; 6] = ["vase", "laptop", "mirror", "move_laptop", "floor", "lamp_color"];

#[derive(Debug, Clone)]
enum Op {
    Tick(f64),
    Attempt,
    Report {
        room: usize,
        category: Option<usize>,
        key: Option<usize>,
    },
    Capture(usize),
    ForceSpawn { room: usize, anomaly: usize },
    ResolveAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.05f64..12.0).prop_map(Op::Tick),
        2 => Just(Op::Attempt),
        2 => (0..ROOMS.len(), proptest::option::of(0..5usize), proptest::option::of(0..KEYS.len()))
            .prop_map(|(room, category, key)| Op::Report { room, category, key }),
        1 => (0..5usize).prop_map(Op::Capture),
        2 => (0..ROOMS.len(), 0..ANOMALIES.len())
            .prop_map(|(room, anomaly)| Op::ForceSpawn { room, anomaly }),
        1 => Just(Op::ResolveAll),
    ]
}

fn sample_scheduler(seed: u64, global_max_concurrent: usize, base_spawn_interval: f64) -> Scheduler<NullSignals> {
    let world = fixtures::sample_world();
    let world = WorldConfig {
        scheduler: SchedulerConfig {
            global_max_concurrent,
            base_spawn_interval,
            seed: Some(seed),
            ..SchedulerConfig::default()
        },
        rooms: world.rooms,
        anomalies: world.anomalies,
    };
    Scheduler::from_world(world, NullSignals).unwrap()
}

const PROPS: [&str; 5] = [
    "kitchen_vase",
    "kitchen_kettle",
    "living_laptop",
    "living_mirror",
    "bedroom_lamp",
];

fn apply(scheduler: &mut Scheduler<NullSignals>, op: &Op) {
    match *op {
        Op::Tick(dt) => scheduler.tick(dt),
        Op::Attempt => {
            scheduler.attempt_spawn();
        }
        Op::Report { room, category, key } => {
            let category = category.and_then(AnomalyCategory::from_index);
            let key = key.map(|k| KEYS[k]);
            scheduler.check_report(ROOMS[room], category, key);
        }
        Op::Capture(prop) => {
            scheduler.report_target(&TargetId::from(PROPS[prop]));
        }
        Op::ForceSpawn { room, anomaly } => {
            let _ = scheduler.force_spawn(ROOMS[room], ANOMALIES[anomaly]);
        }
        Op::ResolveAll => scheduler.force_resolve_all(),
    }
}

fn check_invariants(scheduler: &Scheduler<NullSignals>) -> Result<(), TestCaseError> {
    let active = scheduler.active();
    prop_assert!(active.len() <= scheduler.config().global_max_concurrent);
    prop_assert_eq!(scheduler.rooms().total_live(), active.len());

    for room in scheduler.rooms().iter() {
        prop_assert!(room.live_count() <= room.capacity(), "room '{}' overfilled", room.id());
        let in_room = active.iter().filter(|i| i.room_id() == room.id()).count();
        prop_assert_eq!(room.live_count(), in_room);

        for prop in room.props() {
            if !prop.is_undisturbed() {
                prop_assert!(
                    scheduler.prop_owner(&prop.id).is_some(),
                    "prop '{}' disturbed without an owner",
                    prop.id
                );
            }
        }
    }

    let mut held = HashSet::new();
    for instance in active {
        prop_assert!(instance.state().is_live());
        prop_assert_ne!(instance.state(), LifecycleState::Initializing);
        if instance.holds_lock() {
            let target = instance.target().map(|t| t.id.clone());
            prop_assert!(target.is_some());
            prop_assert!(held.insert(target), "two instances hold one target");
        }
    }
    prop_assert_eq!(scheduler.locks().len(), held.len());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn invariants_hold_under_random_driving(
        seed in any::<u64>(),
        global_max in 1usize..6,
        ops in proptest::collection::vec(op_strategy(), 1..80),
    ) {
        let mut scheduler = sample_scheduler(seed, global_max, 3.0);
        check_invariants(&scheduler)?;
        for op in &ops {
            apply(&mut scheduler, op);
            check_invariants(&scheduler)?;
        }

        scheduler.shutdown();
        prop_assert_eq!(scheduler.active_count(), 0);
        prop_assert!(scheduler.locks().is_empty());
        for room in scheduler.rooms().iter() {
            prop_assert_eq!(room.live_count(), 0);
            prop_assert!(room.props().iter().all(|p| p.is_undisturbed()));
        }
    }

    #[test]
    fn double_resolve_notifies_once(seed in any::<u64>(), anomaly in 0..ANOMALIES.len()) {
        // No scheduled spawns, so only the forced instance ever exists
        let mut scheduler = sample_scheduler(seed, 2, 1.0e9);
        let room = match ANOMALIES[anomaly] {
            "move_vase" => "room_kitchen",
            "lamp_color" | "shadow_figure" => "room_bedroom",
            _ => "room_living",
        };
        let Ok(id) = scheduler.force_spawn(room, ANOMALIES[anomaly]) else {
            return Ok(());
        };
        scheduler.drain_events();

        scheduler.force_resolve_all();
        scheduler.force_resolve_all();
        scheduler.tick(5.0);
        prop_assert!(!scheduler.on_instance_resolved(id, anomaly_events::ResolveCause::Forced));

        let resolutions = scheduler
            .drain_events()
            .into_iter()
            .filter(|e| matches!(
                &e.kind,
                anomaly_events::SchedulerEventKind::Resolved { instance, .. } if *instance == id
            ))
            .count();
        prop_assert_eq!(resolutions, 1);
        prop_assert!(scheduler.locks().is_empty());
    }
}
