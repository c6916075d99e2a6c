//! Anomaly Scheduler
//!
//! Owns the game clock, the active set, cooldowns and the anti-repeat history.
//! Each tick advances live instances, attempts a spawn when one is due, then
//! pushes the aggression level and checks the win condition.
//!
//! Only the scheduler mutates the active set, room live counts and cooldowns.
//! Instances touch the lock registry while initializing and resolving.

mod report;

pub use report::find_report_match;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anomaly_events::{
    AbortReason, AnomalyDefinition, InstanceId, ResolveCause, SchedulerEvent, SchedulerEventKind,
    SkipReason,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::catalog::Catalog;
use crate::config::{ConfigError, SchedulerConfig, WorldConfig};
use crate::error::SpawnError;
use crate::instance::{AnomalyInstance, InstanceContext, Resolution};
use crate::lock::{TargetId, TargetLock};
use crate::room::{Room, RoomRegistry, SpawnPoint};
use crate::selection::weighted_pick;
use crate::signals::GameSignals;

/// Result of one spawn attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// A new instance is active
    Spawned(InstanceId),
    /// Nothing was instantiated
    Skipped(SkipReason),
    /// The picked anomaly gave up during initialization
    InitAborted(AbortReason),
}

impl SpawnOutcome {
    pub fn spawned(&self) -> Option<InstanceId> {
        match self {
            SpawnOutcome::Spawned(id) => Some(*id),
            _ => None,
        }
    }
}

/// The spawn and lifecycle scheduler.
pub struct Scheduler<G: GameSignals> {
    config: SchedulerConfig,
    catalog: Catalog,
    rooms: RoomRegistry,
    locks: TargetLock,
    rng: SmallRng,
    signals: G,
    clock: f64,
    next_spawn_at: f64,
    active: Vec<AnomalyInstance>,
    global_cooldown_until: HashMap<String, f64>,
    room_cooldown_until: HashMap<(String, String), f64>,
    recent: VecDeque<String>,
    last_spawned_at: HashMap<String, f64>,
    aggression: u8,
    won: bool,
    events: Vec<SchedulerEvent>,
    next_sequence: u64,
}

/// Borrows the pieces of world state an instance may touch.
fn context<'a>(
    rooms: &'a mut RoomRegistry,
    locks: &'a TargetLock,
    rng: &'a mut SmallRng,
    room_index: usize,
) -> InstanceContext<'a> {
    InstanceContext {
        room: rooms.at_mut(room_index),
        locks,
        rng,
    }
}

impl<G: GameSignals> Scheduler<G> {
    /// Creates a scheduler over validated rooms and catalog, rejecting
    /// settings it cannot run with. The lock registry starts empty and
    /// belongs to this scheduler alone.
    pub fn new(
        config: SchedulerConfig,
        rooms: RoomRegistry,
        catalog: Catalog,
        signals: G,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let mut scheduler = Self {
            config,
            catalog,
            rooms,
            locks: TargetLock::new(),
            rng,
            signals,
            clock: 0.0,
            next_spawn_at: 0.0,
            active: Vec::new(),
            global_cooldown_until: HashMap::new(),
            room_cooldown_until: HashMap::new(),
            recent: VecDeque::new(),
            last_spawned_at: HashMap::new(),
            aggression: 0,
            won: false,
            events: Vec::new(),
            next_sequence: 0,
        };
        scheduler.schedule_next_spawn();

        tracing::info!(
            "scheduler ready: {} rooms, {} anomalies, first spawn attempt at {:.2}s",
            scheduler.rooms.len(),
            scheduler.catalog.len(),
            scheduler.next_spawn_at
        );
        Ok(scheduler)
    }

    /// Validates a world description and builds a scheduler from it.
    pub fn from_world(world: WorldConfig, signals: G) -> Result<Self, ConfigError> {
        let (config, rooms, catalog) = world.build()?;
        Self::new(config, rooms, catalog, signals)
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advances the game clock by `dt` tick seconds (scaled by
    /// `time_scale`). Non-positive or non-finite `dt` leaves the clock where
    /// it is; the aggression push and win check still run.
    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt * self.config.time_scale
        } else {
            0.0
        };
        self.clock += dt;

        self.advance_instances(dt);

        if self.clock >= self.next_spawn_at {
            self.attempt_spawn();
            self.schedule_next_spawn();
        }

        self.refresh_aggression();
        self.check_win();
    }

    fn advance_instances(&mut self, dt: f64) {
        let mut finished = Vec::new();
        {
            let Self { active, rooms, locks, rng, .. } = self;
            for instance in active.iter_mut() {
                let mut ctx = context(rooms, locks, rng, instance.room_index());
                if let Some(resolution) = instance.tick(dt, &mut ctx) {
                    finished.push((instance.id(), resolution));
                }
            }
        }
        for (id, resolution) in finished {
            self.apply_resolution(id, resolution);
        }
    }

    fn schedule_next_spawn(&mut self) {
        let jitter = self.config.spawn_jitter;
        let offset = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        let interval = (self.config.base_spawn_interval + offset).max(self.config.min_spawn_interval);
        self.next_spawn_at = self.clock + interval;
    }

    fn refresh_aggression(&mut self) {
        let active = self.active.len();
        let level = self.config.aggression.level_for(active);
        self.signals.register_aggression_level(level);

        if level != self.aggression {
            tracing::info!("aggression {} -> {} ({} active)", self.aggression, level, active);
            self.record(SchedulerEventKind::AggressionChanged {
                from: self.aggression,
                to: level,
                active,
            });
            self.aggression = level;
        }
    }

    fn check_win(&mut self) {
        if self.won || self.config.win_time <= 0.0 || self.clock < self.config.win_time {
            return;
        }
        self.won = true;
        tracing::info!("win time reached at {:.2}s", self.clock);
        self.signals.game_won();
        self.record(SchedulerEventKind::Won);
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Runs one spawn attempt against the current state.
    pub fn attempt_spawn(&mut self) -> SpawnOutcome {
        if self.active.len() >= self.config.global_max_concurrent {
            tracing::debug!(
                "spawn blocked: {}/{} active",
                self.active.len(),
                self.config.global_max_concurrent
            );
            return self.skip(SkipReason::GlobalCap, None);
        }

        let eligible = self.rooms.eligible_indices();
        let Some(&room_index) = eligible.choose(&mut self.rng) else {
            tracing::debug!("spawn skipped: every room is at capacity");
            return self.skip(SkipReason::NoEligibleRoom, None);
        };
        let room_id = self.rooms.at(room_index).id().to_string();

        let mut candidates = self.candidates_for(room_index);
        let picked = weighted_pick(&mut self.rng, &mut candidates, |d| d.effective_weight()).cloned();
        let Some(definition) = picked else {
            tracing::debug!("spawn skipped: no candidates for '{}'", room_id);
            return self.skip(SkipReason::NoCandidates, Some(room_id));
        };

        let spawn_point = if definition.requires_specific_spawn_points {
            let point = self.pick_spawn_point(room_index, &definition);
            // Unreachable while the filter and the resolver both use `accepts_tag`
            if point.is_none() {
                tracing::error!(
                    "'{}' passed the filters for '{}' but no spawn point matches its tags",
                    definition.id,
                    room_id
                );
                return self.skip(SkipReason::SpawnPointFault, Some(room_id));
            }
            point
        } else {
            None
        };

        match self.instantiate(room_index, definition, spawn_point, false) {
            Ok(id) => SpawnOutcome::Spawned(id),
            Err(reason) => SpawnOutcome::InitAborted(reason),
        }
    }

    /// Uniform pick among the room's spawn points that accept `definition`.
    fn pick_spawn_point(&mut self, room_index: usize, definition: &AnomalyDefinition) -> Option<SpawnPoint> {
        let matching = self.rooms.at(room_index).matching_spawn_points(definition);
        matching.choose(&mut self.rng).map(|point| (*point).clone())
    }

    /// Definitions allowed to spawn in the room right now, in catalog order.
    fn candidates_for(&self, room_index: usize) -> Vec<Arc<AnomalyDefinition>> {
        let room = self.rooms.at(room_index);
        self.catalog
            .iter()
            .filter(|definition| match self.rejection(definition, room) {
                Some(reason) => {
                    tracing::debug!("'{}' rejected for '{}': {}", definition.id, room.id(), reason);
                    false
                }
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Why `definition` may not spawn in `room` at the current clock.
    fn rejection(&self, definition: &AnomalyDefinition, room: &Room) -> Option<&'static str> {
        let id = definition.id.as_str();
        if !definition.in_time_window(self.clock) {
            return Some("outside its time window");
        }
        if self.recent.iter().any(|recent| recent == id) {
            return Some("spawned recently");
        }
        if self.config.anti_repeat_window > 0.0 {
            if let Some(&when) = self.last_spawned_at.get(id) {
                if self.clock - when < self.config.anti_repeat_window {
                    return Some("inside the anti-repeat window");
                }
            }
        }
        if self.is_globally_cooling_down(id) {
            return Some("global cooldown");
        }
        if self.is_room_cooling_down(room.id(), id) {
            return Some("room cooldown");
        }
        if !definition.allow_repeat_in_same_room && self.is_active_in_room(room.id(), id) {
            return Some("already active in this room");
        }
        if !room.has_valid_spawn_point(definition) {
            return Some("no matching spawn point");
        }
        if !room.supports(&definition.kind) {
            return Some("room lacks its target or destination");
        }
        None
    }

    /// Builds and initializes an instance; tracks it when it goes active.
    fn instantiate(
        &mut self,
        room_index: usize,
        definition: Arc<AnomalyDefinition>,
        spawn_point: Option<SpawnPoint>,
        forced: bool,
    ) -> Result<InstanceId, AbortReason> {
        let id = InstanceId::from_random_bytes(self.rng.gen());
        let room_id = self.rooms.at(room_index).id().to_string();
        let mut instance =
            AnomalyInstance::new(id, definition, self.rooms.at(room_index), room_index, spawn_point);

        let outcome = {
            let mut ctx = context(&mut self.rooms, &self.locks, &mut self.rng, room_index);
            instance.initialize(&mut ctx)
        };
        if let Some(Resolution::Aborted(reason)) = outcome {
            self.record(SchedulerEventKind::InitAborted {
                anomaly_id: instance.anomaly_id().to_string(),
                room_id,
                reason,
            });
            return Err(reason);
        }

        let anomaly_id = instance.anomaly_id().to_string();
        self.rooms.at_mut(room_index).increment_live();
        self.recent.push_back(anomaly_id.clone());
        while self.recent.len() > self.config.anti_repeat_buffer {
            self.recent.pop_front();
        }
        self.last_spawned_at.insert(anomaly_id.clone(), self.clock);

        tracing::info!(
            "spawned '{}' in '{}'{} ({} active)",
            anomaly_id,
            room_id,
            instance
                .spawn_point()
                .map(|sp| format!(" at '{}'", sp.tag))
                .unwrap_or_default(),
            self.active.len() + 1
        );
        self.record(SchedulerEventKind::Spawned {
            instance: id,
            anomaly_id,
            room_id,
            spawn_point: instance.spawn_point().map(|sp| sp.tag.clone()),
            target: instance.target().map(|t| t.id.to_string()),
            forced,
        });
        self.active.push(instance);
        Ok(id)
    }

    fn skip(&mut self, reason: SkipReason, room_id: Option<String>) -> SpawnOutcome {
        self.record(SchedulerEventKind::SpawnSkipped { reason, room_id });
        SpawnOutcome::Skipped(reason)
    }

    /// Spawns `anomaly_id` in `room_id`, bypassing the time window, cooldown,
    /// anti-repeat and same-room filters. Capacity and the global limit
    /// still apply.
    pub fn force_spawn(&mut self, room_id: &str, anomaly_id: &str) -> Result<InstanceId, SpawnError> {
        let result = self.try_force_spawn(room_id, anomaly_id);
        if let Err(err) = &result {
            tracing::debug!("force spawn of '{}' in '{}' failed: {}", anomaly_id, room_id, err);
        }
        result
    }

    fn try_force_spawn(&mut self, room_id: &str, anomaly_id: &str) -> Result<InstanceId, SpawnError> {
        let room_index = self
            .rooms
            .index_of(room_id)
            .ok_or_else(|| SpawnError::UnknownRoom(room_id.to_string()))?;
        let definition = self
            .catalog
            .get(anomaly_id)
            .cloned()
            .ok_or_else(|| SpawnError::UnknownAnomaly(anomaly_id.to_string()))?;

        if self.active.len() >= self.config.global_max_concurrent {
            return Err(SpawnError::GlobalCap);
        }
        if !self.rooms.at(room_index).has_capacity() {
            return Err(SpawnError::RoomFull(room_id.to_string()));
        }

        let spawn_point = if definition.requires_specific_spawn_points {
            let point = self
                .pick_spawn_point(room_index, &definition)
                .ok_or_else(|| SpawnError::NoSpawnPoint {
                    room_id: room_id.to_string(),
                    anomaly_id: anomaly_id.to_string(),
                })?;
            Some(point)
        } else {
            None
        };

        self.instantiate(room_index, definition, spawn_point, true)
            .map_err(SpawnError::Aborted)
    }

    /// Boolean form of [`Scheduler::force_spawn`].
    pub fn force_spawn_ok(&mut self, room_id: &str, anomaly_id: &str) -> bool {
        self.force_spawn(room_id, anomaly_id).is_ok()
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Starts resolving one active instance. Returns false for unknown ids
    /// and for instances already resolving.
    fn resolve_instance(&mut self, id: InstanceId, cause: ResolveCause) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let Self { active, rooms, locks, rng, .. } = self;
        let instance = &mut active[index];
        if instance.is_resolved() {
            return false;
        }
        let mut ctx = context(rooms, locks, rng, instance.room_index());
        if let Some(resolution) = instance.force_resolve(cause, &mut ctx) {
            self.apply_resolution(id, resolution);
        }
        true
    }

    /// Resolution callback. Tears the instance down if it is still running,
    /// then removes it and settles live counts and cooldowns. Unknown or
    /// already-removed ids are ignored.
    pub fn on_instance_resolved(&mut self, id: InstanceId, cause: ResolveCause) -> bool {
        let Some(index) = self.position(id) else {
            tracing::debug!("resolution for unknown instance {}", id);
            return false;
        };
        let cause = {
            let Self { active, rooms, locks, rng, .. } = self;
            let instance = &mut active[index];
            let mut ctx = context(rooms, locks, rng, instance.room_index());
            match instance.teardown_now(cause, &mut ctx) {
                Some(Resolution::Resolved(actual)) => actual,
                _ => cause,
            }
        };
        self.retire(id, cause)
    }

    /// Force-resolves every active instance. Instances returning home with an
    /// animation stay active until they land.
    pub fn force_resolve_all(&mut self) {
        let ids: Vec<InstanceId> = self.active.iter().map(AnomalyInstance::id).collect();
        tracing::info!("force resolving {} anomalies", ids.len());
        for id in ids {
            self.resolve_instance(id, ResolveCause::Forced);
        }
    }

    fn apply_resolution(&mut self, id: InstanceId, resolution: Resolution) {
        match resolution {
            Resolution::Resolved(cause) => {
                self.retire(id, cause);
            }
            Resolution::Aborted(reason) => {
                tracing::warn!("tracked instance {} aborted: {}", id, reason);
                self.retire(id, ResolveCause::Forced);
            }
        }
    }

    /// Removes an instance from the active set exactly once.
    fn retire(&mut self, id: InstanceId, cause: ResolveCause) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let mut instance = self.active.remove(index);
        self.rooms.at_mut(instance.room_index()).decrement_live();

        let definition = Arc::clone(instance.definition());
        if definition.global_cooldown > 0.0 {
            self.global_cooldown_until
                .insert(definition.id.clone(), self.clock + definition.global_cooldown);
        }
        if definition.per_room_cooldown > 0.0 {
            self.room_cooldown_until.insert(
                (instance.room_id().to_string(), definition.id.clone()),
                self.clock + definition.per_room_cooldown,
            );
        }
        instance.release();

        tracing::info!(
            "resolved '{}' in '{}' ({:?}), {} active",
            definition.id,
            instance.room_id(),
            cause,
            self.active.len()
        );
        self.record(SchedulerEventKind::Resolved {
            instance: id,
            anomaly_id: definition.id.clone(),
            room_id: instance.room_id().to_string(),
            cause,
        });
        true
    }

    /// Tears down every instance immediately and clears the lock registry.
    /// Runs automatically on drop.
    pub fn shutdown(&mut self) {
        let ids: Vec<InstanceId> = self.active.iter().map(AnomalyInstance::id).collect();
        for id in ids {
            self.on_instance_resolved(id, ResolveCause::Forced);
        }
        self.locks.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn position(&self, id: InstanceId) -> Option<usize> {
        self.active.iter().position(|instance| instance.id() == id)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn next_spawn_at(&self) -> f64 {
        self.next_spawn_at
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn locks(&self) -> &TargetLock {
        &self.locks
    }

    pub fn signals(&self) -> &G {
        &self.signals
    }

    /// Live instances in spawn order.
    pub fn active(&self) -> &[AnomalyInstance] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&AnomalyInstance> {
        self.active.iter().find(|instance| instance.id() == id)
    }

    /// Live instances in one room.
    pub fn active_in_room(&self, room_id: &str) -> Vec<&AnomalyInstance> {
        self.active
            .iter()
            .filter(|instance| instance.room_id() == room_id)
            .collect()
    }

    fn is_active_in_room(&self, room_id: &str, anomaly_id: &str) -> bool {
        self.active
            .iter()
            .any(|instance| instance.room_id() == room_id && instance.anomaly_id() == anomaly_id)
    }

    /// Instance currently holding the lock on `target`.
    pub fn prop_owner(&self, target: &TargetId) -> Option<InstanceId> {
        self.active
            .iter()
            .find(|instance| instance.holds_lock() && instance.target().is_some_and(|t| &t.id == target))
            .map(AnomalyInstance::id)
    }

    pub fn aggression_level(&self) -> u8 {
        self.aggression
    }

    pub fn has_won(&self) -> bool {
        self.won
    }

    /// Anti-repeat history, oldest first.
    pub fn recent_spawns(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    pub fn is_globally_cooling_down(&self, anomaly_id: &str) -> bool {
        self.global_cooldown_until
            .get(anomaly_id)
            .is_some_and(|&until| self.clock < until)
    }

    pub fn is_room_cooling_down(&self, room_id: &str, anomaly_id: &str) -> bool {
        self.room_cooldown_until
            .get(&(room_id.to_string(), anomaly_id.to_string()))
            .is_some_and(|&until| self.clock < until)
    }

    // ------------------------------------------------------------------
    // Event stream
    // ------------------------------------------------------------------

    fn record(&mut self, kind: SchedulerEventKind) {
        let event = SchedulerEvent::new(self.next_sequence, self.clock, kind);
        self.next_sequence += 1;
        self.events.push(event);
    }

    /// Takes every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<G: GameSignals> Drop for Scheduler<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
