//! Anomaly Instances
//!
//! A running anomaly bound to one definition, one room and optionally one
//! spawn point. Every lifecycle call returns at most one [`Resolution`]; the
//! scheduler applies it. An instance yields a resolution exactly once, on
//! its transition into `Resolved` or `Aborted`.
//!
//! ```text
//! Initializing ──▶ Active ──▶ Resolving ──▶ Resolved
//!       │             └─────────────────────▲
//!       └──▶ Aborted
//! ```

mod color_change;
mod moved_object;

pub use moved_object::MotionPhase;

use std::sync::Arc;

use anomaly_events::{AbortReason, AnomalyDefinition, AnomalyKind, InstanceId, Pose, ResolveCause, Rgb};
use rand::rngs::SmallRng;

use crate::lock::{TargetGuard, TargetId, TargetLock};
use crate::room::{Room, SpawnPoint};

use color_change::ColorChange;
use moved_object::MovedObject;

/// Lifecycle of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Initializing,
    Active,
    Resolving,
    Resolved,
    Aborted,
}

impl LifecycleState {
    /// True for states that may appear in the scheduler's active set.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            LifecycleState::Initializing | LifecycleState::Active | LifecycleState::Resolving
        )
    }
}

/// Terminal outcome reported to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolveCause),
    Aborted(AbortReason),
}

/// Whether teardown finished synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    Done,
    InProgress,
}

/// World access handed to an instance for the duration of one call.
pub struct InstanceContext<'a> {
    pub room: &'a mut Room,
    pub locks: &'a TargetLock,
    pub rng: &'a mut SmallRng,
}

/// The prop an instance controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlledProp {
    pub id: TargetId,
    pub group: String,
}

#[derive(Debug, Clone)]
enum Behavior {
    /// Appears at a pose and stays there
    Placement { pose: Pose },
    MovedObject(MovedObject),
    ColorChange(ColorChange),
}

/// One live anomaly.
#[derive(Debug)]
pub struct AnomalyInstance {
    id: InstanceId,
    definition: Arc<AnomalyDefinition>,
    room_index: usize,
    room_id: String,
    spawn_point: Option<SpawnPoint>,
    state: LifecycleState,
    behavior: Option<Behavior>,
    target: Option<ControlledProp>,
    guard: Option<TargetGuard>,
    active_elapsed: f64,
    pending_cause: Option<ResolveCause>,
    notified: bool,
}

impl AnomalyInstance {
    pub(crate) fn new(
        id: InstanceId,
        definition: Arc<AnomalyDefinition>,
        room: &Room,
        room_index: usize,
        spawn_point: Option<SpawnPoint>,
    ) -> Self {
        Self {
            id,
            definition,
            room_index,
            room_id: room.id().to_string(),
            spawn_point,
            state: LifecycleState::Initializing,
            behavior: None,
            target: None,
            guard: None,
            active_elapsed: 0.0,
            pending_cause: None,
            notified: false,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn definition(&self) -> &Arc<AnomalyDefinition> {
        &self.definition
    }

    pub fn anomaly_id(&self) -> &str {
        &self.definition.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub(crate) fn room_index(&self) -> usize {
        self.room_index
    }

    pub fn spawn_point(&self) -> Option<&SpawnPoint> {
        self.spawn_point.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// True once resolution has begun or finished.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.state, LifecycleState::Initializing | LifecycleState::Active)
    }

    /// The prop this instance controls, if any.
    pub fn target(&self) -> Option<&ControlledProp> {
        self.target.as_ref()
    }

    /// True while the instance owns a target lock.
    pub fn holds_lock(&self) -> bool {
        self.guard.is_some()
    }

    /// Seconds spent active so far.
    pub fn active_elapsed(&self) -> f64 {
        self.active_elapsed
    }

    /// Motion phase for moved-object anomalies.
    pub fn motion_phase(&self) -> Option<MotionPhase> {
        match &self.behavior {
            Some(Behavior::MovedObject(moved)) => Some(moved.phase()),
            _ => None,
        }
    }

    /// Marker pose a moved-object anomaly carries its prop to.
    pub fn destination(&self) -> Option<Pose> {
        match &self.behavior {
            Some(Behavior::MovedObject(moved)) => Some(moved.destination()),
            _ => None,
        }
    }

    /// Tint currently applied by a colour-change anomaly.
    pub fn applied_tint(&self) -> Option<Rgb> {
        match &self.behavior {
            Some(Behavior::ColorChange(change)) => Some(change.applied()),
            _ => None,
        }
    }

    /// Where a placement anomaly appeared.
    pub fn placement_pose(&self) -> Option<Pose> {
        match &self.behavior {
            Some(Behavior::Placement { pose }) => Some(*pose),
            _ => None,
        }
    }

    /// True when `key` names the controlled prop, by group or by id. Placements
    /// answer to their spawn point tag instead.
    pub fn matches_target_key(&self, key: &str) -> bool {
        match &self.target {
            Some(target) => target.group == key || target.id.as_str() == key,
            None => self.spawn_point.as_ref().is_some_and(|sp| sp.tag == key),
        }
    }

    /// Locates and locks whatever the anomaly needs, then goes `Active` or
    /// `Aborted`. Only an abort yields a resolution.
    pub(crate) fn initialize(&mut self, ctx: &mut InstanceContext<'_>) -> Option<Resolution> {
        if self.state != LifecycleState::Initializing {
            return None;
        }

        match self.setup(ctx) {
            Ok(behavior) => {
                self.behavior = Some(behavior);
                self.state = LifecycleState::Active;
                None
            }
            Err(reason) => {
                tracing::debug!(
                    "'{}' aborted in room '{}': {}",
                    self.definition.id,
                    self.room_id,
                    reason
                );
                self.target = None;
                self.release();
                self.state = LifecycleState::Aborted;
                self.notify(Resolution::Aborted(reason))
            }
        }
    }

    fn setup(&mut self, ctx: &mut InstanceContext<'_>) -> Result<Behavior, AbortReason> {
        let definition = Arc::clone(&self.definition);
        match &definition.kind {
            AnomalyKind::Placement(_) => {
                let pose = self
                    .spawn_point
                    .as_ref()
                    .map_or(ctx.room.origin(), |sp| sp.pose);
                Ok(Behavior::Placement { pose })
            }
            AnomalyKind::MovedObject(spec) => {
                let prop = self.acquire_target(&spec.target_group, ctx)?;
                let moved = MovedObject::setup(spec, prop, ctx.room, &mut *ctx.rng)?;
                Ok(Behavior::MovedObject(moved))
            }
            AnomalyKind::ColorChange(spec) => {
                let prop = self.acquire_target(&spec.target_group, ctx)?;
                let change = ColorChange::setup(spec, prop, ctx.room, &mut *ctx.rng);
                Ok(Behavior::ColorChange(change))
            }
        }
    }

    /// Locks the first unlocked prop of `group`, in room order.
    fn acquire_target(&mut self, group: &str, ctx: &InstanceContext<'_>) -> Result<usize, AbortReason> {
        let mut seen = false;
        for (index, prop) in ctx.room.props().iter().enumerate() {
            if prop.group != group {
                continue;
            }
            seen = true;
            if let Some(guard) = ctx.locks.try_acquire(&prop.id) {
                self.guard = Some(guard);
                self.target = Some(ControlledProp {
                    id: prop.id.clone(),
                    group: prop.group.clone(),
                });
                return Ok(index);
            }
        }
        Err(if seen {
            AbortReason::TargetLocked
        } else {
            AbortReason::NoTarget
        })
    }

    /// Advances motion and the auto-resolve timer.
    pub(crate) fn tick(&mut self, dt: f64, ctx: &mut InstanceContext<'_>) -> Option<Resolution> {
        match self.state {
            LifecycleState::Active => {
                if let Some(Behavior::MovedObject(moved)) = &mut self.behavior {
                    moved.advance(dt, ctx.room);
                }
                self.active_elapsed += dt;
                let limit = self.definition.kind.auto_resolve_after();
                if limit > 0.0 && self.active_elapsed >= limit {
                    return self.force_resolve(ResolveCause::Timeout, ctx);
                }
                None
            }
            LifecycleState::Resolving => {
                let landed = match &mut self.behavior {
                    Some(Behavior::MovedObject(moved)) => moved.advance(dt, ctx.room),
                    _ => true,
                };
                if landed {
                    let cause = self.pending_cause.unwrap_or(ResolveCause::Forced);
                    return self.finish(cause);
                }
                None
            }
            _ => None,
        }
    }

    /// Starts resolution. Idempotent: a call while already resolving or
    /// resolved does nothing. Yields the resolution when teardown completes
    /// synchronously.
    pub(crate) fn force_resolve(
        &mut self,
        cause: ResolveCause,
        ctx: &mut InstanceContext<'_>,
    ) -> Option<Resolution> {
        if self.state != LifecycleState::Active {
            return None;
        }

        let teardown = match &mut self.behavior {
            Some(Behavior::MovedObject(moved)) => moved.begin_return(ctx.room),
            Some(Behavior::ColorChange(change)) => {
                change.restore(ctx.room);
                Teardown::Done
            }
            Some(Behavior::Placement { .. }) | None => Teardown::Done,
        };

        match teardown {
            Teardown::Done => self.finish(cause),
            Teardown::InProgress => {
                self.state = LifecycleState::Resolving;
                self.pending_cause = Some(cause);
                None
            }
        }
    }

    /// Restores the world immediately, skipping any return animation.
    pub(crate) fn teardown_now(
        &mut self,
        cause: ResolveCause,
        ctx: &mut InstanceContext<'_>,
    ) -> Option<Resolution> {
        match self.state {
            LifecycleState::Active | LifecycleState::Resolving => {
                match &mut self.behavior {
                    Some(Behavior::MovedObject(moved)) => moved.snap_home(ctx.room),
                    Some(Behavior::ColorChange(change)) => change.restore(ctx.room),
                    Some(Behavior::Placement { .. }) | None => {}
                }
                let cause = self.pending_cause.unwrap_or(cause);
                self.finish(cause)
            }
            LifecycleState::Initializing => {
                self.release();
                self.state = LifecycleState::Aborted;
                self.notify(Resolution::Aborted(AbortReason::NoTarget))
            }
            LifecycleState::Resolved | LifecycleState::Aborted => None,
        }
    }

    /// Drops the target lock if one is still held.
    pub(crate) fn release(&mut self) {
        self.guard = None;
    }

    fn finish(&mut self, cause: ResolveCause) -> Option<Resolution> {
        self.release();
        self.state = LifecycleState::Resolved;
        self.notify(Resolution::Resolved(cause))
    }

    fn notify(&mut self, resolution: Resolution) -> Option<Resolution> {
        if self.notified {
            return None;
        }
        self.notified = true;
        Some(resolution)
    }
}
