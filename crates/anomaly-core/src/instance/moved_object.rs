//! Moved Object
//!
//! Carries a prop to a destination marker and back. Motion is explicit
//! progress state advanced by the scheduler tick.

use anomaly_events::{AbortReason, MovedObjectSpec, Pose, ReturnPolicy};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::room::Room;

use super::Teardown;

/// Markers closer than this to the prop's own position are ignored.
const MIN_MARKER_DISTANCE: f32 = 0.01;

/// Where the prop is in its round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionPhase {
    /// Travelling to the destination
    Outbound { elapsed: f64 },
    /// Resting at the destination
    Displaced,
    /// Travelling home from wherever it was interrupted
    Returning { elapsed: f64, from: Pose },
    /// Back at its original pose
    Home,
}

#[derive(Debug, Clone)]
pub(crate) struct MovedObject {
    prop: usize,
    origin: Pose,
    destination: Pose,
    move_out: f64,
    move_back: f64,
    copy_rotation: bool,
    return_policy: ReturnPolicy,
    phase: MotionPhase,
}

impl MovedObject {
    /// Picks a destination for prop `prop`. Fails when the room offers no
    /// usable marker.
    pub(crate) fn setup<R: Rng + ?Sized>(
        spec: &MovedObjectSpec,
        prop: usize,
        room: &Room,
        rng: &mut R,
    ) -> Result<Self, AbortReason> {
        let origin = room.prop_at(prop).pose;
        let markers: Vec<Pose> = room
            .markers_in(&spec.destination_group)
            .map(|m| m.pose)
            .filter(|pose| pose.position.distance(origin.position) > MIN_MARKER_DISTANCE)
            .collect();

        let destination = if spec.choose_farthest {
            markers.iter().copied().max_by(|a, b| {
                let da = a.position.distance(origin.position);
                let db = b.position.distance(origin.position);
                da.total_cmp(&db)
            })
        } else {
            markers.choose(rng).copied()
        };
        let destination = destination.ok_or(AbortReason::NoDestination)?;

        Ok(Self {
            prop,
            origin,
            destination,
            move_out: spec.move_out,
            move_back: spec.move_back,
            copy_rotation: spec.copy_rotation,
            return_policy: spec.return_policy,
            phase: MotionPhase::Outbound { elapsed: 0.0 },
        })
    }

    pub(crate) fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub(crate) fn destination(&self) -> Pose {
        self.destination
    }

    /// Advances any motion in flight. Returns true once the return trip has
    /// landed.
    pub(crate) fn advance(&mut self, dt: f64, room: &mut Room) -> bool {
        match self.phase {
            MotionPhase::Outbound { elapsed } => {
                let elapsed = elapsed + dt;
                let u = progress(elapsed, self.move_out);
                self.place(room, self.origin, self.destination, u);
                self.phase = if u >= 1.0 {
                    MotionPhase::Displaced
                } else {
                    MotionPhase::Outbound { elapsed }
                };
                false
            }
            MotionPhase::Returning { elapsed, from } => {
                let elapsed = elapsed + dt;
                let u = progress(elapsed, self.move_back);
                self.place(room, from, self.origin, u);
                if u >= 1.0 {
                    self.snap_home(room);
                    true
                } else {
                    self.phase = MotionPhase::Returning { elapsed, from };
                    false
                }
            }
            MotionPhase::Displaced | MotionPhase::Home => false,
        }
    }

    /// Interrupts any outbound motion and starts putting the prop back.
    pub(crate) fn begin_return(&mut self, room: &mut Room) -> Teardown {
        if self.phase == MotionPhase::Home {
            return Teardown::Done;
        }
        let from = room.prop_at(self.prop).pose;
        if self.return_policy == ReturnPolicy::Snap || self.move_back <= 0.0 || from == self.origin {
            self.snap_home(room);
            return Teardown::Done;
        }
        self.phase = MotionPhase::Returning { elapsed: 0.0, from };
        Teardown::InProgress
    }

    pub(crate) fn snap_home(&mut self, room: &mut Room) {
        room.prop_at_mut(self.prop).pose = self.origin;
        self.phase = MotionPhase::Home;
    }

    fn place(&self, room: &mut Room, from: Pose, to: Pose, u: f64) {
        let prop = room.prop_at_mut(self.prop);
        if u >= 1.0 {
            prop.pose.position = to.position;
            if self.copy_rotation {
                prop.pose.rotation = to.rotation;
            }
            return;
        }
        let k = ease_in_out(u) as f32;
        prop.pose.position = from.position.lerp(to.position, k);
        if self.copy_rotation {
            prop.pose.rotation = from.rotation.slerp(to.rotation, k);
        }
    }
}

fn progress(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

/// Smoothstep: eases in and out, exact at both ends.
fn ease_in_out(u: f64) -> f64 {
    u * u * (3.0 - 2.0 * u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomRegistry;
    use anomaly_events::{MarkerSpec, PropSpec, Quat, RoomSpec};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn study() -> RoomRegistry {
        RoomRegistry::from_specs(vec![RoomSpec::new("study", 1)
            .with_prop(PropSpec::new("study_globe", "globe").at(Pose::at(0.0, 0.0, 0.0)))
            .with_marker(MarkerSpec::new("shelf", Pose::at(1.0, 0.0, 0.0)))
            .with_marker(MarkerSpec::new("shelf", Pose::at(4.0, 0.0, 0.0)))
            .with_marker(MarkerSpec::new("shelf", Pose::at(0.0, 0.0, 0.0)))])
        .unwrap()
    }

    fn spec(policy: ReturnPolicy) -> MovedObjectSpec {
        MovedObjectSpec {
            target_group: "globe".to_string(),
            destination_group: "shelf".to_string(),
            move_out: 1.0,
            move_back: 1.0,
            return_policy: policy,
            ..MovedObjectSpec::default()
        }
    }

    #[test]
    fn test_farthest_marker_chosen() {
        let registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let moved = MovedObject::setup(&spec(ReturnPolicy::Snap), 0, registry.at(0), &mut rng).unwrap();
        assert_eq!(moved.destination(), Pose::at(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_random_marker_skips_origin() {
        let registry = study();
        let mut rng = SmallRng::seed_from_u64(3);
        let random = MovedObjectSpec { choose_farthest: false, ..spec(ReturnPolicy::Snap) };
        for _ in 0..50 {
            let moved = MovedObject::setup(&random, 0, registry.at(0), &mut rng).unwrap();
            assert_ne!(moved.destination(), Pose::at(0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_no_marker_aborts() {
        let registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let elsewhere = MovedObjectSpec { destination_group: "attic".to_string(), ..spec(ReturnPolicy::Snap) };
        assert_eq!(
            MovedObject::setup(&elsewhere, 0, registry.at(0), &mut rng).unwrap_err(),
            AbortReason::NoDestination
        );
    }

    #[test]
    fn test_outbound_motion_reaches_destination() {
        let mut registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut moved = MovedObject::setup(&spec(ReturnPolicy::Snap), 0, registry.at(0), &mut rng).unwrap();

        moved.advance(0.5, registry.at_mut(0));
        let halfway = registry.at(0).props()[0].pose.position.x;
        assert!((halfway - 2.0).abs() < 1e-4, "smoothstep midpoint should be halfway, got {}", halfway);

        moved.advance(0.75, registry.at_mut(0));
        assert_eq!(moved.phase(), MotionPhase::Displaced);
        assert_eq!(registry.at(0).props()[0].pose, Pose::at(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_snap_return_interrupts_motion() {
        let mut registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut moved = MovedObject::setup(&spec(ReturnPolicy::Snap), 0, registry.at(0), &mut rng).unwrap();

        moved.advance(0.3, registry.at_mut(0));
        assert_eq!(moved.begin_return(registry.at_mut(0)), Teardown::Done);
        assert_eq!(moved.phase(), MotionPhase::Home);
        assert!(registry.at(0).props()[0].is_undisturbed());
    }

    #[test]
    fn test_animated_return_takes_time() {
        let mut registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut moved = MovedObject::setup(&spec(ReturnPolicy::Animate), 0, registry.at(0), &mut rng).unwrap();

        moved.advance(2.0, registry.at_mut(0));
        assert_eq!(moved.begin_return(registry.at_mut(0)), Teardown::InProgress);
        assert!(!moved.advance(0.5, registry.at_mut(0)));
        assert!(!registry.at(0).props()[0].is_undisturbed());
        assert!(moved.advance(0.5, registry.at_mut(0)));
        assert!(registry.at(0).props()[0].is_undisturbed());
    }

    #[test]
    fn test_copied_rotation_follows_marker() {
        let turned = Pose {
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Pose::at(4.0, 0.0, 0.0)
        };
        let mut registry = RoomRegistry::from_specs(vec![RoomSpec::new("study", 1)
            .with_prop(PropSpec::new("study_globe", "globe"))
            .with_marker(MarkerSpec::new("shelf", turned))])
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let copying = MovedObjectSpec { copy_rotation: true, ..spec(ReturnPolicy::Snap) };
        let mut moved = MovedObject::setup(&copying, 0, registry.at(0), &mut rng).unwrap();

        moved.advance(0.5, registry.at_mut(0));
        let midway = registry.at(0).props()[0].pose.rotation;
        assert!(midway.is_normalized());
        assert!(midway.angle_between(Quat::IDENTITY) > 0.1);

        moved.advance(0.5, registry.at_mut(0));
        assert_eq!(registry.at(0).props()[0].pose, turned);
    }

    #[test]
    fn test_animated_return_before_moving_is_immediate() {
        let mut registry = study();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut moved = MovedObject::setup(&spec(ReturnPolicy::Animate), 0, registry.at(0), &mut rng).unwrap();
        assert_eq!(moved.begin_return(registry.at_mut(0)), Teardown::Done);
    }
}
