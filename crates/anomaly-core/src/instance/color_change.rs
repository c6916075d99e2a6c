//! Color Change
//!
//! Tints a prop and restores the authored colour on resolve.

use anomaly_events::{ColorChangeSpec, Rgb};
use rand::Rng;

use crate::room::Room;

/// Minimum distance between the anomaly tint and the original colour.
const MIN_COLOR_DISTANCE: f32 = 0.25;
const BRIGHT_ATTEMPTS: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct ColorChange {
    prop: usize,
    original: Rgb,
    applied: Rgb,
}

impl ColorChange {
    /// Applies the tint to prop `prop` immediately.
    pub(crate) fn setup<R: Rng + ?Sized>(
        spec: &ColorChangeSpec,
        prop: usize,
        room: &mut Room,
        rng: &mut R,
    ) -> Self {
        let target = room.prop_at_mut(prop);
        let original = target.tint;
        let applied = spec
            .tint
            .unwrap_or_else(|| pick_different_bright_color(original, rng));
        target.tint = applied;
        Self { prop, original, applied }
    }

    pub(crate) fn applied(&self) -> Rgb {
        self.applied
    }

    pub(crate) fn restore(&self, room: &mut Room) {
        room.prop_at_mut(self.prop).tint = self.original;
    }
}

/// Random saturated colour visibly different from `original`.
pub(crate) fn pick_different_bright_color<R: Rng + ?Sized>(original: Rgb, rng: &mut R) -> Rgb {
    for _ in 0..BRIGHT_ATTEMPTS {
        let candidate = Rgb::from_hsv(
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.65..=1.0),
            rng.gen_range(0.65..=1.0),
        );
        if candidate.distance(original) > MIN_COLOR_DISTANCE {
            return candidate;
        }
    }
    Rgb::from_hsv(
        rng.gen_range(0.0..1.0),
        rng.gen_range(0.8..=1.0),
        rng.gen_range(0.8..=1.0),
    )
}
