//! Weighted Selection
//!
//! Probabilistically picks a candidate based on weights.

use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffles `candidates` in place, then picks one with probability
/// proportional to its weight. Negative weights count as zero; when every
/// weight is zero the pick is uniform. Returns `None` only for an empty slice.
pub fn weighted_pick<'a, T, R, F>(rng: &mut R, candidates: &'a mut [T], weight: F) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f32,
{
    if candidates.is_empty() {
        return None;
    }

    // Shuffle first so list order never biases ties
    candidates.shuffle(rng);
    let candidates: &'a [T] = candidates;

    let weight_of = |c: &T| f64::from(weight(c).max(0.0));
    let total_weight: f64 = candidates.iter().map(weight_of).sum();

    if total_weight <= 0.0 {
        return candidates.choose(rng);
    }

    // Generate random value in [0, total_weight)
    let roll: f64 = rng.gen::<f64>() * total_weight;

    let mut cumulative = 0.0;
    let mut last_positive = None;
    for candidate in candidates {
        let w = weight_of(candidate);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(candidate);
        if cumulative >= roll {
            return Some(candidate);
        }
    }

    // Rounding can leave the roll just past the final sum
    last_positive
}
