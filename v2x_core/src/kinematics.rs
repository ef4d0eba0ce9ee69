//! Pure surrogate-safety-metric (SSM) math.
//!
//! Every function here is side-effect free and total: numerically degenerate
//! input (zero-distance pairs, stationary followers, separating geometry)
//! resolves to a defined sentinel instead of an error. The internal sentinel
//! for "not applicable / no finite value" is `f64::INFINITY`; wire-facing
//! records convert it to `None` via [`finite_or_none`].
//!
//! Sign convention: `closing_speed` is positive when the gap between ego and
//! other is shrinking, negative when it grows. Swapping ego and other flips
//! both the position delta and the relative velocity, so the value is the
//! same from either side of the pair.

use nalgebra::Vector2;

/// Effective-distance floor used to guard divisions in deceleration math.
pub const DISTANCE_EPSILON: f64 = 1e-3;

/// Euclidean distance between two planar positions, in meters.
#[inline]
pub fn distance(p1: &Vector2<f64>, p2: &Vector2<f64>) -> f64 {
    (p1 - p2).norm()
}

/// Converts a scalar speed and compass-free heading (degrees, 0–360,
/// measured from the +x axis) into a planar velocity vector.
#[inline]
pub fn velocity_from_heading(speed_mps: f64, heading_deg: f64) -> Vector2<f64> {
    let rad = heading_deg.to_radians();
    Vector2::new(speed_mps * rad.cos(), speed_mps * rad.sin())
}

/// Component of the relative velocity along the line of approach.
///
/// * `pos_rel` — vector from ego to other (`other - ego`)
/// * `rel_vel` — relative velocity (`ego_v - other_v`)
///
/// Returns a positive value when the pair is closing, negative when
/// separating, and 0.0 when the position delta is degenerate (coincident
/// positions give no line of approach to project onto).
pub fn closing_speed(pos_rel: &Vector2<f64>, rel_vel: &Vector2<f64>) -> f64 {
    let mag = pos_rel.norm();
    if mag == 0.0 {
        return 0.0;
    }
    let unit = pos_rel / mag;
    // With rel_vel = ego_v - other_v, velocity toward the other projects
    // positively onto the line of approach.
    rel_vel.dot(&unit)
}

/// Time-to-collision in seconds.
///
/// Defined only for a closing pair with positive separation; otherwise the
/// pair never meets under linear extrapolation and the result is `INFINITY`.
#[inline]
pub fn ttc(distance_m: f64, closing_speed_mps: f64) -> f64 {
    if closing_speed_mps <= 0.0 || distance_m <= 0.0 {
        return f64::INFINITY;
    }
    distance_m / closing_speed_mps
}

/// Constant deceleration (m/s²) required to shed `rel_speed_mps` before
/// covering `distance_m`, with an optional spatial cushion.
///
/// `a = v² / (2·max(d − cushion, ε))`, with `ε` guarding the division when
/// the pair is already on top of each other.
#[inline]
pub fn required_deceleration(rel_speed_mps: f64, distance_m: f64, cushion_m: f64) -> f64 {
    let d_eff = (distance_m - cushion_m).max(DISTANCE_EPSILON);
    (rel_speed_mps * rel_speed_mps) / (2.0 * d_eff)
}

/// Time headway in seconds: separation divided by the follower's speed.
/// A stationary follower never arrives, so the headway is `INFINITY`.
#[inline]
pub fn time_headway(distance_m: f64, follower_speed_mps: f64) -> f64 {
    if follower_speed_mps <= 0.0 {
        return f64::INFINITY;
    }
    distance_m / follower_speed_mps
}

/// Post-encroachment-time proxy in seconds.
///
/// Approximated as the absolute difference between the closing-speed arrival
/// time and the actor's own arrival time over the current separation:
/// `|d/closing − d/actor|`. The actor is the pedestrian for a
/// vehicle↔pedestrian pair and the ego for a vehicle↔vehicle row. Defined
/// only when the pair is closing and the actor is moving; this is an
/// arrival-time heuristic, not the formal crossing-time PET.
#[inline]
pub fn pet_proxy(distance_m: f64, closing_speed_mps: f64, actor_speed_mps: f64) -> f64 {
    if closing_speed_mps <= 0.0 || actor_speed_mps <= 0.0 {
        return f64::INFINITY;
    }
    (distance_m / closing_speed_mps - distance_m / actor_speed_mps).abs()
}

/// Maps the internal `INFINITY` / NaN sentinels to `None` for wire records.
#[inline]
pub fn finite_or_none(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
