//! Risk classifier: maps an SSM tuple to a bounded risk score and a
//! categorical alert/action.
//!
//! Two threshold tables exist, one per pair type. The vehicle↔vehicle path
//! derives the alert from the additive score. The vehicle↔pedestrian path
//! computes the additive score AND an independent guard-based
//! action/severity decision; the two use different thresholds and can
//! disagree. Both outputs are preserved distinctly.
//!
//! All comparisons operate on the raw `f64` metrics with `INFINITY`
//! sentinels, so "not applicable" values naturally fail every `< threshold`
//! guard.

use crate::scanner::PairMetrics;
use crate::types::{AlertKind, RecommendedAction, Severity};

// ============================================================================
// VEHICLE ↔ VEHICLE
// ============================================================================

/// Threshold table for vehicle↔vehicle classification.
#[derive(Debug, Clone)]
pub struct VehicleThresholds {
    /// TTC below this adds `w_ttc_critical` (default 1.0 s)
    pub ttc_critical_s: f64,

    /// TTC below this (but above critical) adds `w_ttc_warning` (default 2.5 s)
    pub ttc_warning_s: f64,

    /// Required deceleration above this adds `w_decel` (default 5.0 m/s²)
    pub decel_mps2: f64,

    /// Relative speed magnitude above this adds `w_delta_v` (default 5.0 m/s)
    pub delta_v_mps: f64,

    pub w_ttc_critical: f64,
    pub w_ttc_warning: f64,
    pub w_decel: f64,
    pub w_delta_v: f64,

    /// Score at or above this is `collision_imminent` (default 0.8)
    pub imminent_risk: f64,

    /// Score at or above this is `collision_warning` (default 0.4)
    pub warning_risk: f64,
}

impl Default for VehicleThresholds {
    fn default() -> Self {
        Self {
            ttc_critical_s: 1.0,
            ttc_warning_s: 2.5,
            decel_mps2: 5.0,
            delta_v_mps: 5.0,
            w_ttc_critical: 0.6,
            w_ttc_warning: 0.3,
            w_decel: 0.2,
            w_delta_v: 0.2,
            imminent_risk: 0.8,
            warning_risk: 0.4,
        }
    }
}

/// Outcome of classifying one vehicle↔vehicle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleClassification {
    /// Additive risk score, clamped to [0, 1]
    pub risk_score: f64,

    /// Alert to emit, or `None` when the pair stays below the warning band
    pub alert: Option<(AlertKind, RecommendedAction)>,
}

/// Additive vehicle↔vehicle risk score, clamped to [0, 1].
pub fn vehicle_risk_score(m: &PairMetrics, th: &VehicleThresholds) -> f64 {
    let mut risk = 0.0;
    if m.ttc_s < th.ttc_critical_s {
        risk += th.w_ttc_critical;
    } else if m.ttc_s < th.ttc_warning_s {
        risk += th.w_ttc_warning;
    }
    if m.required_deceleration_mps2 > th.decel_mps2 {
        risk += th.w_decel;
    }
    if m.delta_v_mps > th.delta_v_mps {
        risk += th.w_delta_v;
    }
    risk.clamp(0.0, 1.0)
}

/// Classifies a vehicle↔vehicle pair from its SSM tuple.
pub fn classify_vehicle_pair(m: &PairMetrics, th: &VehicleThresholds) -> VehicleClassification {
    let risk_score = vehicle_risk_score(m, th);

    let alert = if risk_score >= th.imminent_risk {
        Some((AlertKind::CollisionImminent, RecommendedAction::EmergencyBrake))
    } else if risk_score >= th.warning_risk {
        Some((AlertKind::CollisionWarning, RecommendedAction::SlowDown))
    } else {
        None
    };

    VehicleClassification { risk_score, alert }
}

// ============================================================================
// VEHICLE ↔ PEDESTRIAN
// ============================================================================

/// Threshold table for vehicle↔pedestrian classification.
///
/// The `score_*` fields feed the additive risk score; the `guard_*` fields
/// feed the action/severity decision. They are separate on purpose.
#[derive(Debug, Clone)]
pub struct VruThresholds {
    pub score_ttc_critical_s: f64,
    pub score_ttc_warning_s: f64,
    pub score_pet_s: f64,
    pub score_decel_mps2: f64,

    pub w_ttc_critical: f64,
    pub w_ttc_warning: f64,
    pub w_pet: f64,
    pub w_decel: f64,

    /// Emergency guards: `ttc < guard_ttc_high` OR `pet < guard_pet_high`
    /// OR `req_dec > guard_decel_high`
    pub guard_ttc_high_s: f64,
    pub guard_pet_high_s: f64,
    pub guard_decel_high_mps2: f64,

    /// Slow-down guards, checked after the emergency guards
    pub guard_ttc_medium_s: f64,
    pub guard_pet_medium_s: f64,
    pub guard_decel_medium_mps2: f64,
}

impl Default for VruThresholds {
    fn default() -> Self {
        Self {
            score_ttc_critical_s: 1.0,
            score_ttc_warning_s: 2.5,
            score_pet_s: 1.0,
            score_decel_mps2: 5.0,
            w_ttc_critical: 0.6,
            w_ttc_warning: 0.3,
            w_pet: 0.3,
            w_decel: 0.2,
            guard_ttc_high_s: 1.0,
            guard_pet_high_s: 0.5,
            guard_decel_high_mps2: 6.0,
            guard_ttc_medium_s: 2.5,
            guard_pet_medium_s: 1.5,
            guard_decel_medium_mps2: 3.0,
        }
    }
}

/// Outcome of classifying one vehicle↔pedestrian pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VruClassification {
    /// Additive risk score, clamped to [0, 1]
    pub risk_score: f64,

    /// Guard-based action, decided independently of `risk_score`
    pub recommended_action: RecommendedAction,

    pub severity: Severity,
}

impl VruClassification {
    /// Alert category corresponding to the guard decision.
    pub fn alert_kind(&self) -> AlertKind {
        match self.recommended_action {
            RecommendedAction::EmergencyBrake => AlertKind::EmergencyBrakeVru,
            RecommendedAction::SlowDown => AlertKind::SlowDownVru,
            RecommendedAction::Keep => AlertKind::Keep,
        }
    }
}

/// Classifies a vehicle↔pedestrian pair from its SSM tuple.
pub fn classify_vru_pair(m: &PairMetrics, th: &VruThresholds) -> VruClassification {
    let mut risk = 0.0;
    if m.ttc_s < th.score_ttc_critical_s {
        risk += th.w_ttc_critical;
    } else if m.ttc_s < th.score_ttc_warning_s {
        risk += th.w_ttc_warning;
    }
    if m.pet_s < th.score_pet_s {
        risk += th.w_pet;
    }
    if m.required_deceleration_mps2 > th.score_decel_mps2 {
        risk += th.w_decel;
    }
    let risk_score = risk.clamp(0.0, 1.0);

    let (recommended_action, severity) = if m.ttc_s < th.guard_ttc_high_s
        || m.pet_s < th.guard_pet_high_s
        || m.required_deceleration_mps2 > th.guard_decel_high_mps2
    {
        (RecommendedAction::EmergencyBrake, Severity::High)
    } else if m.ttc_s < th.guard_ttc_medium_s
        || m.pet_s < th.guard_pet_medium_s
        || m.required_deceleration_mps2 > th.guard_decel_medium_mps2
    {
        (RecommendedAction::SlowDown, Severity::Medium)
    } else {
        (RecommendedAction::Keep, Severity::Low)
    };

    VruClassification {
        risk_score,
        recommended_action,
        severity,
    }
}

// ============================================================================
// TESTS
// ============================================================================
