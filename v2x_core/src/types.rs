//! Core data model: entity snapshots, SSM records, alerts, and roadside
//! detections.
//!
//! These are the wire-facing shapes of the engine. Field names follow the
//! unit-suffixed convention (`distance_m`, `ttc_s`, ...); `Option<f64>`
//! fields encode the "infinite / not applicable" sentinel as JSON `null`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ============================================================================
// ENTITIES
// ============================================================================

/// Classification of a tracked moving agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Vehicle,
    Pedestrian,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Vehicle => write!(f, "vehicle"),
            Role::Pedestrian => write!(f, "pedestrian"),
        }
    }
}

/// Latest known kinematic state of one agent.
///
/// Owned exclusively by the entity store and replaced wholesale on every
/// upsert for the same id. An agent that stops reporting keeps its last
/// snapshot until the driver evicts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Driver-assigned id (e.g. `veh_12`, `ped_3`)
    pub id: String,

    /// Vehicle or pedestrian
    pub role: Role,

    /// Planar position [x, y] in meters
    pub position: Vector2<f64>,

    /// Scalar speed in m/s (≥ 0)
    pub speed_mps: f64,

    /// Heading in degrees, 0–360, from the +x axis
    pub heading_deg: f64,

    /// Receipt timestamp (seconds, driver clock)
    pub timestamp: f64,
}

impl EntitySnapshot {
    /// Velocity vector implied by speed and heading.
    #[inline]
    pub fn velocity(&self) -> Vector2<f64> {
        crate::kinematics::velocity_from_heading(self.speed_mps, self.heading_deg)
    }

    /// Rejects malformed numeric input at the boundary.
    ///
    /// Degenerate-but-finite kinematics (zero speed, coincident positions)
    /// are valid; only NaN/infinite fields and negative speed are errors.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        use crate::error::CoreError;

        if self.id.is_empty() {
            return Err(CoreError::invalid("empty entity id"));
        }
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(CoreError::NonFinite { field: "position" });
        }
        if !self.speed_mps.is_finite() {
            return Err(CoreError::NonFinite { field: "speed_mps" });
        }
        if self.speed_mps < 0.0 {
            return Err(CoreError::invalid("speed_mps must be >= 0"));
        }
        if !self.heading_deg.is_finite() {
            return Err(CoreError::NonFinite { field: "heading_deg" });
        }
        Ok(())
    }
}

// ============================================================================
// SSM RECORDS
// ============================================================================

/// One row of surrogate safety metrics for an (ego, other) pair.
///
/// Produced fresh on every scan; the only retained copy is the bounded one
/// in the telemetry ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsmRecord {
    pub ego_id: String,
    pub other_id: String,
    pub distance_m: f64,
    /// Positive when closing, negative when separating
    pub closing_speed_mps: f64,
    /// Magnitude of the relative velocity vector
    pub delta_v_mps: f64,
    /// `None` ⇔ the pair never meets under linear extrapolation
    pub ttc_s: Option<f64>,
    pub required_deceleration_mps2: f64,
    /// `None` ⇔ the follower is stationary
    pub time_headway_s: Option<f64>,
    /// Arrival-time PET proxy; `None` ⇔ not closing or actor stationary
    pub pet_s: Option<f64>,
    pub timestamp: f64,
}

// ============================================================================
// ALERTS
// ============================================================================

/// Alert category emitted by the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Synthetic sentinel: no pair triggered any threshold this call
    Safe,
    CollisionWarning,
    CollisionImminent,
    SlowDownVru,
    EmergencyBrakeVru,
    Keep,
}

/// Discrete action recommended to the driving stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Keep,
    SlowDown,
    EmergencyBrake,
}

/// Severity grade attached to vehicle↔pedestrian assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A derived alert for one evaluated pair (or the synthetic `safe` sentinel).
///
/// Never authoritative state: always recomputed from the current SSM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub from_id: String,
    /// `None` for the synthetic `safe` sentinel
    pub to_id: Option<String>,
    /// Bounded to [0, 1]; `None` for the sentinel
    pub risk_score: Option<f64>,
    pub recommended_action: Option<RecommendedAction>,
    pub ttc_s: Option<f64>,
    pub timestamp: f64,
}

impl Alert {
    /// The synthetic per-call sentinel emitted when no pair triggered.
    pub fn safe(ego_id: &str, timestamp: f64) -> Self {
        Self {
            kind: AlertKind::Safe,
            from_id: ego_id.to_string(),
            to_id: None,
            risk_score: None,
            recommended_action: None,
            ttc_s: None,
            timestamp,
        }
    }
}

// ============================================================================
// VRU ASSESSMENT
// ============================================================================

/// Single-pair vehicle↔pedestrian evaluation, returned by `check_vru`.
///
/// Carries both the additive `risk_score` and the independently derived
/// guard-based `recommended_action`/`severity`; the two deliberately do not
/// collapse into one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VruAssessment {
    pub vehicle_id: String,
    pub pedestrian_id: String,
    pub distance_m: f64,
    pub closing_speed_mps: f64,
    pub delta_v_mps: f64,
    pub ttc_s: Option<f64>,
    pub pet_s: Option<f64>,
    pub required_deceleration_mps2: f64,
    pub time_headway_s: Option<f64>,
    pub risk_score: f64,
    pub recommended_action: RecommendedAction,
    pub severity: Severity,
    pub timestamp: f64,
}

// ============================================================================
// ROADSIDE UNITS
// ============================================================================

/// A fixed roadside sensor with a circular detection footprint.
/// Static for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadsideSensor {
    pub id: String,
    pub position: Vector2<f64>,
    pub detection_radius_m: f64,
}

/// One proximity detection: an entity observed inside a sensor's radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub sensor_id: String,
    pub object_type: Role,
    pub object_id: String,
    pub object_position: Vector2<f64>,
    pub distance_m: f64,
    pub speed_mps: f64,
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_kind_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&AlertKind::CollisionImminent).unwrap();
        assert_eq!(json, "\"collision_imminent\"");
        let json = serde_json::to_string(&RecommendedAction::EmergencyBrake).unwrap();
        assert_eq!(json, "\"emergency_brake\"");
    }

    #[test]
    fn safe_sentinel_shape() {
        let alert = Alert::safe("veh_1", 12.5);
        let v = serde_json::to_value(&alert).unwrap();
        assert_eq!(v["type"], "safe");
        assert_eq!(v["from_id"], "veh_1");
        assert!(v["to_id"].is_null());
        assert!(v["risk_score"].is_null());
    }

    #[test]
    fn snapshot_velocity_matches_heading() {
        let snap = EntitySnapshot {
            id: "veh_1".into(),
            role: Role::Vehicle,
            position: Vector2::new(0.0, 0.0),
            speed_mps: 10.0,
            heading_deg: 180.0,
            timestamp: 0.0,
        };
        let v = snap.velocity();
        assert!((v.x + 10.0).abs() < 1e-9);
        assert!(v.y.abs() < 1e-9);
    }
}
