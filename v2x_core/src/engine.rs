//! The safety engine: coarse-locked facade over the entity store, the
//! scanners, the classifier, and the telemetry buffers.
//!
//! One `Mutex` guards all shared mutable state, giving the guarantees the
//! external driver relies on: no upsert is lost, a scan
//! never observes a half-written record, and buffer appends are atomic.
//! Updates for the same id are applied in lock-acquisition order at this
//! boundary, so last-writer-wins reflects receipt order.
//!
//! All methods are synchronous; the driver owns any per-call timeout.

use crate::classifier::{
    classify_vehicle_pair, classify_vru_pair, VehicleThresholds, VruThresholds,
};
use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::kinematics::finite_or_none;
use crate::roadside::RoadsideScanner;
use crate::scanner::{compute_pair, evaluate_against_all, SkippedPair};
use crate::store::EntityStore;
use crate::telemetry::{TelemetryBuffers, DEFAULT_BUFFER_CAPACITY};
use crate::types::{
    Alert, Detection, EntitySnapshot, Role, RoadsideSensor, SsmRecord, VruAssessment,
};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Runtime configuration for the safety engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-buffer telemetry capacity (default 20,000 entries)
    pub buffer_capacity: usize,

    /// Snapshot recency window for roadside detections (default 60 s)
    pub rsu_window_s: f64,

    /// Snapshot recency window for alerts (default 600 s)
    pub alert_window_s: f64,

    /// Snapshot recency window for SSM rows (default 600 s)
    pub ssm_window_s: f64,

    /// Entity time-to-live for the explicit sweep; `None` disables sweeping
    pub entity_ttl_s: Option<f64>,

    /// Static roadside sensors for the internal detection scan
    pub sensors: Vec<RoadsideSensor>,

    pub vehicle_thresholds: VehicleThresholds,
    pub vru_thresholds: VruThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            rsu_window_s: 60.0,
            alert_window_s: 600.0,
            ssm_window_s: 600.0,
            entity_ttl_s: None,
            sensors: Vec::new(),
            vehicle_thresholds: VehicleThresholds::default(),
            vru_thresholds: VruThresholds::default(),
        }
    }
}

// ============================================================================
// REQUEST / RESPONSE SHAPES
// ============================================================================

/// One inbound kinematic update for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicUpdate {
    pub id: String,
    /// Planar position [x, y] in meters
    pub position: Vector2<f64>,
    pub speed_mps: f64,
    pub heading_deg: f64,
}

impl KinematicUpdate {
    fn into_snapshot(self, role: Role, timestamp: f64) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            role,
            position: self.position,
            speed_mps: self.speed_mps,
            heading_deg: self.heading_deg,
            timestamp,
        }
    }
}

/// A pre-computed roadside detection reported by the external driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsuReport {
    pub rsu_id: String,
    pub rsu_x: f64,
    pub rsu_y: f64,
    pub obj_type: Role,
    pub obj_id: String,
    pub obj_x: f64,
    pub obj_y: f64,
    pub distance_m: f64,
    pub speed_mps: f64,
}

/// Response of [`SafetyEngine::check_vehicle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleCheckResponse {
    pub vehicle_id: String,
    pub ssm: Vec<SsmRecord>,
    /// Non-empty, or exactly one synthetic `safe` sentinel
    pub alerts: Vec<Alert>,
    /// Pairs whose computation failed; distinct from "no risk"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedPair>,
}

/// Read-only bounded view for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotView {
    /// All currently tracked entities (live state, not history)
    pub vehicles: Vec<EntitySnapshot>,
    pub rsu_recent: Vec<Detection>,
    pub alerts_recent: Vec<Alert>,
    pub ssm_recent: Vec<SsmRecord>,
    pub server_time: f64,
}

// ============================================================================
// ENGINE
// ============================================================================

/// State behind the engine's single coarse lock.
#[derive(Debug, Default)]
struct EngineInner {
    store: EntityStore,
    buffers: TelemetryBuffers,
}

/// The metrics-and-classification engine, shared via `Arc` between
/// concurrent driver callers.
pub struct SafetyEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    roadside: RoadsideScanner,
    inner: Mutex<EngineInner>,
}

impl SafetyEngine {
    /// Creates an engine on the system clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine on an explicit clock (tests, simulation).
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let roadside = RoadsideScanner::new(config.sensors.clone());
        let inner = EngineInner {
            store: EntityStore::new(),
            buffers: TelemetryBuffers::with_capacity(config.buffer_capacity),
        };
        Self {
            config,
            clock,
            roadside,
            inner: Mutex::new(inner),
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        // Poisoning only happens if a holder panicked; the state itself is
        // still structurally sound (no partial writes escape a method).
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Upserts the ego vehicle, scans against all known entities, and
    /// returns SSM rows plus classified alerts.
    ///
    /// Malformed input is rejected before any state mutates. A pair that
    /// fails to evaluate is reported in `skipped` without aborting the rest.
    pub fn check_vehicle(
        &self,
        update: KinematicUpdate,
    ) -> Result<VehicleCheckResponse, CoreError> {
        let now = self.clock.now();
        let ego = update.into_snapshot(Role::Vehicle, now);
        ego.validate()?;

        let mut inner = self.lock();
        let ego_id = ego.id.clone();
        inner.store.upsert(ego.clone());

        let (pairs, skipped) = {
            let others = inner.store.all();
            evaluate_against_all(&ego, &others)
        };

        let mut ssm = Vec::with_capacity(pairs.len());
        let mut alerts = Vec::new();

        for pair in pairs {
            let record = pair.metrics.into_record(&ego_id, &pair.other_id, now);
            inner.buffers.ssm.push(record.clone());
            ssm.push(record);

            let classification =
                classify_vehicle_pair(&pair.metrics, &self.config.vehicle_thresholds);
            if let Some((kind, action)) = classification.alert {
                let alert = Alert {
                    kind,
                    from_id: ego_id.clone(),
                    to_id: Some(pair.other_id.clone()),
                    risk_score: Some(classification.risk_score),
                    recommended_action: Some(action),
                    ttc_s: finite_or_none(pair.metrics.ttc_s),
                    timestamp: now,
                };
                inner.buffers.alerts.push(alert.clone());
                alerts.push(alert);
            }
        }

        if alerts.is_empty() {
            let safe = Alert::safe(&ego_id, now);
            inner.buffers.alerts.push(safe.clone());
            alerts.push(safe);
        }

        Ok(VehicleCheckResponse {
            vehicle_id: ego_id,
            ssm,
            alerts,
            skipped,
        })
    }

    /// Evaluates a single vehicle↔pedestrian pair.
    ///
    /// Does not upsert either party into the entity store; the only state
    /// touched is the VRU telemetry buffer.
    pub fn check_vru(
        &self,
        vehicle: KinematicUpdate,
        pedestrian: KinematicUpdate,
    ) -> Result<VruAssessment, CoreError> {
        let now = self.clock.now();
        let veh = vehicle.into_snapshot(Role::Vehicle, now);
        let ped = pedestrian.into_snapshot(Role::Pedestrian, now);
        veh.validate()?;
        ped.validate()?;

        // PET actor is the pedestrian for this pair type.
        let metrics = compute_pair(&veh, &ped, ped.speed_mps)?;
        let classification = classify_vru_pair(&metrics, &self.config.vru_thresholds);

        let assessment = VruAssessment {
            vehicle_id: veh.id,
            pedestrian_id: ped.id,
            distance_m: metrics.distance_m,
            closing_speed_mps: metrics.closing_speed_mps,
            delta_v_mps: metrics.delta_v_mps,
            ttc_s: finite_or_none(metrics.ttc_s),
            pet_s: finite_or_none(metrics.pet_s),
            required_deceleration_mps2: metrics.required_deceleration_mps2,
            time_headway_s: finite_or_none(metrics.time_headway_s),
            risk_score: classification.risk_score,
            recommended_action: classification.recommended_action,
            severity: classification.severity,
            timestamp: now,
        };

        self.lock().buffers.vru.push(assessment.clone());
        Ok(assessment)
    }

    /// Records a detection pre-computed by the external driver.
    pub fn record_rsu_detection(&self, report: RsuReport) -> Result<(), CoreError> {
        if report.rsu_id.is_empty() || report.obj_id.is_empty() {
            return Err(CoreError::invalid("rsu_id and obj_id are required"));
        }
        if !report.distance_m.is_finite() || report.distance_m < 0.0 {
            return Err(CoreError::NonFinite {
                field: "distance_m",
            });
        }

        let detection = Detection {
            sensor_id: report.rsu_id,
            object_type: report.obj_type,
            object_id: report.obj_id,
            object_position: Vector2::new(report.obj_x, report.obj_y),
            distance_m: report.distance_m,
            speed_mps: report.speed_mps,
            timestamp: self.clock.now(),
        };
        self.lock().buffers.rsu.push(detection);
        Ok(())
    }

    /// Runs the internal roadside scan over the full current entity set,
    /// appending every detection to the RSU buffer.
    pub fn scan_roadside(&self) -> Vec<Detection> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let detections = {
            let entities = inner.store.all();
            self.roadside.scan(entities.into_iter(), now)
        };
        for d in &detections {
            inner.buffers.rsu.push(d.clone());
        }
        detections
    }

    /// Read-only bounded view of live entities and recent telemetry.
    pub fn snapshot(&self) -> SnapshotView {
        let now = self.clock.now();
        let inner = self.lock();
        SnapshotView {
            vehicles: inner.store.iter().cloned().collect(),
            rsu_recent: inner.buffers.rsu.query_recent(now, self.config.rsu_window_s),
            alerts_recent: inner
                .buffers
                .alerts
                .query_recent(now, self.config.alert_window_s),
            ssm_recent: inner.buffers.ssm.query_recent(now, self.config.ssm_window_s),
            server_time: now,
        }
    }

    /// Evicts entities older than the configured TTL. No-op when TTL is
    /// disabled. Returns the evicted ids.
    pub fn sweep_stale(&self) -> Vec<String> {
        match self.config.entity_ttl_s {
            Some(ttl) => {
                let now = self.clock.now();
                self.lock().store.evict_stale(now, ttl)
            }
            None => Vec::new(),
        }
    }

    /// Removes one entity explicitly (an "entity left" event).
    pub fn remove_entity(&self, id: &str) -> bool {
        self.lock().store.remove(id).is_some()
    }

    /// Number of currently tracked entities.
    pub fn entity_count(&self) -> usize {
        self.lock().store.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{AlertKind, RecommendedAction, Severity};
    use approx::assert_relative_eq;

    fn update(id: &str, x: f64, y: f64, speed: f64, heading: f64) -> KinematicUpdate {
        KinematicUpdate {
            id: id.to_string(),
            position: Vector2::new(x, y),
            speed_mps: speed,
            heading_deg: heading,
        }
    }

    fn engine_with_clock(config: EngineConfig) -> (SafetyEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000.0));
        let engine = SafetyEngine::with_clock(config, clock.clone());
        (engine, clock)
    }

    #[test]
    fn first_vehicle_sees_empty_world_as_safe() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        let resp = engine.check_vehicle(update("veh_1", 0.0, 0.0, 10.0, 0.0)).unwrap();

        assert!(resp.ssm.is_empty());
        assert_eq!(resp.alerts.len(), 1);
        assert_eq!(resp.alerts[0].kind, AlertKind::Safe);
    }

    #[test]
    fn head_on_pair_escalates_to_collision_imminent() {
        // Scenario: 3 m apart, closing at a combined 10 m/s.
        let (engine, _) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_a", 0.0, 0.0, 5.0, 0.0)).unwrap();
        let resp = engine
            .check_vehicle(update("veh_b", 3.0, 0.0, 5.0, 180.0))
            .unwrap();

        assert_eq!(resp.ssm.len(), 1);
        let row = &resp.ssm[0];
        assert_relative_eq!(row.ttc_s.unwrap(), 0.3, epsilon = 1e-9);

        assert_eq!(resp.alerts.len(), 1);
        let alert = &resp.alerts[0];
        assert_eq!(alert.kind, AlertKind::CollisionImminent);
        assert_eq!(alert.recommended_action, Some(RecommendedAction::EmergencyBrake));
        assert_eq!(alert.to_id.as_deref(), Some("veh_a"));
        let risk = alert.risk_score.unwrap();
        assert!((0.0..=1.0).contains(&risk));
        assert!(risk >= 0.8);
    }

    #[test]
    fn distant_stationary_pair_is_safe() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_a", 0.0, 0.0, 0.0, 0.0)).unwrap();
        let resp = engine.check_vehicle(update("veh_b", 50.0, 0.0, 0.0, 0.0)).unwrap();

        assert_eq!(resp.ssm.len(), 1);
        assert_eq!(resp.ssm[0].ttc_s, None);
        assert_eq!(resp.ssm[0].closing_speed_mps, 0.0);
        assert_eq!(resp.alerts.len(), 1);
        assert_eq!(resp.alerts[0].kind, AlertKind::Safe);
    }

    #[test]
    fn identical_calls_are_idempotent() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_a", 0.0, 0.0, 5.0, 0.0)).unwrap();

        let first = engine
            .check_vehicle(update("veh_b", 40.0, 0.0, 5.0, 180.0))
            .unwrap();
        let second = engine
            .check_vehicle(update("veh_b", 40.0, 0.0, 5.0, 180.0))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn last_writer_wins_per_entity() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_a", 0.0, 0.0, 5.0, 0.0)).unwrap();
        engine.check_vehicle(update("veh_a", 99.0, 1.0, 7.0, 90.0)).unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.vehicles.len(), 1);
        assert_eq!(snap.vehicles[0].position.x, 99.0);
        assert_eq!(snap.vehicles[0].speed_mps, 7.0);
    }

    #[test]
    fn malformed_input_rejected_without_mutation() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        let mut bad = update("veh_bad", 0.0, 0.0, 10.0, 0.0);
        bad.position.x = f64::NAN;

        assert!(engine.check_vehicle(bad).is_err());
        assert_eq!(engine.entity_count(), 0);

        let negative_speed = update("veh_neg", 0.0, 0.0, -1.0, 0.0);
        assert!(engine.check_vehicle(negative_speed).is_err());
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn vru_crossing_is_high_severity_and_leaves_store_alone() {
        // Scenario: vehicle at (0,0) heading 0° at 10 m/s, pedestrian at
        // (5,0) stationary → ttc 0.5 s, emergency_brake/high.
        let (engine, _) = engine_with_clock(EngineConfig::default());
        let assessment = engine
            .check_vru(
                update("veh_1", 0.0, 0.0, 10.0, 0.0),
                update("ped_1", 5.0, 0.0, 0.0, 0.0),
            )
            .unwrap();

        assert_relative_eq!(assessment.distance_m, 5.0, epsilon = 1e-9);
        assert_relative_eq!(assessment.closing_speed_mps, 10.0, epsilon = 1e-9);
        assert_relative_eq!(assessment.ttc_s.unwrap(), 0.5, epsilon = 1e-9);
        assert_eq!(assessment.pet_s, None); // stationary pedestrian
        assert_relative_eq!(assessment.risk_score, 0.8, epsilon = 1e-12);
        assert_eq!(assessment.recommended_action, RecommendedAction::EmergencyBrake);
        assert_eq!(assessment.severity, Severity::High);

        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn rsu_reports_age_out_of_the_snapshot_window() {
        let (engine, clock) = engine_with_clock(EngineConfig::default());
        engine
            .record_rsu_detection(RsuReport {
                rsu_id: "rsu_a".into(),
                rsu_x: 600.0,
                rsu_y: 10.0,
                obj_type: Role::Vehicle,
                obj_id: "veh_1".into(),
                obj_x: 590.0,
                obj_y: 10.0,
                distance_m: 10.0,
                speed_mps: 8.0,
            })
            .unwrap();

        assert_eq!(engine.snapshot().rsu_recent.len(), 1);

        clock.advance(61.0);
        assert!(engine.snapshot().rsu_recent.is_empty());
    }

    #[test]
    fn alerts_persist_in_the_ten_minute_window() {
        let (engine, clock) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_a", 0.0, 0.0, 5.0, 0.0)).unwrap();
        engine.check_vehicle(update("veh_b", 3.0, 0.0, 5.0, 180.0)).unwrap();

        clock.advance(599.0);
        assert!(!engine.snapshot().alerts_recent.is_empty());

        clock.advance(2.0);
        assert!(engine.snapshot().alerts_recent.is_empty());
    }

    #[test]
    fn internal_roadside_scan_feeds_the_buffer() {
        let mut config = EngineConfig::default();
        config.sensors.push(RoadsideSensor {
            id: "rsu_a".into(),
            position: Vector2::new(100.0, 100.0),
            detection_radius_m: 20.0,
        });
        let (engine, _) = engine_with_clock(config);

        engine.check_vehicle(update("veh_in", 115.0, 100.0, 8.0, 0.0)).unwrap();
        engine.check_vehicle(update("veh_out", 130.0, 100.0, 8.0, 0.0)).unwrap();

        let detections = engine.scan_roadside();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].object_id, "veh_in");
        assert_eq!(engine.snapshot().rsu_recent.len(), 1);
    }

    #[test]
    fn stale_entities_sweep_only_with_ttl_configured() {
        let config = EngineConfig {
            entity_ttl_s: Some(30.0),
            ..EngineConfig::default()
        };
        let (engine, clock) = engine_with_clock(config);

        engine.check_vehicle(update("veh_old", 0.0, 0.0, 5.0, 0.0)).unwrap();
        clock.advance(31.0);
        engine.check_vehicle(update("veh_new", 10.0, 0.0, 5.0, 0.0)).unwrap();

        let evicted = engine.sweep_stale();
        assert_eq!(evicted, vec!["veh_old".to_string()]);
        assert_eq!(engine.entity_count(), 1);
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for t in 0..4 {
            let engine = engine.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("veh_{t}");
                    let resp = engine
                        .check_vehicle(update(&id, i as f64, t as f64 * 100.0, 5.0, 0.0))
                        .expect("update must succeed");
                    assert!(!resp.alerts.is_empty());
                }
            }));
        }
        for h in handles {
            h.join().expect("worker panicked");
        }

        assert_eq!(engine.entity_count(), 4);
        // Every reader sees fully written records.
        for snap in engine.snapshot().vehicles {
            assert!(snap.position.x.is_finite());
        }
    }

    #[test]
    fn safe_sentinel_is_recorded_in_alert_history() {
        let (engine, _) = engine_with_clock(EngineConfig::default());
        engine.check_vehicle(update("veh_1", 0.0, 0.0, 10.0, 0.0)).unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.alerts_recent.len(), 1);
        assert_eq!(snap.alerts_recent[0].kind, AlertKind::Safe);
    }
}
