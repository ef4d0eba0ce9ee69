//! Roadside detection scanner: fixed sensors with circular footprints.
//!
//! Runs independently of the conflict scan, once per simulation step over
//! the full current entity set. Brute-force `O(|sensors| × |entities|)`;
//! at expected scale (tens of sensors, hundreds of entities) no spatial
//! index is warranted.

use crate::kinematics::distance;
use crate::types::{Detection, EntitySnapshot, RoadsideSensor};

/// Emits proximity detections for a static set of roadside sensors.
#[derive(Debug, Clone, Default)]
pub struct RoadsideScanner {
    sensors: Vec<RoadsideSensor>,
}

impl RoadsideScanner {
    /// Creates a scanner over a static sensor set.
    pub fn new(sensors: Vec<RoadsideSensor>) -> Self {
        Self { sensors }
    }

    /// The configured sensors.
    pub fn sensors(&self) -> &[RoadsideSensor] {
        &self.sensors
    }

    /// One detection per (sensor, entity) pair within the sensor's radius.
    /// The radius boundary is inclusive.
    pub fn scan<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a EntitySnapshot> + Clone,
        now: f64,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();

        for sensor in &self.sensors {
            for entity in entities.clone() {
                let d = distance(&sensor.position, &entity.position);
                if d <= sensor.detection_radius_m {
                    detections.push(Detection {
                        sensor_id: sensor.id.clone(),
                        object_type: entity.role,
                        object_id: entity.id.clone(),
                        object_position: entity.position,
                        distance_m: d,
                        speed_mps: entity.speed_mps,
                        timestamp: now,
                    });
                }
            }
        }

        detections
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use nalgebra::Vector2;

    fn sensor(id: &str, x: f64, y: f64, radius: f64) -> RoadsideSensor {
        RoadsideSensor {
            id: id.to_string(),
            position: Vector2::new(x, y),
            detection_radius_m: radius,
        }
    }

    fn entity(id: &str, x: f64, y: f64) -> EntitySnapshot {
        EntitySnapshot {
            id: id.to_string(),
            role: Role::Vehicle,
            position: Vector2::new(x, y),
            speed_mps: 8.0,
            heading_deg: 0.0,
            timestamp: 0.0,
        }
    }

    #[test]
    fn detects_inside_radius_only() {
        let scanner = RoadsideScanner::new(vec![sensor("rsu_a", 100.0, 100.0, 20.0)]);
        let near = entity("veh_near", 115.0, 100.0);
        let far = entity("veh_far", 130.0, 100.0);

        let detections = scanner.scan([&near, &far].into_iter(), 5.0);
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.object_id, "veh_near");
        assert_eq!(d.sensor_id, "rsu_a");
        assert!((d.distance_m - 15.0).abs() < 1e-9);
        assert_eq!(d.timestamp, 5.0);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let scanner = RoadsideScanner::new(vec![sensor("rsu_a", 0.0, 0.0, 20.0)]);
        let edge = entity("veh_edge", 20.0, 0.0);
        let detections = scanner.scan(std::iter::once(&edge), 0.0);
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn every_sensor_reports_independently() {
        let scanner = RoadsideScanner::new(vec![
            sensor("rsu_a", 0.0, 0.0, 50.0),
            sensor("rsu_b", 30.0, 0.0, 50.0),
        ]);
        let e = entity("veh_1", 10.0, 0.0);
        let detections = scanner.scan(std::iter::once(&e), 0.0);
        assert_eq!(detections.len(), 2);
    }
}
