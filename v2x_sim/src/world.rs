//! Corridor world: seeded ground-truth traffic for the harness.
//!
//! A straight two-direction corridor with vehicles flowing along the x
//! axis, pedestrians crossing it, and fixed roadside units spaced along the
//! roadside. All randomness comes from a single ChaCha8 seed, so a run is
//! reproducible from its seed alone.

use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use v2x_core::{RecommendedAction, RoadsideSensor};

/// Configuration for a harness run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of vehicles to spawn
    pub num_vehicles: usize,

    /// Number of crossing pedestrians
    pub num_pedestrians: usize,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Simulated duration in seconds
    pub duration_secs: f64,

    /// Corridor length in meters
    pub corridor_length_m: f64,

    /// Entity TTL handed to the engine (seconds); 0 disables sweeping
    pub entity_ttl_s: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_vehicles: 8,
            num_pedestrians: 3,
            tick_rate_hz: 10,
            duration_secs: 60.0,
            corridor_length_m: 800.0,
            entity_ttl_s: 30.0,
        }
    }
}

/// One simulated vehicle.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: String,
    pub position: Vector2<f64>,
    pub speed_mps: f64,
    pub heading_deg: f64,
    /// Cruise speed the vehicle recovers toward after braking
    pub target_speed_mps: f64,
}

/// One simulated crossing pedestrian.
#[derive(Debug, Clone)]
pub struct SimPedestrian {
    pub id: String,
    pub position: Vector2<f64>,
    pub speed_mps: f64,
    pub heading_deg: f64,
}

/// The full simulated corridor.
pub struct CorridorWorld {
    pub vehicles: Vec<SimVehicle>,
    pub pedestrians: Vec<SimPedestrian>,
    pub sensors: Vec<RoadsideSensor>,
    /// Simulation time in seconds
    pub time: f64,
    config: SimConfig,
}

impl CorridorWorld {
    /// Spawns traffic from the config seed.
    pub fn new(config: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let vehicles = (0..config.num_vehicles)
            .map(|i| {
                // Alternate directions; eastbound lane at y=0, westbound at y=3.5.
                let eastbound = i % 2 == 0;
                let target = rng.gen_range(8.0..14.0);
                SimVehicle {
                    id: format!("veh_{i}"),
                    position: Vector2::new(
                        rng.gen_range(0.0..config.corridor_length_m),
                        if eastbound { 0.0 } else { 3.5 },
                    ),
                    speed_mps: target,
                    heading_deg: if eastbound { 0.0 } else { 180.0 },
                    target_speed_mps: target,
                }
            })
            .collect();

        let pedestrians = (0..config.num_pedestrians)
            .map(|i| {
                let northbound = i % 2 == 0;
                SimPedestrian {
                    id: format!("ped_{i}"),
                    position: Vector2::new(
                        rng.gen_range(50.0..config.corridor_length_m - 50.0),
                        if northbound { -6.0 } else { 9.5 },
                    ),
                    speed_mps: rng.gen_range(0.8..1.8),
                    heading_deg: if northbound { 90.0 } else { 270.0 },
                }
            })
            .collect();

        // One RSU every 250 m along the roadside.
        let sensors = (0..)
            .map(|i| i as f64 * 250.0)
            .take_while(|x| *x <= config.corridor_length_m)
            .enumerate()
            .map(|(i, x)| RoadsideSensor {
                id: format!("rsu_{i}"),
                position: Vector2::new(x, 8.0),
                detection_radius_m: 120.0,
            })
            .collect();

        Self {
            vehicles,
            pedestrians,
            sensors,
            time: 0.0,
            config,
        }
    }

    /// Advances ground truth by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        let length = self.config.corridor_length_m;

        for v in &mut self.vehicles {
            // Recover toward cruise speed after a braking action.
            if v.speed_mps < v.target_speed_mps {
                v.speed_mps = (v.speed_mps + 1.5 * dt).min(v.target_speed_mps);
            }
            let rad = v.heading_deg.to_radians();
            v.position.x += v.speed_mps * rad.cos() * dt;
            v.position.y += v.speed_mps * rad.sin() * dt;

            // Wrap around the corridor so traffic density stays constant.
            if v.position.x > length {
                v.position.x -= length;
            } else if v.position.x < 0.0 {
                v.position.x += length;
            }
        }

        for p in &mut self.pedestrians {
            let rad = p.heading_deg.to_radians();
            p.position.y += p.speed_mps * rad.sin() * dt;

            // Turn around at the corridor edges.
            if p.position.y > 9.5 {
                p.heading_deg = 270.0;
            } else if p.position.y < -6.0 {
                p.heading_deg = 90.0;
            }
        }
    }

    /// Applies a recommended action to a vehicle's simulated speed.
    pub fn apply_action(&mut self, vehicle_id: &str, action: RecommendedAction) {
        if let Some(v) = self.vehicles.iter_mut().find(|v| v.id == vehicle_id) {
            match action {
                RecommendedAction::Keep => {}
                RecommendedAction::SlowDown => v.speed_mps *= 0.6,
                RecommendedAction::EmergencyBrake => v.speed_mps *= 0.1,
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
