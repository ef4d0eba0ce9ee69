//! V2X Surrogate Safety Core
//!
//! Ingests streaming kinematic snapshots (position, speed, heading) of
//! vehicles and pedestrians and computes, per update, pairwise surrogate
//! safety metrics: time-to-collision, required deceleration, time headway,
//! and a post-encroachment-time proxy. A threshold-table classifier turns
//! each SSM tuple into a bounded risk score and a discrete recommended
//! action (keep / slow down / emergency brake); bounded ring buffers retain
//! recent history for snapshot queries.
//!
//! The crate is the metrics-and-classification engine only. Simulation
//! driving, visualization, and durable storage are external collaborators
//! that talk to [`SafetyEngine`] through its synchronous operations.

pub mod classifier;
pub mod clock;
pub mod engine;
pub mod error;
pub mod kinematics;
pub mod roadside;
pub mod scanner;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export the engine surface for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    EngineConfig, KinematicUpdate, RsuReport, SafetyEngine, SnapshotView, VehicleCheckResponse,
};
pub use error::CoreError;
pub use types::{
    Alert, AlertKind, Detection, EntitySnapshot, RecommendedAction, RoadsideSensor, Role,
    Severity, SsmRecord, VruAssessment,
};
