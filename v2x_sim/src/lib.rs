//! V2X Corridor Simulation Harness
//!
//! A deterministic traffic harness for exercising the surrogate safety
//! engine end to end. A seeded corridor world generates vehicles flowing
//! along a straight road and pedestrians crossing it; the runner feeds
//! every tick through the engine's check operations and closes the loop
//! by applying the recommended actions back to the simulated speeds.
//!
//! All randomness derives from a single 64-bit seed, so any run can be
//! reproduced exactly from its seed.

pub mod runner;
pub mod world;

pub use runner::{CorridorRunner, HarnessResult, HarnessStats};
pub use world::{CorridorWorld, SimConfig, SimPedestrian, SimVehicle};
