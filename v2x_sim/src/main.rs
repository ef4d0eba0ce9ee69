//! V2X Corridor Harness CLI
//!
//! Runs a seeded corridor traffic scenario against the surrogate safety
//! engine and prints a run summary.

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use v2x_sim::{CorridorRunner, SimConfig};

/// V2X surrogate safety harness CLI
#[derive(Parser, Debug)]
#[command(name = "v2x-sim")]
#[command(about = "Run a seeded corridor scenario against the safety engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of vehicles to spawn
    #[arg(long, default_value = "8")]
    vehicles: usize,

    /// Number of crossing pedestrians
    #[arg(long, default_value = "3")]
    pedestrians: usize,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "60")]
    duration: f64,

    /// Tick rate in Hz
    #[arg(short, long, default_value = "10")]
    tick_rate: u32,

    /// Entity TTL handed to the engine in seconds (0 disables sweeping)
    #[arg(long, default_value = "30")]
    ttl: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let config = SimConfig {
        seed,
        num_vehicles: args.vehicles,
        num_pedestrians: args.pedestrians,
        tick_rate_hz: args.tick_rate,
        duration_secs: args.duration,
        entity_ttl_s: args.ttl,
        ..SimConfig::default()
    };

    let result = CorridorRunner::new(config).run();

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("Error: failed to serialize summary: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("Run summary (seed={})", result.seed);
    info!(
        "  {} ticks over {:.1}s, {} entities tracked",
        result.total_ticks, result.final_time_secs, result.tracked_entities
    );
    info!(
        "  vehicle checks: {} ({} warnings, {} imminent, {} skipped pairs)",
        result.stats.vehicle_checks,
        result.stats.collision_warnings,
        result.stats.collision_imminent,
        result.stats.skipped_pairs
    );
    info!(
        "  vru checks: {} ({} slow-downs, {} emergency brakes)",
        result.stats.vru_checks, result.stats.vru_slow_downs, result.stats.vru_emergency_brakes
    );
    info!(
        "  roadside detections: {}, evicted entities: {}",
        result.stats.roadside_detections, result.stats.evicted_entities
    );
}
