//! Conflict scanner: pairwise SSM computation for an updating ego entity.
//!
//! `scan_against_all` walks every other currently known entity in store
//! insertion order (callers must not read proximity into the output order)
//! and computes one SSM row per pair. The scan deliberately does not filter
//! by role: a pedestrian upserted into the shared store is scanned like any
//! other entity.
//!
//! A pair whose snapshot carries non-finite values is skipped and reported,
//! never silently dropped, and never aborts the remaining pairs.

use crate::error::CoreError;
use crate::kinematics::{
    closing_speed, distance, finite_or_none, pet_proxy, required_deceleration, time_headway, ttc,
};
use crate::types::{EntitySnapshot, SsmRecord};
use serde::{Deserialize, Serialize};

/// Raw per-pair metrics with `f64::INFINITY` sentinels, before the
/// `Option` conversion wire records use.
#[derive(Debug, Clone, Copy)]
pub struct PairMetrics {
    pub distance_m: f64,
    pub closing_speed_mps: f64,
    pub delta_v_mps: f64,
    pub ttc_s: f64,
    pub required_deceleration_mps2: f64,
    pub time_headway_s: f64,
    pub pet_s: f64,
}

/// A pair the scanner could not evaluate, surfaced distinctly from a
/// "no risk" result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedPair {
    pub other_id: String,
    pub reason: String,
}

/// Result of one full scan: the rows that succeeded plus the pairs that
/// did not. Partial results are returned as-is.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub records: Vec<SsmRecord>,
    pub skipped: Vec<SkippedPair>,
}

/// Computes the SSM tuple for one (ego, other) pair.
///
/// `actor_speed_mps` feeds the PET proxy: the pedestrian's speed for a
/// vehicle↔pedestrian pair, the ego's own speed for a vehicle↔vehicle row.
pub fn compute_pair(
    ego: &EntitySnapshot,
    other: &EntitySnapshot,
    actor_speed_mps: f64,
) -> Result<PairMetrics, CoreError> {
    other.validate()?;

    let pos_rel = other.position - ego.position;
    let rel_vel = ego.velocity() - other.velocity();

    let distance_m = distance(&ego.position, &other.position);
    let closing = closing_speed(&pos_rel, &rel_vel);
    let delta_v = rel_vel.norm();

    Ok(PairMetrics {
        distance_m,
        closing_speed_mps: closing,
        delta_v_mps: delta_v,
        ttc_s: ttc(distance_m, closing),
        required_deceleration_mps2: required_deceleration(delta_v, distance_m, 0.0),
        time_headway_s: time_headway(distance_m, ego.speed_mps),
        pet_s: pet_proxy(distance_m, closing, actor_speed_mps),
    })
}

impl PairMetrics {
    /// Converts the raw metrics into a wire-facing SSM row.
    pub fn into_record(self, ego_id: &str, other_id: &str, timestamp: f64) -> SsmRecord {
        SsmRecord {
            ego_id: ego_id.to_string(),
            other_id: other_id.to_string(),
            distance_m: self.distance_m,
            closing_speed_mps: self.closing_speed_mps,
            delta_v_mps: self.delta_v_mps,
            ttc_s: finite_or_none(self.ttc_s),
            required_deceleration_mps2: self.required_deceleration_mps2,
            time_headway_s: finite_or_none(self.time_headway_s),
            pet_s: finite_or_none(self.pet_s),
            timestamp,
        }
    }
}

/// One successfully evaluated pair, metrics still in raw sentinel form so
/// the classifier can consume them directly.
#[derive(Debug, Clone)]
pub struct EvaluatedPair {
    pub other_id: String,
    pub metrics: PairMetrics,
}

/// Evaluates the ego against every other entity, keeping raw metrics.
///
/// `others` is expected in store insertion order; the output preserves it.
pub fn evaluate_against_all(
    ego: &EntitySnapshot,
    others: &[&EntitySnapshot],
) -> (Vec<EvaluatedPair>, Vec<SkippedPair>) {
    let mut pairs = Vec::new();
    let mut skipped = Vec::new();

    for other in others {
        if other.id == ego.id {
            continue;
        }
        match compute_pair(ego, other, ego.speed_mps) {
            Ok(metrics) => pairs.push(EvaluatedPair {
                other_id: other.id.clone(),
                metrics,
            }),
            Err(err) => skipped.push(SkippedPair {
                other_id: other.id.clone(),
                reason: err.to_string(),
            }),
        }
    }

    (pairs, skipped)
}

/// Scans the ego against every other entity, one SSM row per pair.
pub fn scan_against_all(
    ego: &EntitySnapshot,
    others: &[&EntitySnapshot],
    now: f64,
) -> ScanOutcome {
    let (pairs, skipped) = evaluate_against_all(ego, others);
    ScanOutcome {
        records: pairs
            .into_iter()
            .map(|p| p.metrics.into_record(&ego.id, &p.other_id, now))
            .collect(),
        skipped,
    }
}

// ============================================================================
// TESTS
// ============================================================================
