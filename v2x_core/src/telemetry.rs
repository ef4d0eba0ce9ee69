//! Bounded telemetry retention: fixed-capacity ring buffers with
//! time-window queries.
//!
//! One buffer each for vehicle↔vehicle SSM rows, vehicle↔pedestrian
//! assessments, alerts, and roadside detections. Appending to a full buffer
//! evicts the oldest entry; the engine's snapshot operation reads back a
//! recency window (60 s for detections, 600 s for SSM rows and alerts).

use crate::types::{Alert, Detection, SsmRecord, VruAssessment};
use std::collections::VecDeque;

/// Default per-buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 20_000;

/// Records that can be filtered by age.
pub trait Timestamped {
    /// Record timestamp in seconds (driver clock).
    fn timestamp(&self) -> f64;
}

impl Timestamped for SsmRecord {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

impl Timestamped for Alert {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

impl Timestamped for Detection {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

impl Timestamped for VruAssessment {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

// ============================================================================
// RING BUFFER
// ============================================================================

/// FIFO buffer that holds at most `capacity` records.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` records (must be > 0).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a record, evicting the oldest one when full.
    pub fn push(&mut self, record: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(record);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Iterates retained records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T: Timestamped + Clone> RingBuffer<T> {
    /// Records no older than `max_age_s` at `now`, in arrival order.
    pub fn query_recent(&self, now: f64, max_age_s: f64) -> Vec<T> {
        self.buf
            .iter()
            .filter(|r| now - r.timestamp() <= max_age_s)
            .cloned()
            .collect()
    }
}

// ============================================================================
// BUFFER BUNDLE
// ============================================================================

/// The engine's full set of telemetry buffers.
#[derive(Debug)]
pub struct TelemetryBuffers {
    /// Vehicle↔vehicle SSM rows
    pub ssm: RingBuffer<SsmRecord>,

    /// Vehicle↔pedestrian single-pair assessments
    pub vru: RingBuffer<VruAssessment>,

    /// Alerts (including `safe` sentinels)
    pub alerts: RingBuffer<Alert>,

    /// Roadside-unit detections
    pub rsu: RingBuffer<Detection>,
}

impl TelemetryBuffers {
    /// Creates the bundle with a shared per-buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ssm: RingBuffer::with_capacity(capacity),
            vru: RingBuffer::with_capacity(capacity),
            alerts: RingBuffer::with_capacity(capacity),
            rsu: RingBuffer::with_capacity(capacity),
        }
    }
}

impl Default for TelemetryBuffers {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Alert;

    fn alert(ts: f64) -> Alert {
        Alert::safe("veh_1", ts)
    }

    #[test]
    fn capacity_three_retains_last_three_in_order() {
        let mut buf = RingBuffer::with_capacity(3);
        for ts in 0..5 {
            buf.push(alert(ts as f64));
        }

        assert_eq!(buf.len(), 3);
        let stamps: Vec<f64> = buf.iter().map(|a| a.timestamp).collect();
        assert_eq!(stamps, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn query_recent_filters_by_age() {
        let mut buf = RingBuffer::with_capacity(100);
        buf.push(alert(0.0));
        buf.push(alert(550.0));
        buf.push(alert(990.0));

        let recent = buf.query_recent(1000.0, 600.0);
        let stamps: Vec<f64> = recent.iter().map(|a| a.timestamp).collect();
        assert_eq!(stamps, vec![550.0, 990.0]);
    }

    #[test]
    fn query_recent_boundary_is_inclusive() {
        let mut buf = RingBuffer::with_capacity(10);
        buf.push(alert(40.0));
        let recent = buf.query_recent(100.0, 60.0);
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut buf = RingBuffer::with_capacity(0);
        buf.push(alert(1.0));
        buf.push(alert(2.0));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.iter().next().unwrap().timestamp, 2.0);
    }
}
