//! Frame results and diagnostics.
//!
//! These types describe what happened while processing one capture frame:
//! - the resulting [`PoseState`]
//! - how many markers and segments were observed, reconstructed or repaired
//! - timing information for profiling

use crate::skeleton::SegmentName;
use crate::tracking::PoseState;

/// Summary of a single processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub index: u64,
    pub state: PoseState,
    pub metrics: FrameMetrics,
    pub timing: TimingStats,
    /// Segments that had no data after localization.
    pub missing_after_localization: Vec<SegmentName>,
    /// Segments still without data after repair.
    pub unresolved: Vec<SegmentName>,
}

/// Counts useful for judging capture quality.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameMetrics {
    pub markers_observed: usize,
    pub markers_reconstructed: usize,
    pub segments_repaired: usize,
    pub chains_solved: usize,
    pub chains_failed: usize,
    pub height_cm: f64,
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub localize_ms: f64,
    pub reconstruct_ms: f64,
    pub repair_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self {
            total_ms: 0.0,
            localize_ms: 0.0,
            reconstruct_ms: 0.0,
            repair_ms: 0.0,
        }
    }
}
