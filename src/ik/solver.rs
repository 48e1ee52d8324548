//! Common solver interface and settings.

use crate::skeleton::Segment;

/// A chain solver moves the segments of `chain` so that its last element
/// reaches `target`.
///
/// `chain[0]` is the chain root and stays in place. `parent` is the segment
/// above `chain[0]`, used as the reference frame for its joint limits.
/// Returns `true` when the tip ended within the distance threshold, or when
/// the target was out of reach and the chain was stretched towards it.
pub trait ChainSolver {
    fn solve_chain(&self, chain: &mut [Segment], target: &Segment, parent: &Segment) -> bool;

    /// Short name for log output.
    fn name(&self) -> &'static str;
}

/// Termination settings shared by both solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Tip-to-target distance counted as reached (meters).
    pub distance_threshold: f64,
}

impl SolverSettings {
    pub fn new(max_iterations: usize, distance_threshold: f64) -> Self {
        Self {
            max_iterations,
            distance_threshold,
        }
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self::new(140, 0.01)
    }
}
