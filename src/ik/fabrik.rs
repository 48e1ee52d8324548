//! Forward And Backward Reaching Inverse Kinematics.
//!
//! Works on joint positions only: the forward pass drags the chain from the
//! goal back towards the root, the backward pass re-anchors the root and
//! walks out to the tip. Segment orientations are re-aimed along their new
//! bones afterwards and only twist limits are enforced, since swing is
//! already implied by the positions.

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::rotation::DIRECTION_EPSILON;
use crate::geometry::{is_finite_rotation, rotation_between};
use crate::skeleton::Segment;

use super::chain::{
    bone_lengths, is_reachable, parent_at, solvable_goal, stretch_toward, tip_distance,
};
use super::constraints::ConstraintChecker;
use super::solver::{ChainSolver, SolverSettings};

/// Offset used to pull apart coincident joints.
const SEPARATION: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct FabrikSolver {
    pub settings: SolverSettings,
    pub checker: ConstraintChecker,
}

impl Default for FabrikSolver {
    fn default() -> Self {
        Self {
            settings: SolverSettings::new(100, 0.01),
            checker: ConstraintChecker::default(),
        }
    }
}

impl FabrikSolver {
    pub fn new(settings: SolverSettings, checker: ConstraintChecker) -> Self {
        Self { settings, checker }
    }

    /// Writes solved positions back and re-aims every orientation along its
    /// new bone, enforcing twist limits.
    fn apply_positions(
        &self,
        chain: &mut [Segment],
        positions: &[Vector3<f64>],
        target: &Segment,
        parent: &Segment,
    ) {
        let n = chain.len();
        let old: Vec<Vector3<f64>> = chain.iter().map(|s| s.position).collect();
        for i in 0..n {
            if i + 1 < n {
                let rotation =
                    rotation_between(&(old[i + 1] - old[i]), &(positions[i + 1] - positions[i]));
                chain[i].orientation = rotation * chain[i].orientation;
            } else if is_finite_rotation(&target.orientation) {
                chain[i].orientation = target.orientation;
            }
            chain[i].position = positions[i];

            let above = parent_at(chain, parent, i);
            if let Some(fix) = self.checker.check_twist(&chain[i], &above) {
                chain[i].orientation = fix.rotation * chain[i].orientation;
            }
        }
    }
}

impl ChainSolver for FabrikSolver {
    fn solve_chain(&self, chain: &mut [Segment], target: &Segment, parent: &Segment) -> bool {
        let Some(goal) = solvable_goal(chain, target) else {
            return false;
        };
        if !is_reachable(chain, &goal) {
            stretch_toward(chain, &goal, parent, &self.checker);
            return true;
        }

        let threshold = self.settings.distance_threshold;
        let mut previous = tip_distance(chain, &goal);
        if previous < threshold {
            return true;
        }

        let n = chain.len();
        let lengths = bone_lengths(chain);
        let root = chain[0].position;
        let hint = (goal - root)
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(Vector3::y);
        let mut positions: Vec<Vector3<f64>> = chain.iter().map(|s| s.position).collect();

        for iteration in 0..self.settings.max_iterations {
            // Forward: tip to goal, drag towards the root.
            positions[n - 1] = goal;
            for i in (0..n - 1).rev() {
                let fixed = positions[i + 1];
                separate(&mut positions[i], &fixed, &-hint);
                positions[i] = reach(&fixed, &positions[i], lengths[i]);
            }

            // Backward: root back in place, walk out to the tip.
            positions[0] = root;
            for i in 0..n - 1 {
                let fixed = positions[i];
                separate(&mut positions[i + 1], &fixed, &hint);
                positions[i + 1] = reach(&fixed, &positions[i + 1], lengths[i]);
            }
            self.apply_positions(chain, &positions, target, parent);

            let distance = tip_distance(chain, &goal);
            if distance < threshold {
                debug!(iterations = iteration + 1, "FABRIK reached target");
                return true;
            }
            if distance >= previous {
                debug!(distance, "FABRIK stopped improving");
                return false;
            }
            previous = distance;
        }
        debug!(distance = previous, "FABRIK hit iteration limit");
        false
    }

    fn name(&self) -> &'static str {
        "fabrik"
    }
}

/// Point at `length` from `anchor` on the ray towards `toward`.
#[inline]
fn reach(anchor: &Vector3<f64>, toward: &Vector3<f64>, length: f64) -> Vector3<f64> {
    let r = (toward - anchor).norm();
    let lambda = length / r;
    anchor * (1.0 - lambda) + toward * lambda
}

/// Nudges `moving` off `fixed` along `direction` when the two coincide.
#[inline]
fn separate(moving: &mut Vector3<f64>, fixed: &Vector3<f64>, direction: &Vector3<f64>) {
    if (*moving - fixed).norm() < DIRECTION_EPSILON {
        *moving = fixed + direction * SEPARATION;
    }
}
