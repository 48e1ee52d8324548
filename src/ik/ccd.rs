//! Cyclic Coordinate Descent.
//!
//! Each iteration walks the joints from the tip back to the root. At every
//! joint the rest of the chain is rotated so that the joint-to-tip vector
//! points at the goal, scaled by the joint's stiffness, then that joint's
//! cone and twist limits are enforced. When an iteration fails to bring the
//! tip closer the chain is kicked out of the local minimum by twisting it
//! about its root, first around the root's bone axis and then around its
//! lateral axis.

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::rotation::local_axis_rotation;
use crate::geometry::{rotation_between, scale_rotation};
use crate::skeleton::Segment;

use super::chain::{
    enforce_joint, is_reachable, rotate_chain_from, solvable_goal, stretch_toward, tip_distance,
};
use super::constraints::ConstraintChecker;
use super::solver::{ChainSolver, SolverSettings};

/// Smallest decrease of the tip distance that counts as progress.
const MIN_IMPROVEMENT: f64 = 1e-9;

const SWEEP_STEP_DEGREES: f64 = 10.0;
const SWEEP_MAX_DEGREES: f64 = 120.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct CcdSolver {
    pub settings: SolverSettings,
    pub checker: ConstraintChecker,
}

impl CcdSolver {
    pub fn new(settings: SolverSettings, checker: ConstraintChecker) -> Self {
        Self { settings, checker }
    }
}

impl ChainSolver for CcdSolver {
    fn solve_chain(&self, chain: &mut [Segment], target: &Segment, parent: &Segment) -> bool {
        let Some(goal) = solvable_goal(chain, target) else {
            return false;
        };
        if !is_reachable(chain, &goal) {
            stretch_toward(chain, &goal, parent, &self.checker);
            return true;
        }

        let threshold = self.settings.distance_threshold;
        let tip = chain.len() - 1;
        let mut best = tip_distance(chain, &goal);
        if best < threshold {
            return true;
        }

        let mut sweep = TwistSweep::default();
        for iteration in 0..self.settings.max_iterations {
            for j in (0..tip).rev() {
                let pivot = chain[j].position;
                let to_tip = chain[tip].position - pivot;
                let to_goal = goal - pivot;
                let rotation =
                    scale_rotation(&rotation_between(&to_tip, &to_goal), chain[j].stiffness);
                rotate_chain_from(chain, j, &pivot, &rotation);
                enforce_joint(&self.checker, chain, j, parent);

                if tip_distance(chain, &goal) < threshold {
                    debug!(iterations = iteration + 1, "CCD reached target");
                    return true;
                }
            }

            let distance = tip_distance(chain, &goal);
            if distance < best - MIN_IMPROVEMENT {
                best = distance;
                continue;
            }

            match sweep.next() {
                Some((axis, degrees)) => {
                    let root = chain[0];
                    let kick = local_axis_rotation(&root.orientation, &axis, degrees);
                    rotate_chain_from(chain, 0, &root.position, &kick);
                }
                None => {
                    debug!(distance = best, "CCD stalled after exhausting twist sweep");
                    return false;
                }
            }
        }
        debug!(distance = best, "CCD hit iteration limit");
        false
    }

    fn name(&self) -> &'static str {
        "ccd"
    }
}

/// Alternating kicks of growing magnitude: about the root's local +Y, then
/// about its local +X.
#[derive(Debug, Clone, Copy, Default)]
struct TwistSweep {
    emitted: usize,
}

impl Iterator for TwistSweep {
    type Item = (Vector3<f64>, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let per_axis = 2 * (SWEEP_MAX_DEGREES / SWEEP_STEP_DEGREES) as usize;
        let axis = match self.emitted / per_axis {
            0 => Vector3::y(),
            1 => Vector3::x(),
            _ => return None,
        };
        let k = self.emitted % per_axis;
        let magnitude = SWEEP_STEP_DEGREES * (k / 2 + 1) as f64;
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        self.emitted += 1;
        Some((axis, sign * magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::chain::bone_lengths;
    use crate::ik::chain::test_support::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_link_chain_reaches_full_extension() {
        let mut chain = chain_through(&[
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]);
        let solver = CcdSolver::new(SolverSettings::new(5, 0.01), ConstraintChecker::default());
        let target = target_at(Vector3::new(2.0, 0.0, 0.0));

        assert!(solver.solve_chain(&mut chain, &target, &anchor()));
        assert!((chain[2].position - target.position).norm() < 0.01);
        assert_relative_eq!(chain[0].position, Vector3::zeros());
    }

    #[test]
    fn test_unreachable_target_stretches() {
        let mut chain = chain_through(&[
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]);
        let solver = CcdSolver::default();
        let target = target_at(Vector3::new(3.0, 0.0, 0.0));
        assert!(solver.solve_chain(&mut chain, &target, &anchor()));
        assert_relative_eq!(
            chain[2].position,
            Vector3::new(2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_preserves_bone_lengths() {
        let mut chain = chain_through(&[
            Vector3::zeros(),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.3, 0.9, 0.0),
            Vector3::new(0.3, 1.2, 0.2),
        ]);
        let before = bone_lengths(&chain);
        let target = target_at(Vector3::new(0.4, 0.4, 0.3));
        CcdSolver::default().solve_chain(&mut chain, &target, &anchor());
        for (a, b) in before.iter().zip(bone_lengths(&chain)) {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_stiffness_joint_does_not_move() {
        let mut chain = chain_through(&[
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]);
        for seg in chain.iter_mut() {
            seg.stiffness = 0.0;
        }
        let solver = CcdSolver::new(SolverSettings::new(3, 0.01), ConstraintChecker::default());
        // Stalls immediately; only sweep kicks about the root move the chain.
        let target = target_at(Vector3::new(2.0, 0.0, 0.0));
        assert!(!solver.solve_chain(&mut chain, &target, &anchor()));
        assert_relative_eq!(
            (chain[2].position - chain[1].position).norm(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_twist_sweep_escapes_stall() {
        let mut chain = chain_through(&[
            Vector3::zeros(),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]);
        for seg in chain.iter_mut() {
            seg.stiffness = 0.0;
        }
        // Frozen joints stall every iteration. Only kicks about the root's
        // bone axis move the tip, and the 90 degree kick lands on the goal.
        let goal = Vector3::new(0.0, 1.0, -1.0);
        let solver = CcdSolver::default();
        assert!(solver.solve_chain(&mut chain, &target_at(goal), &anchor()));
        assert!((chain[2].position - goal).norm() < 0.01);
        assert_relative_eq!(chain[1].position, Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_missing_target_is_not_solved() {
        let mut chain = chain_through(&[Vector3::zeros(), Vector3::x()]);
        let before = chain.clone();
        let target = target_at(crate::geometry::nan_vector());
        let solver = CcdSolver::default();
        assert!(!solver.solve_chain(&mut chain, &target, &anchor()));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_sweep_sequence() {
        let kicks: Vec<(Vector3<f64>, f64)> = TwistSweep::default().collect();
        assert_eq!(kicks.len(), 48);
        assert_eq!(kicks[0], (Vector3::y(), 10.0));
        assert_eq!(kicks[1], (Vector3::y(), -10.0));
        assert_eq!(kicks[2], (Vector3::y(), 20.0));
        assert_eq!(kicks[23], (Vector3::y(), -120.0));
        assert_eq!(kicks[24], (Vector3::x(), 10.0));
    }
}
