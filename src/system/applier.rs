//! IkApplier - fills segments that localization left without data.
//!
//! The current tree is walked depth-first. Each missing segment starts a
//! run down through its missing descendants, seeded from the previous frame
//! (shifted by how far the run's anchor moved) or from the template when the
//! previous frame has nothing. A run that ends on a segment with data is
//! solved as an IK chain towards it, CCD first and FABRIK on failure. A run
//! that ends in a leaf is carried rigidly with its grandparent. Joint limits
//! are swept over every repaired run and solved limb runs are smoothed
//! against the previous frame.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::config::Config;
use crate::geometry::{bone_rotation, is_finite_rotation, is_finite_vector};
use crate::ik::chain::enforce_joint;
use crate::ik::{CcdSolver, ChainSolver, ConstraintChecker, FabrikSolver};
use crate::skeleton::{Segment, SegmentName, SkeletonTree};

use super::smoothing::JerkTest;

/// What one repair pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    /// Segments that were missing and now have data.
    pub repaired: Vec<SegmentName>,
    pub chains_solved: usize,
    pub chains_failed: usize,
    /// Runs without a target, carried by their grandparent.
    pub rigid_fallbacks: usize,
    pub smoothed: usize,
}

/// How a run of missing segments ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunEnd {
    /// The first segment below the run that has data.
    Target(SegmentName),
    Leaf,
}

pub struct IkApplier {
    ccd: CcdSolver,
    fabrik: FabrikSolver,
    checker: ConstraintChecker,
    smoothing: Option<JerkTest>,
    template: SkeletonTree,
}

impl IkApplier {
    pub fn new(config: &Config) -> Self {
        let checker = ConstraintChecker::default();
        let smoothing = config
            .pipeline
            .smoothing_enabled
            .then(|| JerkTest::new(&config.smoothing));
        Self {
            ccd: CcdSolver::new(config.solver.primary(), checker),
            fabrik: FabrikSolver::new(config.solver.fallback(), checker),
            checker,
            smoothing,
            template: SkeletonTree::from_template(),
        }
    }

    /// Repairs every missing segment of `current` that can be anchored.
    /// `previous` is the last completed frame.
    pub fn repair(&self, current: &mut SkeletonTree, previous: &SkeletonTree) -> RepairReport {
        let mut report = RepairReport::default();
        for name in SegmentName::ALL {
            if current[name].exists {
                continue;
            }
            let Some(anchor) = name.parent() else {
                continue;
            };
            if anchor == SegmentName::ROOT || !current[anchor].has_data() {
                continue;
            }
            if name.uses_direct_repair() {
                if self.direct_repair(current, name) {
                    report.repaired.push(name);
                }
                continue;
            }
            self.repair_run(current, previous, anchor, name, &mut report);
        }
        report
    }

    /// Clavicles and shoulders sit on their parent and aim at their child.
    fn direct_repair(&self, current: &mut SkeletonTree, name: SegmentName) -> bool {
        let Some(parent) = current.parent_of(name).copied() else {
            return false;
        };
        let position = parent.position;
        let aimed = name
            .first_child()
            .map(|child| current[child])
            .filter(|child| child.has_data())
            .map(|child| bone_rotation(&(child.position - position), &parent.forward_axis()));
        let orientation = match aimed {
            Some(q) if is_finite_rotation(&q) => q,
            _ => current[name].reference_frame(&parent),
        };

        current.set_pose(name, position, orientation);
        let seg = &mut current[name];
        seg.exists = seg.has_data();
        seg.exists
    }

    fn repair_run(
        &self,
        current: &mut SkeletonTree,
        previous: &SkeletonTree,
        anchor: SegmentName,
        start: SegmentName,
        report: &mut RepairReport,
    ) {
        let (run, end) = collect_run(current, start);
        let mut names = Vec::with_capacity(run.len() + 2);
        names.push(anchor);
        names.extend_from_slice(&run);
        if let RunEnd::Target(target) = end {
            names.push(target);
        }

        let mut chain = self.seed_chain(current, previous, &names);
        let grandparent = current.parent_of(anchor).copied().unwrap_or(chain[0]);

        let (solved, writable) = match end {
            RunEnd::Target(target) => {
                let goal = current[target];
                let solved = self.solve(&mut chain, &goal, &grandparent);
                if solved {
                    report.chains_solved += 1;
                } else {
                    report.chains_failed += 1;
                }
                (solved, chain.len() - 1)
            }
            RunEnd::Leaf => {
                carry_with(&mut chain, current, previous, anchor);
                report.rigid_fallbacks += 1;
                (false, chain.len())
            }
        };

        for i in 1..writable {
            enforce_joint(&self.checker, &mut chain, i, &grandparent);
        }

        if let Some(jerk) = self.smoothing {
            if solved && start.is_limb() {
                report.smoothed += jerk.apply(&mut chain[..writable], previous);
            }
        }

        let anchor_orientation = chain[0].orientation;
        if is_finite_rotation(&anchor_orientation) {
            current[anchor].orientation = anchor_orientation;
        }
        for seg in &chain[1..writable] {
            current.set_pose(seg.name, seg.position, seg.orientation);
            let slot = &mut current[seg.name];
            slot.exists = slot.has_data();
            if slot.exists {
                report.repaired.push(seg.name);
            }
        }
    }

    /// CCD on the seeded chain, FABRIK from the same seed if CCD misses.
    fn solve(&self, chain: &mut [Segment], goal: &Segment, parent: &Segment) -> bool {
        let seed = chain.to_vec();
        if self.ccd.solve_chain(chain, goal, parent) {
            debug!(tip = %goal.name, solver = self.ccd.name(), "Chain solved");
            return true;
        }
        chain.copy_from_slice(&seed);
        let reached = self.fabrik.solve_chain(chain, goal, parent);
        debug!(tip = %goal.name, solver = self.fabrik.name(), reached, "Chain retried");
        reached
    }

    /// Chain `names[0]..` with current data for the anchor and estimated
    /// geometry for everything below it.
    fn seed_chain(
        &self,
        current: &SkeletonTree,
        previous: &SkeletonTree,
        names: &[SegmentName],
    ) -> Vec<Segment> {
        let anchor = names[0];
        let shift = current[anchor].position - previous[anchor].position;

        let mut chain: Vec<Segment> = Vec::with_capacity(names.len());
        chain.push(current[anchor]);
        for &name in &names[1..] {
            let mut seg = current[name];
            let before = &previous[name];
            let (position, orientation) = if before.has_data() && is_finite_vector(&shift) {
                (before.position + shift, before.orientation)
            } else {
                let above = chain[chain.len() - 1];
                self.template_pose(name, &above)
            };
            seg.position = position;
            seg.orientation = orientation;
            chain.push(seg);
        }
        chain
    }

    /// Rest-pose offset of `name` from `above`, turned by how far `above`
    /// has rotated away from its rest orientation.
    fn template_pose(
        &self,
        name: SegmentName,
        above: &Segment,
    ) -> (Vector3<f64>, UnitQuaternion<f64>) {
        let rest_above = &self.template[above.name];
        let rest = &self.template[name];
        let turn = above.orientation * rest_above.orientation.inverse();
        (
            above.position + turn * (rest.position - rest_above.position),
            turn * rest.orientation,
        )
    }
}

impl Default for IkApplier {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Missing segments from `start` down, preferring a child with data as the
/// end of the run and otherwise following the first child.
fn collect_run(tree: &SkeletonTree, start: SegmentName) -> (Vec<SegmentName>, RunEnd) {
    let mut run = vec![start];
    let mut at = start;
    loop {
        let children = at.children();
        if let Some(&found) = children.iter().find(|c| tree[**c].exists) {
            return (run, RunEnd::Target(found));
        }
        match children.first() {
            Some(&next) => {
                run.push(next);
                at = next;
            }
            None => return (run, RunEnd::Leaf),
        }
    }
}

/// Rotates `chain[1..]` about the anchor by the grandparent's change in
/// orientation since the previous frame.
fn carry_with(
    chain: &mut [Segment],
    current: &SkeletonTree,
    previous: &SkeletonTree,
    anchor: SegmentName,
) {
    let Some(grandparent) = anchor.parent() else {
        return;
    };
    let delta = current[grandparent].orientation * previous[grandparent].orientation.inverse();
    if !is_finite_rotation(&delta) {
        return;
    }
    let pivot = chain[0].position;
    for seg in &mut chain[1..] {
        seg.rotate_about(&pivot, &delta);
    }
}
