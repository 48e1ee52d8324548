//! Chain helpers shared by the solvers: bone lengths, reachability,
//! forward kinematics and the stretch fallback.

use nalgebra::Vector3;

use crate::geometry::rotation::DIRECTION_EPSILON;
use crate::geometry::{is_finite_vector, rotation_between};
use crate::skeleton::Segment;

use super::constraints::ConstraintChecker;

/// Distances between consecutive chain positions.
pub fn bone_lengths(chain: &[Segment]) -> Vec<f64> {
    chain
        .windows(2)
        .map(|pair| (pair[1].position - pair[0].position).norm())
        .collect()
}

pub fn total_length(chain: &[Segment]) -> f64 {
    bone_lengths(chain).iter().sum()
}

/// Whether `goal` lies within the chain's reach from its root.
pub fn is_reachable(chain: &[Segment], goal: &Vector3<f64>) -> bool {
    match chain.first() {
        Some(root) => (goal - root.position).norm() <= total_length(chain),
        None => false,
    }
}

/// Tip-to-goal distance.
pub fn tip_distance(chain: &[Segment], goal: &Vector3<f64>) -> f64 {
    chain
        .last()
        .map_or(f64::NAN, |tip| (tip.position - goal).norm())
}

/// Goal position for a solve, or `None` when the inputs cannot be solved:
/// fewer than two segments, missing chain geometry, or a missing target.
pub fn solvable_goal(chain: &[Segment], target: &Segment) -> Option<Vector3<f64>> {
    if chain.len() < 2 || !is_finite_vector(&target.position) {
        return None;
    }
    if chain.iter().any(|s| !s.has_data()) {
        return None;
    }
    Some(target.position)
}

/// The segment above `chain[i]`: `parent` for the chain root.
#[inline]
pub fn parent_at(chain: &[Segment], parent: &Segment, i: usize) -> Segment {
    if i == 0 {
        *parent
    } else {
        chain[i - 1]
    }
}

/// Rotates `chain[from..]` about `pivot`.
pub fn rotate_chain_from(
    chain: &mut [Segment],
    from: usize,
    pivot: &Vector3<f64>,
    rotation: &nalgebra::UnitQuaternion<f64>,
) {
    for seg in &mut chain[from..] {
        seg.rotate_about(pivot, rotation);
    }
}

/// Applies cone then twist limits at joint `i`, rotating the rest of the
/// chain with it. Returns whether anything was corrected.
pub fn enforce_joint(
    checker: &ConstraintChecker,
    chain: &mut [Segment],
    i: usize,
    parent: &Segment,
) -> bool {
    let above = parent_at(chain, parent, i);
    let pivot = chain[i].position;
    let mut corrected = false;

    if i + 1 < chain.len() {
        if let Some(fix) = checker.check_segment_cone(&chain[i], &above, &chain[i + 1].position) {
            rotate_chain_from(chain, i, &pivot, &fix.rotation);
            corrected = true;
        }
    }
    if let Some(fix) = checker.check_twist(&chain[i], &above) {
        rotate_chain_from(chain, i, &pivot, &fix.rotation);
        corrected = true;
    }
    corrected
}

/// Lays the chain out on the straight line from its root towards `goal`,
/// keeping bone lengths, then pulls twists back within limits.
pub fn stretch_toward(
    chain: &mut [Segment],
    goal: &Vector3<f64>,
    parent: &Segment,
    checker: &ConstraintChecker,
) {
    let Some(root) = chain.first().map(|s| s.position) else {
        return;
    };
    let Some(direction) = (goal - root).try_normalize(DIRECTION_EPSILON) else {
        return;
    };
    let lengths = bone_lengths(chain);
    let old_directions: Vec<Vector3<f64>> = chain
        .windows(2)
        .map(|pair| pair[1].position - pair[0].position)
        .collect();

    let n = chain.len();
    for i in 0..n - 1 {
        let rotation = rotation_between(&old_directions[i], &direction);
        chain[i].orientation = rotation * chain[i].orientation;
        chain[i + 1].position = chain[i].position + direction * lengths[i];
        if i + 1 == n - 1 {
            chain[n - 1].orientation = rotation * chain[n - 1].orientation;
        }
    }

    for i in 0..n {
        let above = parent_at(chain, parent, i);
        if let Some(fix) = checker.check_twist(&chain[i], &above) {
            chain[i].orientation = fix.rotation * chain[i].orientation;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use nalgebra::{UnitQuaternion, Vector3};

    use crate::geometry::bone_rotation;
    use crate::skeleton::{Segment, SegmentName};

    /// Unconstrained chain through `points`, frames aimed along each bone.
    pub fn chain_through(points: &[Vector3<f64>]) -> Vec<Segment> {
        const NAMES: [SegmentName; 6] = [
            SegmentName::LeftShoulder,
            SegmentName::LeftElbow,
            SegmentName::LeftWrist,
            SegmentName::LeftHand,
            SegmentName::LeftIndex,
            SegmentName::LeftThumb,
        ];
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let next = points
                    .get(i + 1)
                    .copied()
                    .unwrap_or_else(|| *p + (*p - points[i - 1]));
                Segment::new(NAMES[i], *p, bone_rotation(&(next - p), &Vector3::z()))
            })
            .collect()
    }

    pub fn anchor() -> Segment {
        Segment::new(
            SegmentName::LeftClavicle,
            Vector3::zeros(),
            UnitQuaternion::identity(),
        )
    }

    pub fn target_at(position: Vector3<f64>) -> Segment {
        Segment::new(SegmentName::LeftIndex, position, UnitQuaternion::identity())
    }
}
