//! Reference T-pose and joint limits of the anatomical template.
//!
//! Positions are meters in the world frame with the pelvis 1 m above the
//! floor, facing +Z. Right-side values mirror the left side in X.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::bone_rotation;

use super::constraint::{ConeLimits, JointConstraint, TwistLimits};
use super::segment::{Segment, SegmentName, Side};

/// T-pose joint position of a segment.
pub fn rest_position(name: SegmentName) -> Vector3<f64> {
    use SegmentName::*;
    let (x, y, z) = match name {
        Pelvis => (0.0, 1.00, 0.0),
        SpineLower => (0.0, 1.10, -0.02),
        SpineMiddle => (0.0, 1.25, -0.03),
        SpineUpper => (0.0, 1.40, -0.03),
        Neck => (0.0, 1.55, -0.02),
        Head => (0.0, 1.68, 0.0),
        LeftClavicle | RightClavicle => (0.03, 1.50, 0.0),
        LeftShoulder | RightShoulder => (0.18, 1.47, -0.02),
        LeftElbow | RightElbow => (0.46, 1.47, -0.02),
        LeftWrist | RightWrist => (0.72, 1.47, -0.02),
        LeftHand | RightHand => (0.80, 1.47, -0.02),
        LeftIndex | RightIndex => (0.90, 1.47, -0.01),
        LeftThumb | RightThumb => (0.84, 1.47, 0.03),
        LeftHip | RightHip => (0.09, 0.95, 0.0),
        LeftKnee | RightKnee => (0.09, 0.52, 0.01),
        LeftAnkle | RightAnkle => (0.09, 0.09, -0.02),
        LeftFootBase | RightFootBase => (0.09, 0.02, 0.12),
        LeftToe | RightToe => (0.09, 0.02, 0.18),
    };
    let sign = name.side().map_or(1.0, Side::sign);
    Vector3::new(x * sign, y, z)
}

/// Roll hint for a segment's bone frame. Feet point forward, so their
/// frame uses +Y as the secondary axis.
pub fn forward_hint(name: SegmentName) -> Vector3<f64> {
    use SegmentName::*;
    match name {
        LeftFootBase | RightFootBase | LeftToe | RightToe => Vector3::y(),
        _ => Vector3::z(),
    }
}

/// Range-of-motion limits and solver stiffness of a segment.
pub fn rest_constraint(name: SegmentName) -> (JointConstraint, f64) {
    use SegmentName::*;
    let (cone, twist, stiffness) = match name {
        Pelvis => (ConeLimits::unconstrained(), TwistLimits::unconstrained(), 1.0),
        SpineLower | SpineMiddle | SpineUpper => {
            (ConeLimits::uniform(30.0), TwistLimits::new(-30.0, 30.0), 0.5)
        }
        Neck => (ConeLimits::uniform(45.0), TwistLimits::new(-60.0, 60.0), 0.7),
        Head => (ConeLimits::uniform(60.0), TwistLimits::new(-80.0, 80.0), 0.7),
        LeftClavicle | RightClavicle => {
            (ConeLimits::uniform(20.0), TwistLimits::unconstrained(), 0.3)
        }
        LeftShoulder | RightShoulder => (
            ConeLimits::new(100.0, 120.0, 100.0, 60.0),
            TwistLimits::new(-90.0, 90.0),
            1.0,
        ),
        LeftElbow | RightElbow => (
            ConeLimits::new(10.0, 145.0, 10.0, 5.0),
            TwistLimits::new(-85.0, 85.0),
            1.0,
        ),
        LeftWrist | RightWrist => (
            ConeLimits::new(30.0, 80.0, 30.0, 70.0),
            TwistLimits::unconstrained(),
            1.0,
        ),
        LeftHand | RightHand => (ConeLimits::uniform(20.0), TwistLimits::unconstrained(), 1.0),
        LeftIndex | RightIndex => (ConeLimits::uniform(90.0), TwistLimits::unconstrained(), 1.0),
        LeftThumb | RightThumb => (ConeLimits::uniform(60.0), TwistLimits::unconstrained(), 1.0),
        LeftHip | RightHip => (
            ConeLimits::new(45.0, 120.0, 30.0, 20.0),
            TwistLimits::new(-45.0, 45.0),
            1.0,
        ),
        LeftKnee | RightKnee => (
            ConeLimits::new(5.0, 5.0, 5.0, 140.0),
            TwistLimits::new(-30.0, 30.0),
            1.0,
        ),
        LeftAnkle | RightAnkle => (
            ConeLimits::new(30.0, 45.0, 30.0, 45.0),
            TwistLimits::new(-20.0, 20.0),
            1.0,
        ),
        LeftFootBase | RightFootBase => {
            (ConeLimits::uniform(20.0), TwistLimits::unconstrained(), 1.0)
        }
        LeftToe | RightToe => (ConeLimits::uniform(40.0), TwistLimits::unconstrained(), 1.0),
    };
    // Lateral limits are authored for the left side.
    let cone = match name.side() {
        Some(Side::Right) => cone.mirrored(),
        _ => cone,
    };
    (JointConstraint::new(cone, twist), stiffness)
}

/// Bone frame of `name` computed from the given joint positions.
///
/// Non-leaf segments aim +Y at their first child; leaves continue the
/// direction from their parent. The pelvis stays upright.
pub fn bone_frame(name: SegmentName, positions: &[Vector3<f64>]) -> UnitQuaternion<f64> {
    if name == SegmentName::ROOT {
        return UnitQuaternion::identity();
    }
    let here = positions[name.index()];
    let direction = match name.first_child() {
        Some(child) => positions[child.index()] - here,
        None => name
            .parent()
            .map_or_else(Vector3::y, |parent| here - positions[parent.index()]),
    };
    bone_rotation(&direction, &forward_hint(name))
}

/// All segments in their T-pose, with constraints and parent offsets filled in.
pub fn template_segments() -> Vec<Segment> {
    let positions: Vec<Vector3<f64>> = SegmentName::ALL.iter().map(|n| rest_position(*n)).collect();
    let orientations: Vec<UnitQuaternion<f64>> = SegmentName::ALL
        .iter()
        .map(|n| bone_frame(*n, &positions))
        .collect();

    SegmentName::ALL
        .iter()
        .map(|&name| {
            let orientation = orientations[name.index()];
            let (constraint, stiffness) = rest_constraint(name);
            let parent_offset = match name.parent() {
                Some(parent) => orientations[parent.index()].inverse() * orientation,
                None => UnitQuaternion::identity(),
            };
            Segment {
                constraint,
                stiffness,
                parent_offset,
                ..Segment::new(name, positions[name.index()], orientation)
            }
        })
        .collect()
}
