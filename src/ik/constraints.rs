//! Cone (swing) and twist limit checks shared by both chain solvers.
//!
//! A segment's limits are measured in its *reference frame*: the parent's
//! orientation composed with the segment's fixed parent offset, i.e. where
//! the segment would point had it not moved relative to its parent since the
//! T-pose. The reference +Y axis is the rest bone direction.
//!
//! # Cone
//!
//! The bone direction is projected onto the reference +Y axis and its
//! lateral offset (local X/Z) picks one of four quadrants, each with its own
//! pair of half-angles. At unit height along +Y the allowed region is the
//! ellipse with radii `tan(x_limit)` and `tan(z_limit)`:
//!
//! ```text
//!   (x / tan(ax))^2 + (z / tan(az))^2 <= 1
//! ```
//!
//! Three cases need special handling:
//! - both half-angles above 90°: the allowed region is reflex. The forbidden
//!   complement is a regular cone around -Y with half-angles `180 - limit`,
//!   so the test is inverted against that cone.
//! - exactly one half-angle above 90°: the cone axis is tilted towards the
//!   wide side until both half-angles fit below 90°.
//! - direction behind the joint (non-positive height): always outside, the
//!   lateral direction is projected radially onto the boundary.
//!
//! Corrections return the nearest boundary point (via
//! [`closest_point_on_ellipse`]) and the world rotation that reaches it.

use nalgebra::{Unit, UnitQuaternion, Vector2, Vector3};

use crate::geometry::ellipse::ellipse_implicit;
use crate::geometry::rotation::{local_axis_rotation, wrap_degrees, DIRECTION_EPSILON};
use crate::geometry::{
    closest_point_on_ellipse, is_finite_rotation, is_finite_vector, rotation_between, twist_angle,
};
use crate::skeleton::{ConeLimits, Segment, TwistLimits};

/// Half-angles are clamped to this range before taking tangents.
const MIN_HALF_ANGLE: f64 = 0.01;
const MAX_REGULAR_HALF_ANGLE: f64 = 89.9;

/// Wide half-angle of a side cone after its axis has been tilted.
const SIDE_CONE_HALF_ANGLE: f64 = 89.0;

/// Heights below this count as "behind the joint".
const MIN_CONE_HEIGHT: f64 = 1e-6;

/// Result of a failed cone check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeCorrection {
    /// Nearest allowed bone direction (unit, world frame).
    pub direction: Vector3<f64>,
    /// World rotation taking the proposed direction onto `direction`.
    pub rotation: UnitQuaternion<f64>,
}

/// Result of a failed twist check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwistCorrection {
    /// Current twist relative to the reference frame, degrees.
    pub angle: f64,
    /// The limit the twist is pulled back to, degrees.
    pub limit: f64,
    /// World rotation about the segment's own +Y axis.
    pub rotation: UnitQuaternion<f64>,
}

/// Evaluates joint limits. Injected into both solvers and the applier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintChecker {
    /// Slack on the ellipse implicit value before a direction is rejected.
    pub cone_tolerance: f64,
    /// Slack in degrees before a twist is rejected.
    pub twist_tolerance: f64,
}

impl Default for ConstraintChecker {
    fn default() -> Self {
        Self {
            cone_tolerance: 1e-6,
            twist_tolerance: 1e-6,
        }
    }
}

impl ConstraintChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a proposed bone `direction` against `limits` measured in
    /// `reference`. Returns `None` when the direction is allowed or there is
    /// not enough data to decide.
    pub fn check_cone(
        &self,
        reference: &UnitQuaternion<f64>,
        direction: &Vector3<f64>,
        limits: &ConeLimits,
    ) -> Option<ConeCorrection> {
        if limits.is_unconstrained()
            || !is_finite_vector(direction)
            || !is_finite_rotation(reference)
        {
            return None;
        }
        let world = direction.try_normalize(DIRECTION_EPSILON)?;
        let local = reference.inverse() * world;
        let (x_limit, z_limit) = limits.quadrant(local.x, local.z);

        let corrected_local = if x_limit > 90.0 && z_limit > 90.0 {
            self.reflex_cone(&local, 180.0 - x_limit, 180.0 - z_limit)
        } else if x_limit > 90.0 || z_limit > 90.0 {
            self.side_cone(&local, x_limit, z_limit)
        } else {
            self.regular_cone(&local, x_limit, z_limit)
        }?;

        let corrected = reference * corrected_local;
        Some(ConeCorrection {
            direction: corrected,
            rotation: rotation_between(&world, &corrected),
        })
    }

    /// Cone check for `segment`'s bone towards `child_position`.
    pub fn check_segment_cone(
        &self,
        segment: &Segment,
        parent: &Segment,
        child_position: &Vector3<f64>,
    ) -> Option<ConeCorrection> {
        self.check_cone(
            &segment.reference_frame(parent),
            &(child_position - segment.position),
            &segment.constraint.cone,
        )
    }

    /// Checks the twist of `segment` about its own +Y axis relative to its
    /// reference frame.
    pub fn check_twist(&self, segment: &Segment, parent: &Segment) -> Option<TwistCorrection> {
        let limits = segment.constraint.twist;
        if limits.is_unconstrained()
            || !is_finite_rotation(&segment.orientation)
            || !is_finite_rotation(&parent.orientation)
        {
            return None;
        }
        let relative = segment.reference_frame(parent).inverse() * segment.orientation;
        let angle = twist_angle(&relative, &Vector3::y_axis());
        if limits.contains(angle) {
            return None;
        }
        let limit = nearest_twist_limit(angle, &limits);
        let delta = wrap_degrees(limit - angle);
        if delta.abs() <= self.twist_tolerance {
            return None;
        }
        Some(TwistCorrection {
            angle,
            limit,
            rotation: local_axis_rotation(&segment.orientation, &Vector3::y(), delta),
        })
    }

    fn regular_cone(
        &self,
        local: &Vector3<f64>,
        x_limit: f64,
        z_limit: f64,
    ) -> Option<Vector3<f64>> {
        let rx = half_angle_radius(x_limit);
        let rz = half_angle_radius(z_limit);

        if local.y > MIN_CONE_HEIGHT {
            let px = local.x / local.y;
            let pz = local.z / local.y;
            if ellipse_implicit(rx, rz, px, pz) <= self.cone_tolerance {
                return None;
            }
            let (cx, cz) = closest_point_on_ellipse(rx, rz, px, pz);
            return Some(Vector3::new(cx, 1.0, cz).normalize());
        }

        // Behind the joint: project the lateral direction onto the boundary.
        let lateral = Vector2::new(local.x, local.z);
        let u = lateral.try_normalize(DIRECTION_EPSILON).unwrap_or_else(|| {
            if rx >= rz {
                Vector2::x()
            } else {
                Vector2::y()
            }
        });
        let r = 1.0 / ((u.x / rx).powi(2) + (u.y / rz).powi(2)).sqrt();
        Some(Vector3::new(u.x * r, 1.0, u.y * r).normalize())
    }

    /// `x_forbidden`/`z_forbidden` are the complementary half-angles of the
    /// forbidden cone around -Y.
    fn reflex_cone(
        &self,
        local: &Vector3<f64>,
        x_forbidden: f64,
        z_forbidden: f64,
    ) -> Option<Vector3<f64>> {
        let height = -local.y;
        if height <= MIN_CONE_HEIGHT {
            return None;
        }
        let rx = half_angle_radius(x_forbidden);
        let rz = half_angle_radius(z_forbidden);
        let px = local.x / height;
        let pz = local.z / height;
        if ellipse_implicit(rx, rz, px, pz) >= -self.cone_tolerance {
            return None;
        }
        let (bx, bz) = closest_point_on_ellipse(rx, rz, px, pz);
        Some(Vector3::new(bx, -1.0, bz).normalize())
    }

    fn side_cone(&self, local: &Vector3<f64>, x_limit: f64, z_limit: f64) -> Option<Vector3<f64>> {
        let wide_is_x = x_limit > 90.0;
        let (wide, narrow) = if wide_is_x {
            (x_limit, z_limit)
        } else {
            (z_limit, x_limit)
        };
        let wide_direction = if wide_is_x {
            Vector3::x() * sign_or_positive(local.x)
        } else {
            Vector3::z() * sign_or_positive(local.z)
        };

        // Re-derive the cone axis: +Y tilted towards the wide side.
        let tilt_axis = Unit::new_normalize(Vector3::y().cross(&wide_direction));
        let tilt =
            UnitQuaternion::from_axis_angle(&tilt_axis, (wide - SIDE_CONE_HALF_ANGLE).to_radians());
        let tilted = tilt.inverse() * local;

        let (x_tilted, z_tilted) = if wide_is_x {
            (SIDE_CONE_HALF_ANGLE, narrow)
        } else {
            (narrow, SIDE_CONE_HALF_ANGLE)
        };
        self.regular_cone(&tilted, x_tilted, z_tilted)
            .map(|corrected| tilt * corrected)
    }
}

fn half_angle_radius(degrees: f64) -> f64 {
    degrees
        .clamp(MIN_HALF_ANGLE, MAX_REGULAR_HALF_ANGLE)
        .to_radians()
        .tan()
}

#[inline]
fn sign_or_positive(v: f64) -> f64 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

fn nearest_twist_limit(angle: f64, limits: &TwistLimits) -> f64 {
    let to_start = wrap_degrees(angle - limits.start).abs();
    let to_end = wrap_degrees(angle - limits.end).abs();
    if to_start <= to_end {
        limits.start
    } else {
        limits.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::skeleton::{JointConstraint, SegmentName};

    fn direction_at(degrees_from_y: f64, towards: Vector3<f64>) -> Vector3<f64> {
        let axis = Unit::new_normalize(Vector3::y().cross(&towards));
        UnitQuaternion::from_axis_angle(&axis, degrees_from_y.to_radians()) * Vector3::y()
    }

    fn angle_from_y(v: &Vector3<f64>) -> f64 {
        v.angle(&Vector3::y()).to_degrees()
    }

    #[test]
    fn test_direction_inside_cone_passes() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::uniform(40.0);
        let dir = direction_at(30.0, Vector3::x());
        assert!(checker
            .check_cone(&UnitQuaternion::identity(), &dir, &limits)
            .is_none());
    }

    #[test]
    fn test_direction_outside_cone_is_pulled_to_boundary() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::uniform(40.0);
        let dir = direction_at(70.0, Vector3::z());
        let fix = checker
            .check_cone(&UnitQuaternion::identity(), &dir, &limits)
            .expect("outside the cone");
        assert_relative_eq!(angle_from_y(&fix.direction), 40.0, epsilon = 1e-6);
        assert_relative_eq!(fix.rotation * dir, fix.direction, epsilon = 1e-9);
    }

    #[test]
    fn test_asymmetric_quadrants() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::new(60.0, 20.0, 10.0, 20.0);
        let right = direction_at(50.0, Vector3::x());
        let left = direction_at(50.0, -Vector3::x());
        let reference = UnitQuaternion::identity();
        assert!(checker.check_cone(&reference, &right, &limits).is_none());
        let fix = checker.check_cone(&reference, &left, &limits).unwrap();
        assert_relative_eq!(angle_from_y(&fix.direction), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_behind_joint_is_rejected() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::uniform(45.0);
        let dir = direction_at(135.0, Vector3::z());
        let fix = checker
            .check_cone(&UnitQuaternion::identity(), &dir, &limits)
            .unwrap();
        assert_relative_eq!(angle_from_y(&fix.direction), 45.0, epsilon = 1e-6);
        assert!(fix.direction.z > 0.0);
    }

    #[test]
    fn test_reflex_cone_allows_wide_swing() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::uniform(150.0);
        let reference = UnitQuaternion::identity();
        // 120° from the axis is inside a 150° cone.
        assert!(checker
            .check_cone(&reference, &direction_at(120.0, Vector3::x()), &limits)
            .is_none());
        // 170° is in the forbidden 30° cone around -Y.
        let fix = checker
            .check_cone(&reference, &direction_at(170.0, Vector3::x()), &limits)
            .unwrap();
        assert_relative_eq!(angle_from_y(&fix.direction), 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_side_cone_limits_wide_side() {
        let checker = ConstraintChecker::default();
        let limits = ConeLimits::new(10.0, 145.0, 10.0, 5.0);
        let reference = UnitQuaternion::identity();
        assert!(checker
            .check_cone(&reference, &direction_at(120.0, Vector3::z()), &limits)
            .is_none());
        let fix = checker
            .check_cone(&reference, &direction_at(170.0, Vector3::z()), &limits)
            .unwrap();
        assert_relative_eq!(angle_from_y(&fix.direction), 145.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cone_correction_is_idempotent() {
        let checker = ConstraintChecker::default();
        let reference = UnitQuaternion::from_euler_angles(0.2, -0.4, 0.1);
        let cases = [
            (
                ConeLimits::new(35.0, 20.0, 50.0, 15.0),
                direction_at(80.0, Vector3::new(1.0, 0.0, 1.0)),
            ),
            (ConeLimits::uniform(150.0), direction_at(175.0, Vector3::new(-1.0, 0.0, 0.3))),
            (ConeLimits::new(10.0, 145.0, 10.0, 5.0), direction_at(170.0, Vector3::z())),
            (ConeLimits::uniform(30.0), direction_at(160.0, Vector3::new(0.3, 0.0, -1.0))),
        ];
        for (limits, local_dir) in cases {
            let dir = reference * local_dir;
            let fix = checker.check_cone(&reference, &dir, &limits).unwrap();
            assert!(
                checker.check_cone(&reference, &fix.direction, &limits).is_none(),
                "second check should pass for {:?}",
                limits
            );
        }
    }

    #[test]
    fn test_unconstrained_and_nan_inputs_pass() {
        let checker = ConstraintChecker::default();
        let reference = UnitQuaternion::identity();
        assert!(checker
            .check_cone(&reference, &-Vector3::y(), &ConeLimits::unconstrained())
            .is_none());
        let missing = crate::geometry::nan_vector();
        assert!(checker
            .check_cone(&reference, &missing, &ConeLimits::uniform(10.0))
            .is_none());
    }

    fn twisted_pair(twist_degrees: f64, limits: TwistLimits) -> (Segment, Segment) {
        let parent = Segment::new(
            SegmentName::LeftElbow,
            Vector3::zeros(),
            UnitQuaternion::identity(),
        );
        let mut child = Segment::new(
            SegmentName::LeftWrist,
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), twist_degrees.to_radians()),
        );
        child.constraint = JointConstraint::new(ConeLimits::unconstrained(), limits);
        (parent, child)
    }

    #[test]
    fn test_twist_within_range_passes() {
        let checker = ConstraintChecker::default();
        let (parent, child) = twisted_pair(20.0, TwistLimits::new(-30.0, 30.0));
        assert!(checker.check_twist(&child, &parent).is_none());
    }

    #[test]
    fn test_twist_outside_range_snaps_to_nearer_limit() {
        let checker = ConstraintChecker::default();
        let (parent, mut child) = twisted_pair(50.0, TwistLimits::new(-30.0, 30.0));
        let fix = checker.check_twist(&child, &parent).unwrap();
        assert_relative_eq!(fix.angle, 50.0, epsilon = 1e-9);
        assert_relative_eq!(fix.limit, 30.0);

        child.orientation = fix.rotation * child.orientation;
        assert!(checker.check_twist(&child, &parent).is_none());
    }

    #[test]
    fn test_wrapped_twist_range() {
        let checker = ConstraintChecker::default();
        let limits = TwistLimits::new(150.0, -150.0);
        let (parent, inside) = twisted_pair(175.0, limits);
        assert!(checker.check_twist(&inside, &parent).is_none());

        let (parent, mut outside) = twisted_pair(-100.0, limits);
        let fix = checker.check_twist(&outside, &parent).unwrap();
        assert_relative_eq!(fix.limit, -150.0);
        outside.orientation = fix.rotation * outside.orientation;
        assert!(checker.check_twist(&outside, &parent).is_none());
    }

    #[test]
    fn test_twist_uses_parent_offset() {
        let checker = ConstraintChecker::default();
        let (mut parent, mut child) = twisted_pair(0.0, TwistLimits::new(-10.0, 10.0));
        // Parent rotated, child following rigidly: no relative twist.
        parent.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.2);
        child.orientation = parent.orientation;
        assert!(checker.check_twist(&child, &parent).is_none());
    }
}
