//! Rotation and frame utilities for segment orientations.
//!
//! Conventions used across the crate:
//!
//! ```text
//!        +Y (up / along the bone)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (forward)
//! ```
//!
//! The world frame is right-handed with +Y up and +Z forward, so +X = Y × Z
//! points to the subject's right. Segment frames put +Y along the bone
//! (towards the first child) and +Z along the anatomical forward direction.
//!
//! NaN is the "no data" value: every helper that receives a non-finite input
//! returns a NaN result rather than panicking.

use nalgebra::{Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};

/// Below this norm a vector carries no usable direction.
pub const DIRECTION_EPSILON: f64 = 1e-9;

/// Hints closer than this (after orthogonalization) to the primary axis are
/// replaced by a world axis.
const HINT_EPSILON: f64 = 1e-6;

/// A vector meaning "not observed this frame".
#[inline]
pub fn nan_vector() -> Vector3<f64> {
    Vector3::repeat(f64::NAN)
}

/// A rotation meaning "not observed this frame".
#[inline]
pub fn nan_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::new_unchecked(Quaternion::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN))
}

#[inline]
pub fn is_finite_vector(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[inline]
pub fn is_finite_rotation(q: &UnitQuaternion<f64>) -> bool {
    q.coords.iter().all(|c| c.is_finite())
}

#[inline]
pub fn midpoint(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    (a + b) * 0.5
}

/// Linear interpolation `a + (b - a) * t`.
#[inline]
pub fn lerp(a: &Vector3<f64>, b: &Vector3<f64>, t: f64) -> Vector3<f64> {
    a + (b - a) * t
}

/// Centroid of a point set. Any NaN member makes the result NaN.
pub fn mean(points: &[Vector3<f64>]) -> Vector3<f64> {
    if points.is_empty() {
        return nan_vector();
    }
    points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / points.len() as f64
}

/// World axis least parallel to `v`, used when a frame hint degenerates.
pub fn least_parallel_axis(v: &Vector3<f64>) -> Vector3<f64> {
    let a = v.abs();
    if a.x <= a.y && a.x <= a.z {
        Vector3::x()
    } else if a.y <= a.z {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

/// Gram-Schmidt: returns `primary` normalized and `hint` made orthogonal to it.
fn orthonormal_pair(
    primary: &Vector3<f64>,
    hint: &Vector3<f64>,
) -> Option<(Vector3<f64>, Vector3<f64>)> {
    if !is_finite_vector(primary) || !is_finite_vector(hint) {
        return None;
    }
    let p = primary.try_normalize(DIRECTION_EPSILON)?;
    let mut h = hint - p * hint.dot(&p);
    if h.norm() < HINT_EPSILON {
        let fallback = least_parallel_axis(&p);
        h = fallback - p * fallback.dot(&p);
    }
    Some((p, h.normalize()))
}

fn from_basis(x: Vector3<f64>, y: Vector3<f64>, z: Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_basis_unchecked(&[x, y, z]))
}

/// Look-at frame: +Z along `forward`, +X as close to `right` as possible.
pub fn look_rotation_right(forward: &Vector3<f64>, right: &Vector3<f64>) -> UnitQuaternion<f64> {
    match orthonormal_pair(forward, right) {
        Some((z, x)) => from_basis(x, z.cross(&x), z),
        None => nan_rotation(),
    }
}

/// Bone frame: +Y along `direction`, +Z as close to `forward` as possible.
pub fn bone_rotation(direction: &Vector3<f64>, forward: &Vector3<f64>) -> UnitQuaternion<f64> {
    match orthonormal_pair(direction, forward) {
        Some((y, z)) => from_basis(y.cross(&z), y, z),
        None => nan_rotation(),
    }
}

/// Upright frame: +Y along `up`, +X as close to `right` as possible.
pub fn upright_rotation(up: &Vector3<f64>, right: &Vector3<f64>) -> UnitQuaternion<f64> {
    match orthonormal_pair(up, right) {
        Some((y, x)) => from_basis(x, y, x.cross(&y)),
        None => nan_rotation(),
    }
}

/// Minimal rotation taking direction `from` onto direction `to`.
///
/// Zero-length inputs yield the identity, NaN inputs a NaN rotation and
/// antiparallel inputs a half turn about an orthogonal axis.
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    if !is_finite_vector(from) || !is_finite_vector(to) {
        return nan_rotation();
    }
    let (Some(a), Some(b)) = (
        from.try_normalize(DIRECTION_EPSILON),
        to.try_normalize(DIRECTION_EPSILON),
    ) else {
        return UnitQuaternion::identity();
    };
    UnitQuaternion::rotation_between(&a, &b).unwrap_or_else(|| {
        let helper = least_parallel_axis(&a);
        let axis = Unit::new_normalize(a.cross(&helper));
        UnitQuaternion::from_axis_angle(&axis, std::f64::consts::PI)
    })
}

/// The fraction `t` (clamped to [0, 1]) of rotation `q`.
pub fn scale_rotation(q: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        return *q;
    }
    UnitQuaternion::from_scaled_axis(q.scaled_axis() * t)
}

/// Spherical interpolation that never panics; falls back to nlerp when slerp
/// is undefined.
pub fn slerp_or_nlerp(
    a: &UnitQuaternion<f64>,
    b: &UnitQuaternion<f64>,
    t: f64,
) -> UnitQuaternion<f64> {
    if !is_finite_rotation(a) || !is_finite_rotation(b) {
        return nan_rotation();
    }
    a.try_slerp(b, t, 1e-9).unwrap_or_else(|| a.nlerp(b, t))
}

/// Distance between orientations: `1 - |a·b|`, zero for equal rotations.
#[inline]
pub fn rotation_distance(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    1.0 - a.coords.dot(&b.coords).abs()
}

/// Wraps an angle in degrees into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Twist of `q` about `axis` (swing/twist decomposition), in degrees.
///
/// Returns 0 when the twist is undefined (a half-turn swing).
pub fn twist_angle(q: &UnitQuaternion<f64>, axis: &Unit<Vector3<f64>>) -> f64 {
    let along = q.imag().dot(axis.as_ref());
    let w = q.scalar();
    if along.abs() < DIRECTION_EPSILON && w.abs() < DIRECTION_EPSILON {
        return 0.0;
    }
    wrap_degrees((2.0 * along.atan2(w)).to_degrees())
}

/// Rotation of `degrees` about the local `axis` of `frame`, in world terms.
pub fn local_axis_rotation(
    frame: &UnitQuaternion<f64>,
    axis: &Vector3<f64>,
    degrees: f64,
) -> UnitQuaternion<f64> {
    let world_axis = Unit::new_normalize(frame * axis);
    UnitQuaternion::from_axis_angle(&world_axis, degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_rotation_identity_frame() {
        let q = look_rotation_right(&Vector3::z(), &Vector3::x());
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_look_rotation_orthonormalizes_hint() {
        // A skewed right hint still yields an exact forward axis.
        let forward = Vector3::new(1.0, 0.0, 0.0);
        let q = look_rotation_right(&forward, &Vector3::new(0.3, 0.0, -1.0));
        assert_relative_eq!(q * Vector3::z(), forward, epsilon = 1e-12);
        assert_relative_eq!(q * Vector3::x(), -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(q * Vector3::y(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_bone_rotation_points_y_along_bone() {
        let dir = Vector3::new(0.0, -1.0, 0.0);
        let q = bone_rotation(&dir, &Vector3::z());
        assert_relative_eq!(q * Vector3::y(), dir, epsilon = 1e-12);
        assert_relative_eq!(q * Vector3::z(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(q * Vector3::x(), -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_hint_falls_back() {
        let q = bone_rotation(&Vector3::z(), &Vector3::z());
        assert!(is_finite_rotation(&q));
        assert_relative_eq!(q * Vector3::y(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_upright_and_right_frames_agree() {
        let up = Vector3::new(0.0, 1.0, 0.1);
        let right = Vector3::new(1.0, 0.0, 0.0);
        let a = upright_rotation(&up, &right);
        let forward = right.cross(&up);
        let b = look_rotation_right(&forward, &right);
        assert_relative_eq!(rotation_distance(&a, &b), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nan_inputs_propagate() {
        let blind = look_rotation_right(&nan_vector(), &Vector3::x());
        assert!(!is_finite_rotation(&blind));
        let between = rotation_between(&Vector3::x(), &nan_vector());
        assert!(!is_finite_rotation(&between));
        assert!(!is_finite_vector(&mean(&[Vector3::x(), nan_vector()])));
        assert!(!is_finite_vector(&mean(&[])));
    }

    #[test]
    fn test_rotation_between_antiparallel() {
        let q = rotation_between(&Vector3::x(), &-Vector3::x());
        assert_relative_eq!(q * Vector3::x(), -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_between_zero_is_identity() {
        let q = rotation_between(&Vector3::zeros(), &Vector3::x());
        assert_eq!(q, UnitQuaternion::identity());
    }

    #[test]
    fn test_scale_rotation_halves_angle() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0);
        assert_relative_eq!(scale_rotation(&q, 0.5).angle(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(scale_rotation(&q, 2.0).angle(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_angle_extracts_axis_component() {
        let twist = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 40f64.to_radians());
        let swing = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 25f64.to_radians());
        let q = swing * twist;
        assert_relative_eq!(twist_angle(&q, &Vector3::y_axis()), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(wrap_degrees(190.0), -170.0);
        assert_relative_eq!(wrap_degrees(-180.0), 180.0);
        assert_relative_eq!(wrap_degrees(540.0), 180.0);
    }

    #[test]
    fn test_rotation_distance_ignores_double_cover() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let neg = UnitQuaternion::new_unchecked(-q.into_inner());
        assert_relative_eq!(rotation_distance(&q, &neg), 0.0, epsilon = 1e-12);
    }
}
