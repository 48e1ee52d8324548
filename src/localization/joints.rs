//! Regression-based joint centers.
//!
//! - Hip: Harrington et al. (2007), from pelvis width and depth.
//! - Shoulder: Campbell et al. (2009), from chest depth, height, mass and
//!   shoulder width.
//! - Knee and ankle: proportional offset in a frame built from a lateral /
//!   medial marker pair and an alignment marker.
//!
//! All functions return NaN when an input is missing.

use nalgebra::{Rotation3, UnitQuaternion, Vector3};

use crate::geometry::rotation::DIRECTION_EPSILON;
use crate::geometry::{is_finite_vector, midpoint, nan_rotation, nan_vector};
use crate::skeleton::Side;

use super::metrics::BodyMetrics;

/// Harrington hip joint center.
///
/// `hip` is the pelvis frame (X right, Y up, Z forward). Offsets are
/// expressed from the ASIS midpoint, with X negative on the left side.
pub fn harrington_hip(
    lasi: &Vector3<f64>,
    rasi: &Vector3<f64>,
    lpsi: &Vector3<f64>,
    rpsi: &Vector3<f64>,
    hip: &UnitQuaternion<f64>,
    side: Side,
) -> Vector3<f64> {
    let asis_mid = midpoint(lasi, rasi);
    let psis_mid = midpoint(lpsi, rpsi);
    let pelvis_width = (rasi - lasi).norm();
    let pelvis_depth = (asis_mid - psis_mid).norm();

    let local = Vector3::new(
        side.sign() * (0.33 * pelvis_width + 0.0073),
        -0.30 * pelvis_width - 0.0109,
        -0.24 * pelvis_depth - 0.0099,
    );
    asis_mid + hip * local
}

/// Campbell glenohumeral joint center from the acromion marker.
///
/// `chest` is the thorax frame (X right, Y up, Z forward). A positive
/// lateral term points away from the midline.
pub fn campbell_shoulder(
    acromion: &Vector3<f64>,
    chest: &UnitQuaternion<f64>,
    side: Side,
    metrics: &BodyMetrics,
) -> Vector3<f64> {
    let chest_depth_mm = metrics.chest_depth() * 1000.0;
    let half_width_mm = metrics.shoulder_width() * 500.0;
    let height_cm = metrics.height_cm();
    let mass_kg = metrics.mass_kg();

    let forward = 96.2 - 0.302 * chest_depth_mm - 0.364 * height_cm + 0.385 * mass_kg;
    let up = -66.32 + 0.30 * chest_depth_mm - 0.432 * mass_kg;
    let lateral = 66.468 - 0.531 * half_width_mm + 0.571 * mass_kg;

    let local = Vector3::new(side.sign() * lateral, up, forward) / 1000.0;
    acromion + chest * local
}

/// Center and frame of a hinge joint from a marker pair across it and a
/// marker along the adjacent segment.
///
/// The frame has X pointing to the subject's right across the marker pair,
/// Y towards `alignment` and Z = X × Y. `offset` is scaled by the marker
/// width over `reference_width` and applied from the medial marker; its X
/// component is authored for the left side and mirrored for the right.
pub fn proportional_joint(
    lateral: &Vector3<f64>,
    medial: &Vector3<f64>,
    alignment: &Vector3<f64>,
    side: Side,
    offset: &Vector3<f64>,
    reference_width: f64,
) -> (Vector3<f64>, UnitQuaternion<f64>) {
    let Some(frame) = joint_frame(lateral, medial, alignment, side) else {
        return (nan_vector(), nan_rotation());
    };
    let scale = (lateral - medial).norm() / reference_width;
    let mirrored = match side {
        Side::Left => *offset,
        Side::Right => Vector3::new(-offset.x, offset.y, offset.z),
    };
    (medial + frame * (mirrored * scale), frame)
}

fn joint_frame(
    lateral: &Vector3<f64>,
    medial: &Vector3<f64>,
    alignment: &Vector3<f64>,
    side: Side,
) -> Option<UnitQuaternion<f64>> {
    if !is_finite_vector(lateral) || !is_finite_vector(medial) || !is_finite_vector(alignment) {
        return None;
    }
    // Left side: the lateral marker is the left-most one.
    let across = match side {
        Side::Left => medial - lateral,
        Side::Right => lateral - medial,
    };
    let x = across.try_normalize(DIRECTION_EPSILON)?;
    let toward = alignment - midpoint(lateral, medial);
    let y = (toward - x * toward.dot(&x)).try_normalize(DIRECTION_EPSILON)?;
    let z = x.cross(&y);
    Some(UnitQuaternion::from_rotation_matrix(
        &Rotation3::from_basis_unchecked(&[x, y, z]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_harrington_sides_are_symmetric() {
        let lasi = Vector3::new(-0.12, 1.0, 0.08);
        let rasi = Vector3::new(0.12, 1.0, 0.08);
        let lpsi = Vector3::new(-0.05, 1.02, -0.1);
        let rpsi = Vector3::new(0.05, 1.02, -0.1);
        let hip = UnitQuaternion::identity();

        let left = harrington_hip(&lasi, &rasi, &lpsi, &rpsi, &hip, Side::Left);
        let right = harrington_hip(&lasi, &rasi, &lpsi, &rpsi, &hip, Side::Right);

        // PW = 0.24: lateral 0.33 * 0.24 + 0.0073
        assert_relative_eq!(right.x, 0.33 * 0.24 + 0.0073, epsilon = 1e-12);
        assert_relative_eq!(left.x, -right.x, epsilon = 1e-12);
        assert_relative_eq!(left.y, 1.0 - 0.30 * 0.24 - 0.0109, epsilon = 1e-12);
        assert!(left.z < 0.08);
    }

    #[test]
    fn test_harrington_follows_pelvis_rotation() {
        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let base = [
            Vector3::new(-0.12, 0.0, 0.08),
            Vector3::new(0.12, 0.0, 0.08),
            Vector3::new(-0.05, 0.0, -0.1),
            Vector3::new(0.05, 0.0, -0.1),
        ];
        let moved: Vec<Vector3<f64>> = base.iter().map(|p| rot * p).collect();
        let a = harrington_hip(
            &base[0],
            &base[1],
            &base[2],
            &base[3],
            &UnitQuaternion::identity(),
            Side::Left,
        );
        let b = harrington_hip(&moved[0], &moved[1], &moved[2], &moved[3], &rot, Side::Left);
        assert_relative_eq!(rot * a, b, epsilon = 1e-12);
    }

    #[test]
    fn test_harrington_missing_marker_is_nan() {
        let nan = nan_vector();
        let p = Vector3::zeros();
        let hjc = harrington_hip(&nan, &p, &p, &p, &UnitQuaternion::identity(), Side::Left);
        assert!(hjc.x.is_nan());
    }

    #[test]
    fn test_campbell_offset_is_below_acromion() {
        let metrics = BodyMetrics::default();
        let acromion = Vector3::new(-0.2, 1.45, 0.0);
        let sjc = campbell_shoulder(&acromion, &UnitQuaternion::identity(), Side::Left, &metrics);
        assert!(sjc.y < acromion.y);
        assert!((sjc - acromion).norm() < 0.1);
    }

    #[test]
    fn test_campbell_lateral_mirrors() {
        let metrics = BodyMetrics::default();
        let chest = UnitQuaternion::identity();
        let l = campbell_shoulder(&Vector3::zeros(), &chest, Side::Left, &metrics);
        let r = campbell_shoulder(&Vector3::zeros(), &chest, Side::Right, &metrics);
        assert_relative_eq!(l.x, -r.x, epsilon = 1e-12);
        assert_relative_eq!(l.y, r.y, epsilon = 1e-12);
    }

    #[test]
    fn test_knee_frame_axes() {
        let lateral = Vector3::new(-0.15, 0.5, 0.0);
        let medial = Vector3::new(-0.05, 0.5, 0.0);
        let thigh = Vector3::new(-0.1, 0.8, 0.02);
        let offset = Vector3::new(-0.1033, -0.0981, 0.0597);
        let (center, frame) =
            proportional_joint(&lateral, &medial, &thigh, Side::Left, &offset, 0.2);

        assert_relative_eq!(frame * Vector3::x(), Vector3::x(), epsilon = 1e-9);
        assert!((frame * Vector3::y()).y > 0.99);
        // Width 0.1 halves the offset.
        let expected = medial + frame * (offset * 0.5);
        assert_relative_eq!(center, expected, epsilon = 1e-12);
        assert!(center.x < medial.x && center.x > lateral.x);
    }

    #[test]
    fn test_right_knee_mirrors_left() {
        let offset = Vector3::new(-0.1033, -0.0981, 0.0597);
        let mirror = |v: Vector3<f64>| Vector3::new(-v.x, v.y, v.z);
        let lateral = Vector3::new(-0.15, 0.5, 0.01);
        let medial = Vector3::new(-0.05, 0.5, -0.01);
        let thigh = Vector3::new(-0.1, 0.8, 0.02);
        let (left, _) = proportional_joint(&lateral, &medial, &thigh, Side::Left, &offset, 0.2);
        let (right, _) = proportional_joint(
            &mirror(lateral),
            &mirror(medial),
            &mirror(thigh),
            Side::Right,
            &offset,
            0.2,
        );
        assert_relative_eq!(mirror(left), right, epsilon = 1e-12);
    }

    #[test]
    fn test_proportional_joint_nan_propagation() {
        let (center, frame) = proportional_joint(
            &Vector3::zeros(),
            &nan_vector(),
            &Vector3::y(),
            Side::Left,
            &Vector3::zeros(),
            0.2,
        );
        assert!(center.x.is_nan());
        assert!(frame.w.is_nan());
    }
}
