//! Body reference frames (pelvis, thorax, head) built from marker midpoints.
//!
//! All frames use X right, Y up, Z forward. Each derivation has a fallback
//! chain for partial marker coverage and returns a NaN rotation when nothing
//! usable is left.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::{
    bone_rotation, is_finite_rotation, is_finite_vector, look_rotation_right, midpoint,
    nan_rotation, slerp_or_nlerp, upright_rotation,
};

use super::labels::{C7, CLAV, LASI, LBHD, LFHD, LPSI, RASI, RBHD, RFHD, RPSI, SHO, T10};
use super::markers::MarkerSet;
use crate::skeleton::Side;

/// Weight of a freshly derived single-marker chest frame against the
/// previous frame's orientation.
const SINGLE_MARKER_BLEND: f64 = 0.2;
/// Blend between the previous chest frame and the current pelvis frame when
/// no chest marker is visible.
const PREVIOUS_CHEST_BLEND: f64 = 0.5;

/// Which fallback produced the chest frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestTier {
    Shoulders,
    SpineMarkers,
    SingleMarker,
    Previous,
    Missing,
}

/// Pelvis frame: ASIS/PSIS midpoints, then ASIS pair only, then the
/// previous orientation.
pub fn hip_frame(
    markers: &MarkerSet,
    previous: Option<UnitQuaternion<f64>>,
) -> UnitQuaternion<f64> {
    let lasi = markers.get(LASI);
    let rasi = markers.get(RASI);
    let right = rasi - lasi;

    let forward = midpoint(&lasi, &rasi) - midpoint(&markers.get(LPSI), &markers.get(RPSI));
    if is_finite_vector(&forward) && is_finite_vector(&right) {
        return look_rotation_right(&forward, &right);
    }
    if is_finite_vector(&right) {
        return look_rotation_right(&right.cross(&Vector3::y()), &right);
    }
    previous.unwrap_or_else(nan_rotation)
}

/// Thorax frame, first available tier wins.
pub fn chest_frame(
    markers: &MarkerSet,
    pelvis: &Vector3<f64>,
    hip: &UnitQuaternion<f64>,
    previous: Option<UnitQuaternion<f64>>,
) -> (UnitQuaternion<f64>, ChestTier) {
    let lsho = markers.sided(Side::Left, SHO);
    let rsho = markers.sided(Side::Right, SHO);
    let up = midpoint(&lsho, &rsho) - pelvis;
    let right = rsho - lsho;
    if is_finite_vector(&up) && is_finite_vector(&right) {
        return (upright_rotation(&up, &right), ChestTier::Shoulders);
    }

    let c7 = markers.get(C7);
    let clav = markers.get(CLAV);
    let up = c7 - markers.get(T10);
    let forward = clav - c7;
    if is_finite_vector(&up) && is_finite_vector(&forward) {
        return (bone_rotation(&up, &forward), ChestTier::SpineMarkers);
    }

    let single = if is_finite_vector(&clav) { clav } else { c7 };
    if is_finite_vector(&single) && is_finite_vector(pelvis) && is_finite_rotation(hip) {
        let derived = upright_rotation(&(single - pelvis), &(hip * Vector3::x()));
        let blended = match previous {
            Some(prev) => slerp_or_nlerp(&prev, &derived, SINGLE_MARKER_BLEND),
            None => derived,
        };
        return (blended, ChestTier::SingleMarker);
    }

    match previous {
        Some(prev) if is_finite_rotation(hip) => (
            slerp_or_nlerp(&prev, hip, PREVIOUS_CHEST_BLEND),
            ChestTier::Previous,
        ),
        _ => (nan_rotation(), ChestTier::Missing),
    }
}

/// Head frame from the four head markers, falling back to the back pair for
/// the lateral axis and to the chest frame when the head is not visible.
pub fn head_frame(markers: &MarkerSet, chest: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let lfhd = markers.get(LFHD);
    let rfhd = markers.get(RFHD);
    let lbhd = markers.get(LBHD);
    let rbhd = markers.get(RBHD);

    let forward = midpoint(&lfhd, &rfhd) - midpoint(&lbhd, &rbhd);
    let mut right = rfhd - lfhd;
    if !is_finite_vector(&right) {
        right = rbhd - lbhd;
    }
    if is_finite_vector(&forward) && is_finite_vector(&right) {
        look_rotation_right(&forward, &right)
    } else {
        *chest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pelvis_markers() -> MarkerSet {
        let mut m = MarkerSet::new();
        m.insert(LASI, Vector3::new(-0.12, 1.0, 0.08));
        m.insert(RASI, Vector3::new(0.12, 1.0, 0.08));
        m.insert(LPSI, Vector3::new(-0.05, 1.0, -0.1));
        m.insert(RPSI, Vector3::new(0.05, 1.0, -0.1));
        m
    }

    #[test]
    fn test_upright_pelvis_is_identity() {
        let q = hip_frame(&pelvis_markers(), None);
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hip_falls_back_to_asis_then_previous() {
        let mut m = pelvis_markers();
        m.remove(LPSI);
        assert_relative_eq!(hip_frame(&m, None).angle(), 0.0, epsilon = 1e-12);

        m.remove(LASI);
        let prev = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        assert_eq!(hip_frame(&m, Some(prev)), prev);
        assert!(hip_frame(&m, None).w.is_nan());
    }

    #[test]
    fn test_chest_tiers() {
        let pelvis = Vector3::new(0.0, 1.0, 0.0);
        let hip = UnitQuaternion::identity();
        let mut m = MarkerSet::new();
        m.insert("LSHO", Vector3::new(-0.2, 1.45, 0.0));
        m.insert("RSHO", Vector3::new(0.2, 1.45, 0.0));
        m.insert(C7, Vector3::new(0.0, 1.5, -0.1));
        m.insert(T10, Vector3::new(0.0, 1.3, -0.12));
        m.insert(CLAV, Vector3::new(0.0, 1.45, 0.08));

        let (q, tier) = chest_frame(&m, &pelvis, &hip, None);
        assert_eq!(tier, ChestTier::Shoulders);
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-12);

        m.remove("RSHO");
        let (q, tier) = chest_frame(&m, &pelvis, &hip, None);
        assert_eq!(tier, ChestTier::SpineMarkers);
        assert!((q * Vector3::z()).z > 0.9);

        m.remove(T10);
        let prev = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5);
        let (q, tier) = chest_frame(&m, &pelvis, &hip, Some(prev));
        assert_eq!(tier, ChestTier::SingleMarker);
        // Blended 80/20 towards the previous orientation.
        let derived = upright_rotation(&(m.get(CLAV) - pelvis), &Vector3::x());
        assert_relative_eq!(q, prev.slerp(&derived, 0.2), epsilon = 1e-9);

        m.remove(CLAV);
        m.remove(C7);
        let (q, tier) = chest_frame(&m, &pelvis, &hip, Some(prev));
        assert_eq!(tier, ChestTier::Previous);
        assert_relative_eq!(q.angle(), 0.25, epsilon = 1e-9);

        let (q, tier) = chest_frame(&m, &pelvis, &hip, None);
        assert_eq!(tier, ChestTier::Missing);
        assert!(q.w.is_nan());
    }

    #[test]
    fn test_head_falls_back_to_chest() {
        let chest = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        let mut m = MarkerSet::new();
        m.insert(LFHD, Vector3::new(-0.06, 1.7, 0.08));
        m.insert(RFHD, Vector3::new(0.06, 1.7, 0.08));
        m.insert(LBHD, Vector3::new(-0.06, 1.7, -0.08));
        m.insert(RBHD, Vector3::new(0.06, 1.7, -0.08));
        assert_relative_eq!(head_frame(&m, &chest).angle(), 0.0, epsilon = 1e-12);

        m.remove(RFHD);
        assert_eq!(head_frame(&m, &chest), chest);
    }
}
