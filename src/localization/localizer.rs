//! SegmentLocalizer - per-frame derivation of every segment from markers.
//!
//! Positions are derived first, in template depth-first order, so each rule
//! can read the joints above it. Orientations follow in a second pass: every
//! bone aims +Y at its first child (leaves continue their parent's bone) and
//! rolls +Z towards the body frame of its region. A bone whose child is
//! missing keeps its rest pose relative to its parent. The pelvis and head
//! take their body frames directly.
//!
//! Position rules:
//! - Pelvis: centroid of the four pelvis markers (ASIS midpoint pushed back
//!   when the PSIS pair is missing).
//! - Spine: interpolated between pelvis and neck base (C7/CLAV midpoint);
//!   the middle joint uses the T10/STRN midpoint when both are visible.
//! - Head: centroid of the four head markers.
//! - Clavicle: CLAV offset laterally in the chest frame.
//! - Shoulder: Campbell regression from the acromion marker.
//! - Elbow / Wrist: epicondyle and styloid midpoints.
//! - Hand: halfway from wrist to the knuckle marker; fingers on their markers.
//! - Hip: Harrington regression.
//! - Knee / Ankle: proportional offset from the lateral/medial marker pair.
//! - Foot base: along heel to toe; toe on its marker.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::LocalizationConfig;
use crate::geometry::{
    bone_rotation, is_finite_rotation, is_finite_vector, lerp, mean, midpoint, nan_vector,
};
use crate::skeleton::template::forward_hint;
use crate::skeleton::{SegmentName, Side, SkeletonTree};

use super::frames::{chest_frame, head_frame, hip_frame, ChestTier};
use super::joints::{campbell_shoulder, harrington_hip, proportional_joint};
use super::labels::*;
use super::markers::MarkerSet;
use super::metrics::BodyMetrics;
use super::scratch::{FrameHistory, FrameScratch};

const SPINE_LOWER_FRACTION: f64 = 0.2;
const SPINE_MIDDLE_FRACTION: f64 = 0.5;
const SPINE_UPPER_FRACTION: f64 = 0.8;

/// Sternoclavicular joint relative to CLAV in the chest frame. X is the
/// lateral distance, mirrored per side.
const CLAVICLE_OFFSET: [f64; 3] = [0.03, 0.0, -0.03];
/// ASIS midpoint to pelvis center, along the pelvis -Z axis.
const PELVIS_HALF_DEPTH: f64 = 0.08;
const HAND_FRACTION: f64 = 0.5;
const FOOT_BASE_FRACTION: f64 = 0.7;

pub struct SegmentLocalizer {
    config: LocalizationConfig,
    metrics: BodyMetrics,
    scratch: FrameScratch,
    history: FrameHistory,
}

impl SegmentLocalizer {
    pub fn new(config: LocalizationConfig, metrics: BodyMetrics) -> Self {
        Self {
            config,
            metrics,
            scratch: FrameScratch::default(),
            history: FrameHistory::default(),
        }
    }

    pub fn metrics(&self) -> &BodyMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut BodyMetrics {
        &mut self.metrics
    }

    /// Which chest fallback the last pass used.
    pub fn chest_tier(&self) -> Option<ChestTier> {
        self.scratch.chest_tier
    }

    /// Overwrites every segment's position and orientation from `markers`
    /// and refreshes the `exists` flags. Missing inputs yield NaN geometry.
    pub fn localize(&mut self, markers: &MarkerSet, tree: &mut SkeletonTree) {
        self.scratch.reset();
        for name in SegmentName::ALL {
            let position = self.position_rule(name, markers, tree);
            tree[name].position = position;
        }
        for name in SegmentName::ALL {
            let orientation = self.orientation_rule(name, markers, tree);
            tree[name].orientation = orientation;
        }
        tree.refresh_exists();
    }

    /// Refines body measurements from the current frame.
    pub fn update_metrics(&mut self, markers: &MarkerSet, tree: &SkeletonTree) {
        self.metrics.observe_markers(markers);
        self.metrics.observe_skeleton(tree);
    }

    /// Keeps this frame's body frames as fallbacks for the next one.
    pub fn end_frame(&mut self) {
        self.history.commit(&self.scratch);
    }

    fn hip(&mut self, markers: &MarkerSet) -> UnitQuaternion<f64> {
        let previous = self.history.hip;
        *self
            .scratch
            .hip
            .get_or_insert_with(|| hip_frame(markers, previous))
    }

    fn chest(&mut self, markers: &MarkerSet, tree: &SkeletonTree) -> UnitQuaternion<f64> {
        if let Some(chest) = self.scratch.chest {
            return chest;
        }
        let hip = self.hip(markers);
        let (chest, tier) = chest_frame(markers, &tree.root().position, &hip, self.history.chest);
        self.scratch.chest = Some(chest);
        self.scratch.chest_tier = Some(tier);
        chest
    }

    fn head(&mut self, markers: &MarkerSet, tree: &SkeletonTree) -> UnitQuaternion<f64> {
        if let Some(head) = self.scratch.head {
            return head;
        }
        let chest = self.chest(markers, tree);
        let head = head_frame(markers, &chest);
        self.scratch.head = Some(head);
        head
    }

    /// Body frame a segment's roll is taken from.
    fn region_frame(
        &mut self,
        name: SegmentName,
        markers: &MarkerSet,
        tree: &SkeletonTree,
    ) -> UnitQuaternion<f64> {
        use SegmentName::*;
        match name {
            Pelvis | LeftHip | LeftKnee | LeftAnkle | LeftFootBase | LeftToe | RightHip
            | RightKnee | RightAnkle | RightFootBase | RightToe => self.hip(markers),
            Head => self.head(markers, tree),
            _ => self.chest(markers, tree),
        }
    }

    fn position_rule(
        &mut self,
        name: SegmentName,
        markers: &MarkerSet,
        tree: &SkeletonTree,
    ) -> Vector3<f64> {
        use SegmentName::*;
        let side = name.side().unwrap_or(Side::Left);
        let neck_base = || midpoint(&markers.get(C7), &markers.get(CLAV));
        let pelvis = tree[Pelvis].position;

        match name {
            Pelvis => self.pelvis_center(markers),
            SpineLower => lerp(&pelvis, &neck_base(), SPINE_LOWER_FRACTION),
            SpineMiddle => {
                let back_front = midpoint(&markers.get(T10), &markers.get(STRN));
                if is_finite_vector(&back_front) {
                    back_front
                } else {
                    lerp(&pelvis, &neck_base(), SPINE_MIDDLE_FRACTION)
                }
            }
            SpineUpper => lerp(&pelvis, &neck_base(), SPINE_UPPER_FRACTION),
            Neck => neck_base(),
            Head => mean(&[
                markers.get(LFHD),
                markers.get(RFHD),
                markers.get(LBHD),
                markers.get(RBHD),
            ]),
            LeftClavicle | RightClavicle => {
                let [x, y, z] = CLAVICLE_OFFSET;
                let local = Vector3::new(side.sign() * x, y, z);
                markers.get(CLAV) + self.chest(markers, tree) * local
            }
            LeftShoulder | RightShoulder => {
                let chest = self.chest(markers, tree);
                campbell_shoulder(&markers.sided(side, SHO), &chest, side, &self.metrics)
            }
            LeftElbow | RightElbow => {
                midpoint(&markers.sided(side, ELB), &markers.sided(side, ELM))
            }
            LeftWrist | RightWrist => {
                midpoint(&markers.sided(side, WRA), &markers.sided(side, WRB))
            }
            LeftHand | RightHand => {
                let wrist = tree[name.parent().unwrap_or(name)].position;
                lerp(&wrist, &markers.sided(side, FIN), HAND_FRACTION)
            }
            LeftIndex | RightIndex => markers.sided(side, IDX),
            LeftThumb | RightThumb => markers.sided(side, THM),
            LeftHip | RightHip => {
                let hip = self.hip(markers);
                harrington_hip(
                    &markers.get(LASI),
                    &markers.get(RASI),
                    &markers.get(LPSI),
                    &markers.get(RPSI),
                    &hip,
                    side,
                )
            }
            LeftKnee | RightKnee => {
                let offset = Vector3::from(self.config.knee_offset);
                proportional_joint(
                    &markers.sided(side, KNE),
                    &markers.sided(side, KNM),
                    &markers.sided(side, THI),
                    side,
                    &offset,
                    self.config.reference_width,
                )
                .0
            }
            LeftAnkle | RightAnkle => {
                let offset = Vector3::from(self.config.ankle_offset);
                proportional_joint(
                    &markers.sided(side, ANK),
                    &markers.sided(side, MED),
                    &markers.sided(side, TIB),
                    side,
                    &offset,
                    self.config.reference_width,
                )
                .0
            }
            LeftFootBase | RightFootBase => lerp(
                &markers.sided(side, HEE),
                &markers.sided(side, TOE),
                FOOT_BASE_FRACTION,
            ),
            LeftToe | RightToe => markers.sided(side, TOE),
        }
    }

    fn pelvis_center(&mut self, markers: &MarkerSet) -> Vector3<f64> {
        let lasi = markers.get(LASI);
        let rasi = markers.get(RASI);
        let center = mean(&[lasi, rasi, markers.get(LPSI), markers.get(RPSI)]);
        if is_finite_vector(&center) {
            return center;
        }
        let hip = self.hip(markers);
        midpoint(&lasi, &rasi) + hip * Vector3::new(0.0, 0.0, -PELVIS_HALF_DEPTH)
    }

    fn orientation_rule(
        &mut self,
        name: SegmentName,
        markers: &MarkerSet,
        tree: &SkeletonTree,
    ) -> UnitQuaternion<f64> {
        match name {
            SegmentName::Pelvis => self.hip(markers),
            SegmentName::Head => self.head(markers, tree),
            _ => {
                let here = tree[name].position;
                let direction = match name.first_child() {
                    Some(child) => tree[child].position - here,
                    None => name
                        .parent()
                        .map_or_else(nan_vector, |parent| here - tree[parent].position),
                };
                let hint = self.region_frame(name, markers, tree) * forward_hint(name);
                let aimed = bone_rotation(&direction, &hint);
                if is_finite_rotation(&aimed) || !is_finite_vector(&here) {
                    return aimed;
                }
                // Nothing to aim at: keep the rest pose relative to the parent.
                match tree.parent_of(name) {
                    Some(parent) => tree[name].reference_frame(parent),
                    None => aimed,
                }
            }
        }
    }
}

impl Default for SegmentLocalizer {
    fn default() -> Self {
        Self::new(LocalizationConfig::default(), BodyMetrics::default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::standing_markers;
    use super::*;
    use approx::assert_relative_eq;

    fn localized(markers: &MarkerSet) -> (SegmentLocalizer, SkeletonTree) {
        let mut localizer = SegmentLocalizer::default();
        let mut tree = SkeletonTree::from_template();
        localizer.localize(markers, &mut tree);
        (localizer, tree)
    }

    #[test]
    fn test_full_marker_set_localizes_everything() {
        let (localizer, tree) = localized(&standing_markers());
        for seg in tree.iter() {
            assert!(seg.exists, "{} missing", seg.name);
        }
        assert_eq!(localizer.chest_tier(), Some(ChestTier::Shoulders));
        assert_relative_eq!(tree.root().orientation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sides_are_mirrored() {
        let (_, tree) = localized(&standing_markers());
        let pairs = [
            (SegmentName::LeftHip, SegmentName::RightHip),
            (SegmentName::LeftKnee, SegmentName::RightKnee),
            (SegmentName::LeftAnkle, SegmentName::RightAnkle),
            (SegmentName::LeftShoulder, SegmentName::RightShoulder),
            (SegmentName::LeftClavicle, SegmentName::RightClavicle),
        ];
        for (l, r) in pairs {
            let lp = tree[l].position;
            let rp = tree[r].position;
            assert!(lp.x < 0.0, "{} should be on the left", l);
            assert_relative_eq!(lp.x, -rp.x, epsilon = 1e-9);
            assert_relative_eq!(lp.y, rp.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bones_point_at_children() {
        let (_, tree) = localized(&standing_markers());
        let knee = &tree[SegmentName::LeftKnee];
        let ankle = &tree[SegmentName::LeftAnkle];
        let dir = (ankle.position - knee.position).normalize();
        assert_relative_eq!(knee.bone_axis(), dir, epsilon = 1e-9);
        // Thigh rolls with the pelvis: forward stays forward.
        assert!(tree[SegmentName::LeftHip].forward_axis().z > 0.9);
    }

    #[test]
    fn test_missing_marker_propagates_nan() {
        let mut markers = standing_markers();
        markers.remove("LKNM");
        let (_, tree) = localized(&markers);

        let knee = &tree[SegmentName::LeftKnee];
        assert!(knee.position.x.is_nan());
        assert!(!knee.exists);
        // The thigh has no child to aim at and keeps its rest pose.
        let hip = &tree[SegmentName::LeftHip];
        assert!(hip.exists);
        assert_relative_eq!(
            hip.orientation,
            hip.reference_frame(tree.root()),
            epsilon = 1e-12
        );
        assert!(tree[SegmentName::RightKnee].exists);
    }

    #[test]
    fn test_chest_falls_back_to_spine_markers() {
        let mut markers = standing_markers();
        markers.remove("LSHO");
        let (localizer, tree) = localized(&markers);
        assert_eq!(localizer.chest_tier(), Some(ChestTier::SpineMarkers));
        assert!(tree[SegmentName::SpineUpper].exists);
        assert!(!tree[SegmentName::LeftShoulder].exists);
        assert!(tree[SegmentName::RightShoulder].exists);
    }

    #[test]
    fn test_previous_hip_frame_survives_dropout() {
        let mut localizer = SegmentLocalizer::default();
        let mut tree = SkeletonTree::from_template();
        localizer.localize(&standing_markers(), &mut tree);
        let before = tree.root().orientation;
        localizer.end_frame();

        let mut markers = standing_markers();
        for label in [LASI, RASI, LPSI, RPSI] {
            markers.remove(label);
        }
        localizer.localize(&markers, &mut tree);
        assert_eq!(tree.root().orientation, before);
        assert!(tree.root().position.x.is_nan());
    }
}
