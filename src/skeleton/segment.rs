//! Segment identifiers and per-segment state.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::{is_finite_rotation, is_finite_vector, nan_rotation, nan_vector};

use super::constraint::JointConstraint;

/// Body side of a paired segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign of the world X axis on this side (+X points to the subject's right).
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Marker label prefix, `"L"` or `"R"`.
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

/// Stable identifier of an anatomical segment.
///
/// Discriminants follow the depth-first order of the template, so
/// `name as usize` doubles as the arena index in [`super::SkeletonTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentName {
    Pelvis,
    SpineLower,
    SpineMiddle,
    SpineUpper,
    Neck,
    Head,
    LeftClavicle,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    LeftHand,
    LeftIndex,
    LeftThumb,
    RightClavicle,
    RightShoulder,
    RightElbow,
    RightWrist,
    RightHand,
    RightIndex,
    RightThumb,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    LeftFootBase,
    LeftToe,
    RightHip,
    RightKnee,
    RightAnkle,
    RightFootBase,
    RightToe,
}

impl SegmentName {
    pub const COUNT: usize = 30;

    /// All segments in depth-first template order.
    pub const ALL: [SegmentName; Self::COUNT] = [
        SegmentName::Pelvis,
        SegmentName::SpineLower,
        SegmentName::SpineMiddle,
        SegmentName::SpineUpper,
        SegmentName::Neck,
        SegmentName::Head,
        SegmentName::LeftClavicle,
        SegmentName::LeftShoulder,
        SegmentName::LeftElbow,
        SegmentName::LeftWrist,
        SegmentName::LeftHand,
        SegmentName::LeftIndex,
        SegmentName::LeftThumb,
        SegmentName::RightClavicle,
        SegmentName::RightShoulder,
        SegmentName::RightElbow,
        SegmentName::RightWrist,
        SegmentName::RightHand,
        SegmentName::RightIndex,
        SegmentName::RightThumb,
        SegmentName::LeftHip,
        SegmentName::LeftKnee,
        SegmentName::LeftAnkle,
        SegmentName::LeftFootBase,
        SegmentName::LeftToe,
        SegmentName::RightHip,
        SegmentName::RightKnee,
        SegmentName::RightAnkle,
        SegmentName::RightFootBase,
        SegmentName::RightToe,
    ];

    pub const ROOT: SegmentName = SegmentName::Pelvis;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn parent(self) -> Option<SegmentName> {
        use SegmentName::*;
        match self {
            Pelvis => None,
            SpineLower | LeftHip | RightHip => Some(Pelvis),
            SpineMiddle => Some(SpineLower),
            SpineUpper => Some(SpineMiddle),
            Neck | LeftClavicle | RightClavicle => Some(SpineUpper),
            Head => Some(Neck),
            LeftShoulder => Some(LeftClavicle),
            LeftElbow => Some(LeftShoulder),
            LeftWrist => Some(LeftElbow),
            LeftHand => Some(LeftWrist),
            LeftThumb | LeftIndex => Some(LeftHand),
            RightShoulder => Some(RightClavicle),
            RightElbow => Some(RightShoulder),
            RightWrist => Some(RightElbow),
            RightHand => Some(RightWrist),
            RightThumb | RightIndex => Some(RightHand),
            LeftKnee => Some(LeftHip),
            LeftAnkle => Some(LeftKnee),
            LeftFootBase => Some(LeftAnkle),
            LeftToe => Some(LeftFootBase),
            RightKnee => Some(RightHip),
            RightAnkle => Some(RightKnee),
            RightFootBase => Some(RightAnkle),
            RightToe => Some(RightFootBase),
        }
    }

    /// Children in fixed template order; the first child defines the bone axis.
    pub fn children(self) -> &'static [SegmentName] {
        use SegmentName::*;
        match self {
            Pelvis => &[SpineLower, LeftHip, RightHip],
            SpineLower => &[SpineMiddle],
            SpineMiddle => &[SpineUpper],
            SpineUpper => &[Neck, LeftClavicle, RightClavicle],
            Neck => &[Head],
            LeftClavicle => &[LeftShoulder],
            LeftShoulder => &[LeftElbow],
            LeftElbow => &[LeftWrist],
            LeftWrist => &[LeftHand],
            LeftHand => &[LeftIndex, LeftThumb],
            RightClavicle => &[RightShoulder],
            RightShoulder => &[RightElbow],
            RightElbow => &[RightWrist],
            RightWrist => &[RightHand],
            RightHand => &[RightIndex, RightThumb],
            LeftHip => &[LeftKnee],
            LeftKnee => &[LeftAnkle],
            LeftAnkle => &[LeftFootBase],
            LeftFootBase => &[LeftToe],
            RightHip => &[RightKnee],
            RightKnee => &[RightAnkle],
            RightAnkle => &[RightFootBase],
            RightFootBase => &[RightToe],
            Head | LeftThumb | LeftIndex | RightThumb | RightIndex | LeftToe | RightToe => &[],
        }
    }

    #[inline]
    pub fn first_child(self) -> Option<SegmentName> {
        self.children().first().copied()
    }

    #[inline]
    pub fn is_leaf(self) -> bool {
        self.children().is_empty()
    }

    pub fn side(self) -> Option<Side> {
        use SegmentName::*;
        match self {
            LeftClavicle | LeftShoulder | LeftElbow | LeftWrist | LeftHand | LeftThumb
            | LeftIndex | LeftHip | LeftKnee | LeftAnkle | LeftFootBase | LeftToe => {
                Some(Side::Left)
            }
            RightClavicle | RightShoulder | RightElbow | RightWrist | RightHand | RightThumb
            | RightIndex | RightHip | RightKnee | RightAnkle | RightFootBase | RightToe => {
                Some(Side::Right)
            }
            Pelvis | SpineLower | SpineMiddle | SpineUpper | Neck | Head => None,
        }
    }

    /// Segments of an arm (below the clavicle) or a leg.
    pub fn is_limb(self) -> bool {
        use SegmentName::*;
        !matches!(
            self,
            Pelvis | SpineLower | SpineMiddle | SpineUpper | Neck | Head | LeftClavicle
                | RightClavicle
        )
    }

    /// Clavicles and shoulders are repaired with a direct look-at rule
    /// instead of a chain solve.
    pub fn uses_direct_repair(self) -> bool {
        use SegmentName::*;
        matches!(
            self,
            LeftClavicle | RightClavicle | LeftShoulder | RightShoulder
        )
    }

    pub fn as_str(self) -> &'static str {
        use SegmentName::*;
        match self {
            Pelvis => "Pelvis",
            SpineLower => "SpineLower",
            SpineMiddle => "SpineMiddle",
            SpineUpper => "SpineUpper",
            Neck => "Neck",
            Head => "Head",
            LeftClavicle => "LeftClavicle",
            LeftShoulder => "LeftShoulder",
            LeftElbow => "LeftElbow",
            LeftWrist => "LeftWrist",
            LeftHand => "LeftHand",
            LeftThumb => "LeftThumb",
            LeftIndex => "LeftIndex",
            RightClavicle => "RightClavicle",
            RightShoulder => "RightShoulder",
            RightElbow => "RightElbow",
            RightWrist => "RightWrist",
            RightHand => "RightHand",
            RightThumb => "RightThumb",
            RightIndex => "RightIndex",
            LeftHip => "LeftHip",
            LeftKnee => "LeftKnee",
            LeftAnkle => "LeftAnkle",
            LeftFootBase => "LeftFootBase",
            LeftToe => "LeftToe",
            RightHip => "RightHip",
            RightKnee => "RightKnee",
            RightAnkle => "RightAnkle",
            RightFootBase => "RightFootBase",
            RightToe => "RightToe",
        }
    }
}

impl std::fmt::Display for SegmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one anatomical segment for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub name: SegmentName,
    /// Joint position in world space (meters).
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    /// True when this frame's geometry for the segment is valid.
    pub exists: bool,
    /// Fixed rotation of this segment relative to its parent in the T-pose.
    pub parent_offset: UnitQuaternion<f64>,
    pub constraint: JointConstraint,
    /// Fraction of each solver rotation this joint accepts, in [0, 1].
    pub stiffness: f64,
}

impl Segment {
    pub fn new(
        name: SegmentName,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            name,
            position,
            orientation,
            exists: true,
            parent_offset: UnitQuaternion::identity(),
            constraint: JointConstraint::default(),
            stiffness: 1.0,
        }
    }

    /// Whether both position and orientation are finite.
    #[inline]
    pub fn has_data(&self) -> bool {
        is_finite_vector(&self.position) && is_finite_rotation(&self.orientation)
    }

    /// Clears geometry to NaN and marks the segment missing.
    pub fn invalidate(&mut self) {
        self.position = nan_vector();
        self.orientation = nan_rotation();
        self.exists = false;
    }

    /// World direction of the segment's local +Y (bone) axis.
    #[inline]
    pub fn bone_axis(&self) -> Vector3<f64> {
        self.orientation * Vector3::y()
    }

    /// World direction of the segment's local +Z (forward) axis.
    #[inline]
    pub fn forward_axis(&self) -> Vector3<f64> {
        self.orientation * Vector3::z()
    }

    /// Orientation this segment would have if it had not moved relative to
    /// `parent` since the T-pose. Constraints are measured against it.
    #[inline]
    pub fn reference_frame(&self, parent: &Segment) -> UnitQuaternion<f64> {
        parent.orientation * self.parent_offset
    }

    /// Rotates this segment about `pivot` (forward kinematics step).
    pub fn rotate_about(&mut self, pivot: &Vector3<f64>, rotation: &UnitQuaternion<f64>) {
        self.position = pivot + rotation * (self.position - pivot);
        self.orientation = rotation * self.orientation;
    }
}
