//! Running estimates of the subject's body measurements.
//!
//! The shoulder and hip regressions need height, mass, shoulder width and
//! chest depth. Each starts at a population default and is refined from
//! marker distances on frames where the relevant markers are visible.

use tracing::info;

use crate::config::BodyConfig;
use crate::skeleton::{SegmentName, Side, SkeletonTree};

use super::labels::{C7, CLAV, SHO};
use super::markers::MarkerSet;

pub const DEFAULT_HEIGHT_CM: f64 = 175.0;
pub const DEFAULT_SHOULDER_WIDTH: f64 = 0.40;
pub const DEFAULT_CHEST_DEPTH: f64 = 0.20;

/// Estimates at or above this are rejected as marker noise.
pub const MAX_HEIGHT_CM: f64 = 250.0;
pub const BMI: f64 = 22.5;

/// Floor to ankle joint and head joint to crown, added to the summed bone
/// lengths (meters).
const ANKLE_HEIGHT: f64 = 0.08;
const HEAD_TOP: f64 = 0.10;

/// Cap on sample weight so long captures keep adapting.
const MAX_WEIGHT: f64 = 200.0;

/// Weighted mean that starts from a seed counted as one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningAverage {
    value: f64,
    weight: f64,
}

impl RunningAverage {
    pub fn seeded(value: f64) -> Self {
        Self { value, weight: 1.0 }
    }

    /// Folds in a sample. Non-finite samples are ignored.
    pub fn add(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        self.value = (self.value * self.weight + sample) / (self.weight + 1.0);
        self.weight = (self.weight + 1.0).min(MAX_WEIGHT);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyMetrics {
    height_cm: f64,
    /// Set once the height came from a hint or a full skeleton measurement.
    height_locked: bool,
    mass_override: Option<f64>,
    shoulder_width: RunningAverage,
    chest_depth: RunningAverage,
}

impl BodyMetrics {
    pub fn new(hints: &BodyConfig) -> Self {
        let height_hint = (hints.height_cm > 0).then_some(f64::from(hints.height_cm));
        Self {
            height_cm: height_hint.unwrap_or(DEFAULT_HEIGHT_CM),
            height_locked: height_hint.is_some(),
            mass_override: (hints.mass_kg > 0).then_some(f64::from(hints.mass_kg)),
            shoulder_width: RunningAverage::seeded(DEFAULT_SHOULDER_WIDTH),
            chest_depth: RunningAverage::seeded(DEFAULT_CHEST_DEPTH),
        }
    }

    /// Height in centimeters.
    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    /// Mass in kilograms: the override, or derived from height at a fixed BMI.
    pub fn mass_kg(&self) -> f64 {
        self.mass_override.unwrap_or_else(|| {
            let h = self.height_cm / 100.0;
            BMI * h * h
        })
    }

    /// Acromion-to-acromion distance (meters).
    pub fn shoulder_width(&self) -> f64 {
        self.shoulder_width.value()
    }

    /// CLAV-to-C7 distance (meters).
    pub fn chest_depth(&self) -> f64 {
        self.chest_depth.value()
    }

    pub fn is_height_locked(&self) -> bool {
        self.height_locked
    }

    /// Applies external overrides. Zero fields leave the estimate alone.
    pub fn apply_hints(&mut self, hints: &BodyConfig) {
        if hints.height_cm > 0 {
            self.height_cm = f64::from(hints.height_cm);
            self.height_locked = true;
        }
        if hints.mass_kg > 0 {
            self.mass_override = Some(f64::from(hints.mass_kg));
        }
    }

    /// Refines the marker-based measurements from this frame.
    pub fn observe_markers(&mut self, markers: &MarkerSet) {
        let width = (markers.sided(Side::Right, SHO) - markers.sided(Side::Left, SHO)).norm();
        self.shoulder_width.add(width);
        let depth = (markers.get(CLAV) - markers.get(C7)).norm();
        self.chest_depth.add(depth);
    }

    /// Measures height from a localized skeleton, once.
    pub fn observe_skeleton(&mut self, tree: &SkeletonTree) {
        if self.height_locked {
            return;
        }
        let Some(height) = estimate_height_cm(tree) else {
            return;
        };
        if height < MAX_HEIGHT_CM {
            self.height_cm = height;
            self.height_locked = true;
            info!(
                height_cm = height,
                mass_kg = self.mass_kg(),
                "Body height estimated"
            );
        }
    }
}

impl Default for BodyMetrics {
    fn default() -> Self {
        Self::new(&BodyConfig::default())
    }
}

/// Height from ankle to head along the left leg and spine, or `None` when
/// any of those joints is missing.
pub fn estimate_height_cm(tree: &SkeletonTree) -> Option<f64> {
    use SegmentName::*;
    const BONES: [SegmentName; 8] = [
        LeftAnkle, LeftKnee, LeftHip, SpineLower, SpineMiddle, SpineUpper, Neck, Head,
    ];
    let bones: f64 = BONES.iter().map(|n| tree.segment_length(*n)).sum();
    bones
        .is_finite()
        .then(|| (bones + ANKLE_HEIGHT + HEAD_TOP) * 100.0)
}
