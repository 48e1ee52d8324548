//! Per-frame memo of derived body frames.

use nalgebra::UnitQuaternion;

use crate::geometry::is_finite_rotation;

use super::frames::ChestTier;

/// Frames computed at most once per localization pass. `None` means "not
/// computed yet"; a computed-but-missing frame is `Some(NaN)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameScratch {
    pub hip: Option<UnitQuaternion<f64>>,
    pub chest: Option<UnitQuaternion<f64>>,
    pub chest_tier: Option<ChestTier>,
    pub head: Option<UnitQuaternion<f64>>,
}

impl FrameScratch {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Last finite body frames, used as fallbacks on later frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameHistory {
    pub hip: Option<UnitQuaternion<f64>>,
    pub chest: Option<UnitQuaternion<f64>>,
}

impl FrameHistory {
    /// Keeps the finite frames of a finished pass.
    pub fn commit(&mut self, scratch: &FrameScratch) {
        if let Some(hip) = scratch.hip.filter(is_finite_rotation) {
            self.hip = Some(hip);
        }
        if let Some(chest) = scratch.chest.filter(is_finite_rotation) {
            self.chest = Some(chest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::nan_rotation;

    #[test]
    fn test_commit_skips_missing_frames() {
        let mut history = FrameHistory::default();
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        history.commit(&FrameScratch {
            hip: Some(q),
            chest: Some(q),
            ..Default::default()
        });
        history.commit(&FrameScratch {
            hip: Some(nan_rotation()),
            chest: None,
            ..Default::default()
        });
        assert_eq!(history.hip, Some(q));
        assert_eq!(history.chest, Some(q));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut scratch = FrameScratch {
            hip: Some(UnitQuaternion::identity()),
            chest_tier: Some(ChestTier::Shoulders),
            ..Default::default()
        };
        scratch.reset();
        assert!(scratch.hip.is_none());
        assert!(scratch.chest_tier.is_none());
    }
}
