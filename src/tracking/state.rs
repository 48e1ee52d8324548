//! Per-frame skeleton state.

/// How the skeleton for a frame was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoseState {
    /// No frame with a localized root has been seen yet.
    #[default]
    NotInitialized,
    /// Every segment was localized directly from markers.
    Tracked,
    /// Some segments were filled in by reconstruction or IK.
    Repaired,
    /// The root could not be localized; the frame holds no pose.
    Lost,
}

impl PoseState {
    /// Whether the frame carries a usable pose.
    pub fn has_pose(self) -> bool {
        matches!(self, PoseState::Tracked | PoseState::Repaired)
    }
}
