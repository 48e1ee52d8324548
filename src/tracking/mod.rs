//! Frame-to-frame tracking: virtual marker reconstruction and per-frame
//! results.
//!
//! - [`MarkerTracker`] - rigid cluster snapshots that fill in occluded markers
//! - [`PoseState`] - how a frame's skeleton was obtained
//! - [`FrameResult`] - counts and timings for one processed frame

pub mod marker_tracker;
pub mod result;
pub mod state;

pub use marker_tracker::{MarkerTracker, TrackedCluster};
pub use result::{FrameMetrics, FrameResult, TimingStats};
pub use state::PoseState;
