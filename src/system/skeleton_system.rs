//! Skeleton system - the per-frame pipeline.
//!
//! `SkeletonSystem` is the entry point callers feed marker frames into. It
//! owns the localizer, the marker tracker, the IK applier and the two
//! skeleton buffers. Each frame runs synchronously:
//!
//! 1. swap buffers, clear the current tree
//! 2. filter markers by body prefix
//! 3. localize segments
//! 4. reconstruct occluded markers and localize again if any were filled in
//! 5. update body metrics
//! 6. repair what is still missing
//! 7. refresh tracker snapshots and body-frame history

use std::time::Instant;

use tracing::{info, warn};

use crate::config::{BodyConfig, Config};
use crate::localization::{BodyMetrics, MarkerFrame, MarkerSet, SegmentLocalizer};
use crate::skeleton::{SegmentName, SkeletonTree};
use crate::tracking::{FrameMetrics, FrameResult, MarkerTracker, PoseState, TimingStats};

use super::applier::{IkApplier, RepairReport};

pub struct SkeletonSystem {
    config: Config,
    localizer: SegmentLocalizer,
    tracker: MarkerTracker,
    applier: IkApplier,

    /// Tree being built for the current frame.
    current: SkeletonTree,
    /// Last completed frame, read-only while the current one is solved.
    previous: SkeletonTree,

    state: PoseState,
    frame_count: usize,
}

impl SkeletonSystem {
    pub fn new(config: Config) -> Self {
        let metrics = BodyMetrics::new(&config.body);
        let localizer = SegmentLocalizer::new(config.localization, metrics);
        let applier = IkApplier::new(&config);

        let mut current = SkeletonTree::from_template();
        current.mark_all_missing();
        let previous = current.clone();

        Self {
            config,
            localizer,
            tracker: MarkerTracker::standard(),
            applier,
            current,
            previous,
            state: PoseState::NotInitialized,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The skeleton of the last processed frame.
    pub fn skeleton(&self) -> &SkeletonTree {
        &self.current
    }

    pub fn state(&self) -> PoseState {
        self.state
    }

    pub fn metrics(&self) -> &BodyMetrics {
        self.localizer.metrics()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Applies externally known height/mass. Zero fields keep estimating.
    pub fn set_body_hints(&mut self, hints: BodyConfig) {
        self.config.body = hints;
        self.localizer.metrics_mut().apply_hints(&hints);
    }

    /// Runs the full pipeline on one frame.
    pub fn process_frame(&mut self, frame: &MarkerFrame) -> FrameResult {
        let start = Instant::now();
        let mut timing = TimingStats::zero();

        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.mark_all_missing();

        let mut markers = MarkerSet::from_frame(frame, &self.config.pipeline.body_prefix);
        let observed = markers.clone();
        let mut metrics = FrameMetrics {
            markers_observed: markers.present_count(),
            ..FrameMetrics::default()
        };

        let t = Instant::now();
        self.localizer.localize(&markers, &mut self.current);
        timing.localize_ms = elapsed_ms(t);

        if self.config.pipeline.reconstruction_enabled {
            let t = Instant::now();
            metrics.markers_reconstructed = self.tracker.reconstruct(&mut markers);
            if metrics.markers_reconstructed > 0 {
                self.localizer.localize(&markers, &mut self.current);
            }
            timing.reconstruct_ms = elapsed_ms(t);
        }

        let missing_after_localization: Vec<SegmentName> = self.current.missing().collect();
        self.localizer.update_metrics(&markers, &self.current);

        let root_found = self.current.root().exists;
        let report = if root_found && self.config.pipeline.ik_enabled {
            let t = Instant::now();
            let report = self.applier.repair(&mut self.current, &self.previous);
            timing.repair_ms = elapsed_ms(t);
            report
        } else {
            RepairReport::default()
        };
        metrics.segments_repaired = report.repaired.len();
        metrics.chains_solved = report.chains_solved;
        metrics.chains_failed = report.chains_failed;
        metrics.height_cm = self.localizer.metrics().height_cm();

        if self.config.pipeline.reconstruction_enabled {
            self.tracker.record(&observed, &self.current);
        }
        self.localizer.end_frame();

        let state = if !root_found {
            warn!(frame = frame.index, "Root segment could not be localized");
            PoseState::Lost
        } else if missing_after_localization.is_empty() && metrics.markers_reconstructed == 0 {
            PoseState::Tracked
        } else {
            PoseState::Repaired
        };
        if state.has_pose() && !self.state.has_pose() {
            info!(
                frame = frame.index,
                markers = metrics.markers_observed,
                "Skeleton acquired"
            );
        }
        self.state = state;
        self.frame_count += 1;

        timing.total_ms = elapsed_ms(start);
        FrameResult {
            index: frame.index,
            state,
            metrics,
            timing,
            missing_after_localization,
            unresolved: self.current.missing().collect(),
        }
    }
}

impl Default for SkeletonSystem {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
