//! Segment localization - marker dictionary to segment geometry.
//!
//! This module contains:
//! - [`MarkerFrame`] / [`MarkerSet`] - incoming marker data, NaN for dropouts
//! - body frames for pelvis, thorax and head with partial-coverage fallbacks
//! - regression joint centers (Harrington hip, Campbell shoulder, knee/ankle)
//! - [`BodyMetrics`] - running body measurement estimates
//! - [`SegmentLocalizer`] - the per-frame rule set filling a skeleton

pub mod frames;
pub mod joints;
pub mod labels;
pub mod localizer;
pub mod markers;
pub mod metrics;
pub mod scratch;

pub use frames::ChestTier;
pub use localizer::SegmentLocalizer;
pub use markers::{MarkerFrame, MarkerSet};
pub use metrics::BodyMetrics;
