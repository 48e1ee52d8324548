//! Per-frame orchestration.
//!
//! This module contains the top-level [`SkeletonSystem`] that runs the
//! localize, reconstruct, repair pipeline on each marker frame, along with
//! the [`IkApplier`] that fills occluded segments and the [`JerkTest`]
//! that bounds frame-to-frame motion of repaired limbs.

pub mod applier;
pub mod smoothing;
mod skeleton_system;

pub use applier::{IkApplier, RepairReport};
pub use skeleton_system::SkeletonSystem;
pub use smoothing::JerkTest;
