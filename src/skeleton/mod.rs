//! Skeleton module - fixed-topology anatomical segment tree.
//!
//! This module contains:
//! - [`SegmentName`] - stable identifiers with static parent/child tables
//! - [`Segment`] - per-frame position/orientation plus joint limits
//! - [`SkeletonTree`] - arena of segments indexed by name
//! - the reference T-pose template and its range-of-motion limits
//!
//! # Example
//!
//! ```
//! use rust_mocap::skeleton::{SegmentName, SkeletonTree};
//!
//! let tree = SkeletonTree::from_template();
//! let knee = &tree[SegmentName::LeftKnee];
//! assert_eq!(knee.name.parent(), Some(SegmentName::LeftHip));
//! ```

pub mod constraint;
pub mod segment;
pub mod template;
pub mod tree;

pub use constraint::{ConeLimits, JointConstraint, TwistLimits};
pub use segment::{Segment, SegmentName, Side};
pub use tree::SkeletonTree;
