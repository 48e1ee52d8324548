//! Jerk test: bounds how far a repaired limb may move between frames.

use crate::config::SmoothingConfig;
use crate::geometry::{is_finite_rotation, rotation_between, rotation_distance, slerp_or_nlerp};
use crate::ik::chain::rotate_chain_from;
use crate::skeleton::{Segment, SkeletonTree};

/// Slack on the displacement cap before the hard clamp kicks in.
const CLAMP_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JerkTest {
    pub max_displacement: f64,
    pub max_rotation_distance: f64,
}

impl JerkTest {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            max_displacement: config.max_displacement,
            max_rotation_distance: config.max_rotation_distance,
        }
    }

    /// Smooths `chain[1..]` against the previous frame. `chain[0]` is the
    /// fixed chain root; only its orientation may change.
    ///
    /// A joint that moved further than `max_displacement` is swung back by
    /// rotating its parent towards the capped position, then clamped onto
    /// it. A non-leaf joint whose orientation changed by more than
    /// `max_rotation_distance` keeps only part of that change.
    ///
    /// Returns the number of segments adjusted.
    pub fn apply(&self, chain: &mut [Segment], previous: &SkeletonTree) -> usize {
        let mut adjusted = 0;
        for i in 1..chain.len() {
            let before = &previous[chain[i].name];
            if !before.has_data() || !chain[i].has_data() {
                continue;
            }
            let mut touched = false;

            let displacement = chain[i].position - before.position;
            let moved = displacement.norm();
            if moved > self.max_displacement {
                let capped = before.position + displacement * (self.max_displacement / moved);
                let pivot = chain[i - 1].position;
                let swing = rotation_between(&(chain[i].position - pivot), &(capped - pivot));
                if is_finite_rotation(&swing) {
                    chain[i - 1].orientation = swing * chain[i - 1].orientation;
                    rotate_chain_from(chain, i, &pivot, &swing);
                }
                if (chain[i].position - before.position).norm()
                    > self.max_displacement + CLAMP_TOLERANCE
                {
                    chain[i].position = capped;
                }
                touched = true;
            }

            if !chain[i].name.is_leaf() {
                let distance = rotation_distance(&before.orientation, &chain[i].orientation);
                if distance > self.max_rotation_distance {
                    let t = self.max_rotation_distance / distance;
                    chain[i].orientation =
                        slerp_or_nlerp(&before.orientation, &chain[i].orientation, t);
                    touched = true;
                }
            }

            if touched {
                adjusted += 1;
            }
        }
        adjusted
    }
}

impl Default for JerkTest {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}
