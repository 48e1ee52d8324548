//! Per-frame marker containers.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::geometry::{is_finite_vector, nan_vector};
use crate::skeleton::Side;

use super::labels::sided;

/// One captured frame as delivered by the acquisition layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFrame {
    pub index: u64,
    /// Labeled positions in meters. Dropouts are NaN.
    pub markers: Vec<(String, Vector3<f64>)>,
}

impl MarkerFrame {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            markers: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, position: Vector3<f64>) {
        self.markers.push((label.into(), position));
    }
}

/// Marker positions of the current frame keyed by label.
///
/// Lookups never fail: absent labels read as NaN.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    positions: HashMap<String, Vector3<f64>>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the markers of one actor.
    ///
    /// Labels must start with `prefix`, which is stripped. An empty prefix
    /// accepts every label.
    pub fn from_frame(frame: &MarkerFrame, prefix: &str) -> Self {
        let positions = frame
            .markers
            .iter()
            .filter_map(|(label, pos)| {
                label
                    .strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), *pos))
            })
            .collect();
        Self { positions }
    }

    pub fn get(&self, label: &str) -> Vector3<f64> {
        self.positions.get(label).copied().unwrap_or_else(nan_vector)
    }

    /// Bilateral marker lookup.
    pub fn sided(&self, side: Side, base: &str) -> Vector3<f64> {
        self.get(&sided(side, base))
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.positions.get(label).is_some_and(is_finite_vector)
    }

    pub fn insert(&mut self, label: impl Into<String>, position: Vector3<f64>) {
        self.positions.insert(label.into(), position);
    }

    pub fn remove(&mut self, label: &str) -> Option<Vector3<f64>> {
        self.positions.remove(label)
    }

    /// Number of labels with finite positions.
    pub fn present_count(&self) -> usize {
        self.positions.values().filter(|p| is_finite_vector(p)).count()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vector3<f64>)> {
        self.positions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Vector3<f64>)> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = (String, Vector3<f64>)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}
