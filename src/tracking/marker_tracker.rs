//! Virtual marker reconstruction from rigid marker clusters.
//!
//! Each tracked segment owns a cluster of 3-4 markers that move rigidly
//! with it. Whenever the whole cluster is visible its world positions are
//! snapshotted together with the segment's solved position (the synthetic
//! origin). On a later frame with some markers occluded but at least two
//! visible, a local frame is built from three reference points in both the
//! snapshot and the current frame, and each occluded marker's snapshot
//! position is carried rigidly into the current frame.

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::geometry::is_finite_vector;
use crate::geometry::rotation::DIRECTION_EPSILON;
use crate::localization::labels::*;
use crate::localization::MarkerSet;
use crate::skeleton::{SegmentName, Side, SkeletonTree};

/// Rigid snapshot of a fully visible cluster.
#[derive(Debug, Clone, PartialEq)]
struct ClusterSnapshot {
    markers: Vec<Vector3<f64>>,
    origin: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedCluster {
    pub segment: SegmentName,
    pub labels: Vec<String>,
    snapshot: Option<ClusterSnapshot>,
    /// The segment's position after the last completed frame.
    last_solved: Option<Vector3<f64>>,
}

impl TrackedCluster {
    pub fn new(segment: SegmentName, labels: Vec<String>) -> Self {
        Self {
            segment,
            labels,
            snapshot: None,
            last_solved: None,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Fills in occluded markers of this cluster. Returns how many were
    /// written.
    fn reconstruct(&self, markers: &mut MarkerSet) -> usize {
        let Some(snapshot) = &self.snapshot else {
            return 0;
        };
        let present: Vec<usize> = (0..self.labels.len())
            .filter(|&i| markers.is_present(&self.labels[i]))
            .collect();
        if present.len() < 2 || present.len() == self.labels.len() {
            return 0;
        }

        let (a, b) = (present[0], present[1]);
        let (snap_c, cur_c) = match present.get(2) {
            Some(&c) => (snapshot.markers[c], markers.get(&self.labels[c])),
            None => match self.last_solved {
                Some(origin) => (snapshot.origin, origin),
                None => return 0,
            },
        };
        let snap_a = snapshot.markers[a];
        let cur_a = markers.get(&self.labels[a]);
        let Some(snap_frame) = rigid_frame(&snap_a, &snapshot.markers[b], &snap_c) else {
            return 0;
        };
        let Some(cur_frame) = rigid_frame(&cur_a, &markers.get(&self.labels[b]), &cur_c) else {
            return 0;
        };

        let mut written = 0;
        for i in 0..self.labels.len() {
            if present.contains(&i) {
                continue;
            }
            let local = snap_frame.transpose() * (snapshot.markers[i] - snap_a);
            markers.insert(self.labels[i].clone(), cur_a + cur_frame * local);
            written += 1;
        }
        written
    }

    fn record(&mut self, markers: &MarkerSet, tree: &SkeletonTree) {
        let origin = tree[self.segment].position;
        if is_finite_vector(&origin) {
            self.last_solved = Some(origin);
        }
        if !self.labels.iter().all(|l| markers.is_present(l)) || !is_finite_vector(&origin) {
            return;
        }
        self.snapshot = Some(ClusterSnapshot {
            markers: self.labels.iter().map(|l| markers.get(l)).collect(),
            origin,
        });
    }
}

/// Orthonormal frame with X along `a → b`, Y towards `c`.
fn rigid_frame(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> Option<Matrix3<f64>> {
    if !is_finite_vector(a) || !is_finite_vector(b) || !is_finite_vector(c) {
        return None;
    }
    let x = (b - a).try_normalize(DIRECTION_EPSILON)?;
    let toward = c - a;
    let y = (toward - x * toward.dot(&x)).try_normalize(DIRECTION_EPSILON)?;
    let z = x.cross(&y);
    Some(Matrix3::from_columns(&[x, y, z]))
}

/// Owns one cluster per tracked segment.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerTracker {
    clusters: Vec<TrackedCluster>,
}

impl MarkerTracker {
    pub fn new(clusters: Vec<TrackedCluster>) -> Self {
        Self { clusters }
    }

    /// Clusters for the standard marker set.
    pub fn standard() -> Self {
        let owned = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut clusters = vec![
            TrackedCluster::new(SegmentName::Pelvis, owned(&[LASI, RASI, LPSI, RPSI])),
            TrackedCluster::new(SegmentName::SpineUpper, owned(&[C7, CLAV, STRN, T10])),
            TrackedCluster::new(SegmentName::Head, owned(&[LFHD, RFHD, LBHD, RBHD])),
        ];
        for side in [Side::Left, Side::Right] {
            let sided_cluster = |segment: SegmentName, bases: &[&str]| {
                TrackedCluster::new(segment, bases.iter().map(|b| sided(side, b)).collect())
            };
            let (knee, ankle, foot, elbow, wrist, hand) = match side {
                Side::Left => (
                    SegmentName::LeftKnee,
                    SegmentName::LeftAnkle,
                    SegmentName::LeftFootBase,
                    SegmentName::LeftElbow,
                    SegmentName::LeftWrist,
                    SegmentName::LeftHand,
                ),
                Side::Right => (
                    SegmentName::RightKnee,
                    SegmentName::RightAnkle,
                    SegmentName::RightFootBase,
                    SegmentName::RightElbow,
                    SegmentName::RightWrist,
                    SegmentName::RightHand,
                ),
            };
            clusters.push(sided_cluster(knee, &[THI, KNE, KNM]));
            clusters.push(sided_cluster(ankle, &[ANK, MED, TIB]));
            clusters.push(sided_cluster(foot, &[HEE, TOE, ANK]));
            clusters.push(sided_cluster(elbow, &[UPA, ELB, ELM]));
            clusters.push(sided_cluster(wrist, &[FRM, WRA, WRB]));
            clusters.push(sided_cluster(hand, &[FIN, THM, IDX]));
        }
        Self::new(clusters)
    }

    pub fn clusters(&self) -> &[TrackedCluster] {
        &self.clusters
    }

    /// Writes reconstructed positions for occluded markers into `markers`.
    /// Returns the number of markers reconstructed.
    pub fn reconstruct(&self, markers: &mut MarkerSet) -> usize {
        let total: usize = self.clusters.iter().map(|c| c.reconstruct(markers)).sum();
        if total > 0 {
            debug!(reconstructed = total, "Virtual markers reconstructed");
        }
        total
    }

    /// Refreshes snapshots from this frame's observed markers and the
    /// completed skeleton.
    pub fn record(&mut self, markers: &MarkerSet, tree: &SkeletonTree) {
        for cluster in &mut self.clusters {
            cluster.record(markers, tree);
        }
    }
}

impl Default for MarkerTracker {
    fn default() -> Self {
        Self::standard()
    }
}
