//! SkeletonTree - arena of segments with fixed anatomical topology.
//!
//! Segments are stored in a flat `Vec` indexed by [`SegmentName`]. Parent and
//! child relations are static tables on `SegmentName`, so the tree holds no
//! references between segments and can be swapped or cloned freely.

use std::ops::{Index, IndexMut};

use nalgebra::{UnitQuaternion, Vector3};

use super::segment::{Segment, SegmentName};
use super::template::template_segments;

#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonTree {
    segments: Vec<Segment>,
}

impl SkeletonTree {
    /// Build a tree in the reference T-pose.
    pub fn from_template() -> Self {
        Self::from_segments(template_segments())
    }

    /// Build a tree from one segment per name, in `SegmentName::ALL` order.
    ///
    /// Panics if the list does not match the template layout.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        assert_eq!(
            segments.len(),
            SegmentName::COUNT,
            "skeleton needs exactly one segment per template joint"
        );
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(
                seg.name.index(),
                i,
                "segment {} stored out of order",
                seg.name
            );
        }
        Self { segments }
    }

    pub fn root(&self) -> &Segment {
        &self[SegmentName::ROOT]
    }

    /// Depth-first search from the root.
    pub fn find(&self, name: SegmentName) -> Option<&Segment> {
        self.depth_first().find(|seg| seg.name == name)
    }

    #[inline]
    pub fn get(&self, name: SegmentName) -> &Segment {
        &self.segments[name.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, name: SegmentName) -> &mut Segment {
        &mut self.segments[name.index()]
    }

    /// Replaces a segment wholesale. The stored name must match.
    pub fn set(&mut self, name: SegmentName, segment: Segment) {
        assert_eq!(name, segment.name, "segment stored under another name");
        let slot = &mut self.segments[name.index()];
        assert_eq!(slot.name, name);
        *slot = segment;
    }

    /// Overwrites geometry only, keeping constraints and parent offsets.
    pub fn set_pose(
        &mut self,
        name: SegmentName,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) {
        let seg = self.get_mut(name);
        seg.position = position;
        seg.orientation = orientation;
    }

    pub fn parent_of(&self, name: SegmentName) -> Option<&Segment> {
        name.parent().map(|p| self.get(p))
    }

    /// Segments in storage order (which is the template depth-first order).
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Depth-first traversal following the fixed child order.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![SegmentName::ROOT],
        }
    }

    /// All segments below `name`, depth-first, excluding `name` itself.
    pub fn descendants(name: SegmentName) -> Vec<SegmentName> {
        let mut out = Vec::new();
        let mut stack: Vec<SegmentName> = name.children().iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(next.children().iter().rev().copied());
        }
        out
    }

    /// Clears all geometry to NaN ahead of a new frame.
    pub fn mark_all_missing(&mut self) {
        for seg in &mut self.segments {
            seg.invalidate();
        }
    }

    /// Sets every `exists` flag from the finiteness of its geometry.
    pub fn refresh_exists(&mut self) {
        for seg in &mut self.segments {
            seg.exists = seg.has_data();
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = SegmentName> + '_ {
        self.segments.iter().filter(|s| !s.exists).map(|s| s.name)
    }

    /// Distance between two joints (NaN if either is missing).
    pub fn distance(&self, a: SegmentName, b: SegmentName) -> f64 {
        (self[a].position - self[b].position).norm()
    }

    /// Length of the bone ending at `name`: distance to its parent joint.
    /// NaN for the root or when either joint is missing.
    pub fn segment_length(&self, name: SegmentName) -> f64 {
        match name.parent() {
            Some(parent) => self.distance(parent, name),
            None => f64::NAN,
        }
    }

    /// Rotates `name` and everything below it about `pivot`.
    pub fn rotate_subtree(
        &mut self,
        name: SegmentName,
        pivot: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) {
        self.get_mut(name).rotate_about(pivot, rotation);
        for child in Self::descendants(name) {
            self.get_mut(child).rotate_about(pivot, rotation);
        }
    }
}

impl Default for SkeletonTree {
    fn default() -> Self {
        Self::from_template()
    }
}

impl Index<SegmentName> for SkeletonTree {
    type Output = Segment;

    fn index(&self, name: SegmentName) -> &Segment {
        self.get(name)
    }
}

impl IndexMut<SegmentName> for SkeletonTree {
    fn index_mut(&mut self, name: SegmentName) -> &mut Segment {
        self.get_mut(name)
    }
}

/// Iterator returned by [`SkeletonTree::depth_first`].
pub struct DepthFirst<'a> {
    tree: &'a SkeletonTree,
    stack: Vec<SegmentName>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.stack.pop()?;
        self.stack.extend(name.children().iter().rev().copied());
        Some(self.tree.get(name))
    }
}
