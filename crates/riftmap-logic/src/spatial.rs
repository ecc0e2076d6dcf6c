//! Broad-phase spatial indices.
//!
//! Two R-tree wrappers: [`ShapeIndex`] stores bounding boxes of extended
//! shapes (accepted rift collision hulls) and answers "what overlaps this
//! box"; [`PointIndex`] stores signal positions and answers radius and
//! nearest-neighbor queries. Query results are always returned in a stable
//! order so callers stay deterministic regardless of tree layout.

use crate::geometry::{Aabb, Point};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

fn envelope(bb: &Aabb) -> AABB<[f64; 2]> {
    AABB::from_corners(bb.min.as_array(), bb.max.as_array())
}

/// Bounding-box index over shapes keyed by `T`.
pub struct ShapeIndex<T> {
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, T>>,
}

impl<T: Copy + Ord> ShapeIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, bounds: Aabb, key: T) {
        let rect = Rectangle::from_corners(bounds.min.as_array(), bounds.max.as_array());
        self.tree.insert(GeomWithData::new(rect, key));
    }

    /// Keys of every shape whose box overlaps `bounds`, sorted.
    pub fn overlapping(&self, bounds: &Aabb) -> Vec<T> {
        let mut keys: Vec<T> = self
            .tree
            .locate_in_envelope_intersecting(&envelope(bounds))
            .map(|entry| entry.data)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl<T: Copy + Ord> Default for ShapeIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Point index keyed by `T`.
pub struct PointIndex<T> {
    tree: RTree<GeomWithData<[f64; 2], T>>,
}

impl<T: Copy + Ord> PointIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, pos: Point, key: T) {
        self.tree.insert(GeomWithData::new(pos.as_array(), key));
    }

    /// Remove the entry for `key` at `pos`. Returns false if it was absent.
    pub fn remove(&mut self, pos: Point, key: T) -> bool {
        self.tree
            .remove(&GeomWithData::new(pos.as_array(), key))
            .is_some()
    }

    /// Entries within `radius` of `center`, closest first (ties by key).
    pub fn within(&self, center: Point, radius: f64) -> Vec<(T, f64)> {
        let mut found: Vec<(T, f64)> = self
            .tree
            .locate_within_distance(center.as_array(), radius * radius)
            .map(|entry| {
                let g = entry.geom();
                (entry.data, center.distance(Point::new(g[0], g[1])))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found
    }

    /// Up to `n` nearest entries no farther than `max_distance`.
    pub fn nearest(&self, center: Point, n: usize, max_distance: f64) -> Vec<(T, f64)> {
        let mut found = Vec::with_capacity(n);
        for entry in self.tree.nearest_neighbor_iter(&center.as_array()) {
            let g = entry.geom();
            let d = center.distance(Point::new(g[0], g[1]));
            if d > max_distance || found.len() >= n {
                break;
            }
            found.push((entry.data, d));
        }
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found
    }

    /// True if any entry lies strictly closer than `radius` to `center`.
    pub fn any_within(&self, center: Point, radius: f64) -> bool {
        self.tree
            .locate_within_distance(center.as_array(), radius * radius)
            .any(|entry| {
                let g = entry.geom();
                center.distance(Point::new(g[0], g[1])) < radius
            })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl<T: Copy + Ord> Default for PointIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
