//! Spatial indexing for proximity queries.
//!
//! Uses an R-tree over projected centroids to answer radius and nearest
//! neighbour queries. Radius queries are exact: a point exactly at the
//! radius is included.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// A projected point with its position in the source slice.
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub idx: usize,
    pub x: f64,
    pub y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over a fixed set of planar points.
///
/// Indices returned by queries refer to positions in the slice the index
/// was built from.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    points: Vec<[f64; 2]>,
}

impl SpatialIndex {
    pub fn new(points: &[[f64; 2]]) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(idx, p)| IndexedPoint {
                idx,
                x: p[0],
                y: p[1],
            })
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: usize) -> Option<[f64; 2]> {
        self.points.get(idx).copied()
    }

    /// Indices of all points within `radius` of `center`, ascending.
    pub fn within_radius(&self, center: [f64; 2], radius: f64) -> Vec<usize> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let radius_2 = radius * radius;
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(center, radius_2)
            .filter(|p| p.distance_2(&center) <= radius_2)
            .map(|p| p.idx)
            .collect();
        found.sort_unstable();
        found
    }

    /// Indices of other points within `radius` of point `idx`, ascending.
    pub fn neighbors_of(&self, idx: usize, radius: f64) -> Vec<usize> {
        match self.point(idx) {
            Some(center) => self
                .within_radius(center, radius)
                .into_iter()
                .filter(|&other| other != idx)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether any other point lies within `radius` of point `idx`.
    pub fn has_neighbor_within(&self, idx: usize, radius: f64) -> bool {
        self.nearest_excluding(idx)
            .is_some_and(|(_, distance)| distance <= radius)
    }

    /// Closest point to `center` and its distance. Ties go to the lower index.
    pub fn nearest(&self, center: [f64; 2]) -> Option<(usize, f64)> {
        self.nearest_matching(center, |_| true)
    }

    /// Closest other point to point `idx` and its distance.
    pub fn nearest_excluding(&self, idx: usize) -> Option<(usize, f64)> {
        let center = self.point(idx)?;
        self.nearest_matching(center, |other| other != idx)
    }

    fn nearest_matching<F>(&self, center: [f64; 2], accept: F) -> Option<(usize, f64)>
    where
        F: Fn(usize) -> bool,
    {
        let mut best: Option<(usize, f64)> = None;
        for (point, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&center) {
            if !accept(point.idx) {
                continue;
            }
            match best {
                None => best = Some((point.idx, distance_2)),
                Some((best_idx, best_d2)) => {
                    if distance_2 > best_d2 {
                        break;
                    }
                    if point.idx < best_idx {
                        best = Some((point.idx, distance_2));
                    }
                }
            }
        }
        best.map(|(idx, d2)| (idx, d2.sqrt()))
    }
}
