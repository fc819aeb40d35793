//! Spatial queries over a point set.
//!
//! Algorithms that need neighborhoods (outlier removal, clustering) take a
//! [`NeighborSearch`] so the backing index can be swapped without touching them.

use dims_core::PointCloud;
use nalgebra::Point3;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// k-nearest and fixed-radius neighbor queries.
///
/// Indices refer to positions in the point set the index was built from. A
/// query point that is itself part of the set is returned as its own neighbor.
pub trait NeighborSearch {
    /// Up to `k` nearest points as `(index, distance)`, closest first.
    fn k_nearest(&self, query: &Point3<f64>, k: usize) -> Vec<(usize, f64)>;

    /// Indices of all points with distance `<= radius`.
    fn within_radius(&self, query: &Point3<f64>, radius: f64) -> Vec<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Wrapper for RTree
struct IndexedPoint(usize, [f64; 3]);

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.1)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.1[0] - point[0];
        let dy = self.1[1] - point[1];
        let dz = self.1[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// R*-tree backed [`NeighborSearch`].
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl PointIndex {
    pub fn new(points: &[Point3<f64>]) -> Self {
        let wrappers: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint(i, [p.x, p.y, p.z]))
            .collect();
        Self {
            tree: RTree::bulk_load(wrappers),
            len: points.len(),
        }
    }

    pub fn from_cloud(cloud: &PointCloud) -> Self {
        Self::new(&cloud.points)
    }
}

impl NeighborSearch for PointIndex {
    fn k_nearest(&self, query: &Point3<f64>, k: usize) -> Vec<(usize, f64)> {
        let q = [query.x, query.y, query.z];
        self.tree
            .nearest_neighbor_iter_with_distance_2(&q)
            .take(k)
            .map(|(p, d2)| (p.0, d2.sqrt()))
            .collect()
    }

    fn within_radius(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        let q = [query.x, query.y, query.z];
        // locate_within_distance uses squared distance
        self.tree
            .locate_within_distance(q, radius * radius)
            .map(|p| p.0)
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_k_nearest_sorted_and_includes_self() {
        let index = PointIndex::new(&line(10));
        let nn = index.k_nearest(&Point3::new(4.0, 0.0, 0.0), 3);
        assert_eq!(nn.len(), 3);
        assert_eq!(nn[0], (4, 0.0));
        assert!(nn[1].1 <= nn[2].1);
        assert!((nn[2].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_set() {
        let index = PointIndex::new(&line(3));
        assert_eq!(index.k_nearest(&Point3::origin(), 10).len(), 3);
    }

    #[test]
    fn test_radius_is_inclusive() {
        let index = PointIndex::new(&line(10));
        let mut hits = index.within_radius(&Point3::new(5.0, 0.0, 0.0), 1.0);
        hits.sort_unstable();
        assert_eq!(hits, vec![4, 5, 6]);
        assert_eq!(index.len(), 10);
        assert!(!index.is_empty());
    }
}
