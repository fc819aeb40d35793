//! Point cloud segmentation and clustering
//!
//! - Plane segmentation using RANSAC
//! - DBSCAN clustering

use crate::spatial::{NeighborSearch, PointIndex};
use dims_core::{Plane, PointCloud, Ransac, RobustConfig, RobustModel};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rand::Rng;
use tracing::debug;

/// Label assigned by [`cluster_dbscan`] to points outside every cluster.
pub const NOISE: i32 = -1;

/// Plane hypothesis from `sample_size` points: exact through three points,
/// least squares (smallest covariance eigenvector) for larger samples.
#[derive(Debug, Clone, Copy)]
pub struct PlaneModel {
    pub sample_size: usize,
}

impl Default for PlaneModel {
    fn default() -> Self {
        Self { sample_size: 3 }
    }
}

impl RobustModel<Point3<f64>> for PlaneModel {
    type Model = Plane;

    fn min_sample_size(&self) -> usize {
        self.sample_size.max(3)
    }

    fn estimate(&self, data: &[&Point3<f64>]) -> Option<Self::Model> {
        if data.len() < 3 {
            return None;
        }

        let normal = if data.len() == 3 {
            let v1 = data[1] - data[0];
            let v2 = data[2] - data[0];
            v1.cross(&v2)
        } else {
            let centroid = data.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / data.len() as f64;
            let mut cov = Matrix3::zeros();
            for p in data {
                let d = p.coords - centroid;
                cov += d * d.transpose();
            }
            let eigen = SymmetricEigen::new(cov);
            eigen.eigenvectors.column(eigen.eigenvalues.imin()).into_owned()
        };

        let normal = dims_core::normalize(&normal).ok()?;
        let d = -normal.dot(&data[0].coords);
        Some(Plane { normal, d })
    }

    fn compute_error(&self, model: &Self::Model, data: &Point3<f64>) -> f64 {
        model.distance(data)
    }
}

/// Segment a plane using RANSAC.
/// Returns the plane (unit normal, sign as fitted) and the inlier indices.
/// Plane equation: n·p + d = 0.
pub fn segment_plane<R: Rng + ?Sized>(
    pc: &PointCloud,
    distance_threshold: f64,
    ransac_n: usize,
    num_iterations: usize,
    rng: &mut R,
) -> (Option<Plane>, Vec<usize>) {
    if ransac_n < 3 || pc.len() < ransac_n {
        return (None, Vec::new());
    }

    let config = RobustConfig {
        threshold: distance_threshold,
        max_iterations: num_iterations,
        confidence: 0.99,
    };

    let model = PlaneModel {
        sample_size: ransac_n,
    };
    let res = Ransac::new(config).run(&model, &pc.points, rng);
    let inliers = res.inlier_indices();
    (res.model, inliers)
}

/// DBSCAN clustering.
/// Returns a list of labels for each point. [`NOISE`] (-1) indicates noise,
/// 0..N the cluster index. A point is a core point when at least `min_points`
/// points (itself included) lie within `eps`.
pub fn cluster_dbscan(pc: &PointCloud, eps: f64, min_points: usize) -> Vec<i32> {
    let index = PointIndex::from_cloud(pc);
    cluster_dbscan_with(&index, &pc.points, eps, min_points)
}

/// DBSCAN over any [`NeighborSearch`] built from `points`.
pub fn cluster_dbscan_with<S: NeighborSearch>(
    index: &S,
    points: &[Point3<f64>],
    eps: f64,
    min_points: usize,
) -> Vec<i32> {
    let n = points.len();
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut cluster_idx = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors = index.within_radius(&points[i], eps);
        if neighbors.len() < min_points {
            continue;
        }

        labels[i] = cluster_idx;
        // Expand cluster
        let mut seeds = neighbors;
        let mut head = 0;
        while head < seeds.len() {
            let current = seeds[head];
            head += 1;

            if labels[current] == NOISE {
                labels[current] = cluster_idx; // border point
            }
            if visited[current] {
                continue;
            }
            visited[current] = true;
            labels[current] = cluster_idx;

            let expansion = index.within_radius(&points[current], eps);
            if expansion.len() < min_points {
                continue;
            }
            for j in expansion {
                if !visited[j] {
                    seeds.push(j);
                } else if labels[j] == NOISE {
                    // Visited earlier as a non-core point.
                    labels[j] = cluster_idx;
                }
            }
        }
        cluster_idx += 1;
    }

    let clustered = labels.iter().filter(|&&l| l != NOISE).count();
    debug!(
        points = n,
        clusters = cluster_idx,
        noise = n - clustered,
        "DBSCAN"
    );
    labels
}

/// Label with the most members, `None` when every point is noise.
/// Ties go to the lowest label.
pub fn largest_cluster(labels: &[i32]) -> Option<i32> {
    let max_label = labels.iter().copied().max().filter(|&l| l >= 0)?;
    let mut counts = vec![0usize; max_label as usize + 1];
    for &l in labels.iter().filter(|&&l| l >= 0) {
        counts[l as usize] += 1;
    }
    let mut best = 0;
    for (label, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = label;
        }
    }
    Some(best as i32)
}
