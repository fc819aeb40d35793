//! Point cloud filtering operations
//!
//! Filtering operations include:
//! - Planar (x/y) region-of-interest crop
//! - Voxel downsampling
//! - Statistical outlier removal

use crate::spatial::{NeighborSearch, PointIndex};
use dims_core::PointCloud;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

/// Axis-aligned rectangle on the first two coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl XyBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Closed rectangle test. NaN coordinates are never inside.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Open rectangle test, boundary excluded.
    pub fn contains_strict(&self, p: &Point3<f64>) -> bool {
        p.x > self.x_min && p.x < self.x_max && p.y > self.y_min && p.y < self.y_max
    }
}

/// Keep finite points whose x/y fall inside `bounds` (boundary included).
pub fn crop_xy(pc: &PointCloud, bounds: &XyBounds) -> PointCloud {
    pc.filter(|p| is_finite(p) && bounds.contains(p))
}

fn is_finite(p: &Point3<f64>) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}

/// Downsample a point cloud with a voxel grid.
/// Returns a new point cloud with one point per occupied voxel (the centroid).
/// A non-positive `voxel_size` returns the input unchanged. Non-finite points
/// are dropped.
pub fn voxel_down_sample(pc: &PointCloud, voxel_size: f64) -> PointCloud {
    if voxel_size <= 0.0 || pc.is_empty() {
        return pc.clone();
    }

    let n = pc.len();
    let inv = 1.0 / voxel_size;

    // 1. Compute indices
    let mut indices: Vec<(i64, i64, i64, usize)> = pc
        .points
        .iter()
        .enumerate()
        .filter(|(_, p)| is_finite(p))
        .map(|(i, p)| {
            (
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
                i,
            )
        })
        .collect();
    if indices.is_empty() {
        return PointCloud::default();
    }

    // 2. Sort by voxel index
    // Parallel sort if large enough, otherwise sequential
    if n > 10000 {
        indices.par_sort_unstable();
    } else {
        indices.sort_unstable();
    }

    // 3. Aggregate
    let mut new_points = Vec::new();
    let mut current_voxel = (indices[0].0, indices[0].1, indices[0].2);
    let mut sum_p = Vector3::zeros();
    let mut count = 0usize;

    for &(hx, hy, hz, idx) in &indices {
        if (hx, hy, hz) != current_voxel {
            new_points.push(Point3::from(sum_p / count as f64));
            current_voxel = (hx, hy, hz);
            sum_p = Vector3::zeros();
            count = 0;
        }
        sum_p += pc.points[idx].coords;
        count += 1;
    }

    // Push last voxel
    if count > 0 {
        new_points.push(Point3::from(sum_p / count as f64));
    }

    debug!(input = n, voxels = new_points.len(), voxel_size, "Voxel downsampling");
    PointCloud::new(new_points)
}

/// Remove statistical outliers.
/// Compute mean distance to `k` neighbors for each point.
/// Points with mean distance > global_mean + std_ratio * std_dev are removed.
///
/// Returns the filtered cloud and the kept indices. Clouds with at most `k`
/// points (or `k == 0`) are returned unchanged.
pub fn remove_statistical_outliers(
    pc: &PointCloud,
    k: usize,
    std_ratio: f64,
) -> (PointCloud, Vec<usize>) {
    if k == 0 || pc.len() <= k {
        return (pc.clone(), (0..pc.len()).collect());
    }

    let index = PointIndex::from_cloud(pc);

    let distances: Vec<f64> = pc
        .points
        .par_iter()
        .map(|p| {
            // The nearest hit is the point itself (distance 0), skip it.
            let neighbors = index.k_nearest(p, k + 1);
            let dists: Vec<f64> = neighbors.iter().skip(1).map(|&(_, d)| d).collect();
            crate::mean(&dists).unwrap_or(0.0)
        })
        .collect();

    let mean_dist = crate::mean(&distances).unwrap_or(0.0);
    let std_dev = crate::std(&distances).unwrap_or(0.0);
    let threshold = mean_dist + std_ratio * std_dev;

    let inliers: Vec<usize> = distances
        .iter()
        .enumerate()
        .filter(|(_, &d)| d <= threshold)
        .map(|(i, _)| i)
        .collect();
    let points = inliers.iter().map(|&i| pc.points[i]).collect();
    debug!(
        input = pc.len(),
        removed = pc.len() - inliers.len(),
        threshold,
        "Statistical outlier removal"
    );

    (PointCloud::new(points), inliers)
}
