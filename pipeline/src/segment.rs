//! Object isolation in the table frame.

use crate::config::DimsConfig;
use dims_core::PointCloud;
use dims_point_cloud::{cluster_dbscan, largest_cluster, XyBounds};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ObjectSegmenter {
    pub h_min: f64,
    pub h_max: f64,
    pub roi: XyBounds,
    pub use_dbscan: bool,
    pub dbscan_eps: f64,
    pub dbscan_min_points: usize,
}

impl ObjectSegmenter {
    pub fn from_config(cfg: &DimsConfig) -> Self {
        Self {
            h_min: cfg.h_min,
            h_max: cfg.h_max,
            roi: XyBounds::new(cfg.roi_x_min, cfg.roi_x_max, cfg.roi_y_min, cfg.roi_y_max),
            use_dbscan: cfg.use_dbscan,
            dbscan_eps: cfg.dbscan_eps,
            dbscan_min_points: cfg.dbscan_min_points,
        }
    }

    /// Keep the object from points already expressed in the table frame.
    ///
    /// Height band and ROI are both open intervals. With clustering enabled
    /// the largest cluster is kept; if clustering finds nothing the filtered
    /// set is returned as is.
    pub fn extract(&self, table_pts: &PointCloud) -> PointCloud {
        let filtered =
            table_pts.filter(|p| p.z > self.h_min && p.z < self.h_max && self.roi.contains_strict(p));

        if !self.use_dbscan || filtered.is_empty() {
            return filtered;
        }

        let labels = cluster_dbscan(&filtered, self.dbscan_eps, self.dbscan_min_points);
        let Some(best) = largest_cluster(&labels) else {
            debug!(points = filtered.len(), "No cluster found, keeping filtered points");
            return filtered;
        };

        let mask: Vec<bool> = labels.iter().map(|&l| l == best).collect();
        let object: PointCloud = filtered
            .iter()
            .zip(&mask)
            .filter(|(_, &keep)| keep)
            .map(|(p, _)| *p)
            .collect();
        debug!(
            filtered = filtered.len(),
            object = object.len(),
            label = best,
            "Kept largest cluster"
        );
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn blob(cx: f64, cy: f64, side: usize, step: f64, z: f64) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in 0..side {
            for j in 0..side {
                points.push(Point3::new(cx + i as f64 * step, cy + j as f64 * step, z));
            }
        }
        points
    }

    fn segmenter() -> ObjectSegmenter {
        ObjectSegmenter {
            h_min: 0.003,
            h_max: 1.0,
            roi: XyBounds::new(-0.4, 0.4, -0.3, 0.3),
            use_dbscan: true,
            dbscan_eps: 0.01,
            dbscan_min_points: 5,
        }
    }

    #[test]
    fn test_height_band_and_roi_are_open() {
        let pc = PointCloud::from_xyz(&[
            [0.0, 0.0, 0.003],
            [0.0, 0.0, 1.0],
            [0.4, 0.0, 0.1],
            [0.0, -0.3, 0.1],
            [0.1, 0.1, 0.1],
        ]);
        let seg = ObjectSegmenter {
            use_dbscan: false,
            ..segmenter()
        };
        assert_eq!(seg.extract(&pc), PointCloud::from_xyz(&[[0.1, 0.1, 0.1]]));
    }

    #[test]
    fn test_keeps_largest_cluster() {
        // A large and a small cluster, far apart.
        let mut points = Vec::new();
        points.extend(blob(-0.2, -0.1, 25, 0.005, 0.05)); // 625
        points.extend(blob(0.2, 0.1, 7, 0.005, 0.05)); // 49
        let pc = PointCloud::new(points);
        let obj = segmenter().extract(&pc);
        assert_eq!(obj.len(), 625);
        assert!(obj.iter().all(|p| p.x < 0.0));
    }

    #[test]
    fn test_all_noise_keeps_filtered_set() {
        let pc = PointCloud::from_xyz(&[[0.0, 0.0, 0.1], [0.2, 0.2, 0.1], [-0.2, -0.2, 0.1]]);
        let obj = segmenter().extract(&pc);
        assert_eq!(obj, pc);
    }
}
