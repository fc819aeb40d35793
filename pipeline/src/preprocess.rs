//! ROI prefilter, voxel downsampling and statistical denoising.

use crate::config::DimsConfig;
use dims_core::PointCloud;
use dims_point_cloud::{crop_xy, remove_statistical_outliers, voxel_down_sample, XyBounds};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Preprocessed {
    /// The ROI prefilter left fewer than [`DimsConfig::min_points`] points.
    TooFewPoints { remaining: usize },
    Ready(PointCloud),
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    roi: XyBounds,
    voxel_size: f64,
    nb_neighbors: usize,
    std_ratio: f64,
    min_points: usize,
}

impl Preprocessor {
    pub fn from_config(cfg: &DimsConfig) -> Self {
        Self {
            roi: XyBounds::new(cfg.roi_x_min, cfg.roi_x_max, cfg.roi_y_min, cfg.roi_y_max),
            voxel_size: cfg.voxel_size,
            nb_neighbors: cfg.nb_neighbors,
            std_ratio: cfg.std_ratio,
            min_points: cfg.min_points(),
        }
    }

    pub fn run(&self, raw: &PointCloud) -> Preprocessed {
        let cropped = crop_xy(raw, &self.roi);
        if cropped.len() < self.min_points {
            debug!(
                raw = raw.len(),
                cropped = cropped.len(),
                required = self.min_points,
                "Too few points inside the ROI"
            );
            return Preprocessed::TooFewPoints {
                remaining: cropped.len(),
            };
        }

        let down = voxel_down_sample(&cropped, self.voxel_size);
        let (clean, _) = remove_statistical_outliers(&down, self.nb_neighbors, self.std_ratio);
        debug!(
            cropped = cropped.len(),
            downsampled = down.len(),
            denoised = clean.len(),
            "Preprocessed"
        );
        Preprocessed::Ready(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn patch(n: usize, step: f64, z: f64) -> PointCloud {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Point3::new(i as f64 * step - 0.1, j as f64 * step - 0.1, z));
            }
        }
        PointCloud::new(points)
    }

    #[test]
    fn test_guard_trips_on_empty_roi() {
        let cfg = DimsConfig {
            roi_x_min: 5.0,
            roi_x_max: 6.0,
            ..DimsConfig::default()
        };
        let out = Preprocessor::from_config(&cfg).run(&patch(10, 0.02, 1.0));
        assert_eq!(out, Preprocessed::TooFewPoints { remaining: 0 });
    }

    #[test]
    fn test_guard_counts_points_after_crop() {
        let cfg = DimsConfig::default();
        let pc = PointCloud::from_xyz(&[[0.0, 0.0, 1.0]; 9]);
        let out = Preprocessor::from_config(&cfg).run(&pc);
        assert_eq!(out, Preprocessed::TooFewPoints { remaining: 9 });
    }

    #[test]
    fn test_downsamples_inside_roi() {
        let cfg = DimsConfig {
            voxel_size: 0.04,
            ..DimsConfig::default()
        };
        let mut pc = patch(21, 0.01, 1.0);
        pc.points.push(Point3::new(2.0, 2.0, 1.0));
        match Preprocessor::from_config(&cfg).run(&pc) {
            Preprocessed::Ready(clean) => {
                assert!(clean.len() < 21 * 21 / 4);
                assert!(clean.iter().all(|p| p.x.abs() <= 0.40 && p.y.abs() <= 0.30));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
