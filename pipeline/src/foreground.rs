use dims_core::{Plane, PointCloud};

/// Points strictly more than `sd_thresh` above `plane`, on the sensor side.
///
/// `plane` is expected in the `d >= 0` convention, so "above" is the side the
/// normal points to.
pub fn signed_distance_filter(plane: &Plane, cloud: &PointCloud, sd_thresh: f64) -> PointCloud {
    cloud.filter(|p| plane.signed_distance(p) > sd_thresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_keeps_only_points_above_threshold() {
        // z = 1 seen from the origin: normal toward the sensor.
        let plane = Plane {
            normal: Vector3::new(0.0, 0.0, -1.0),
            d: 1.0,
        };
        let cloud = PointCloud::from_xyz(&[
            [0.0, 0.0, 1.0],   // on the table
            [0.0, 0.0, 0.999], // within threshold
            [0.0, 0.0, 0.99],  // above
            [0.0, 0.0, 1.02],  // behind the table
            [0.3, 0.1, 0.5],   // above
        ]);
        let out = signed_distance_filter(&plane, &cloud, 0.003);
        assert_eq!(
            out,
            PointCloud::from_xyz(&[[0.0, 0.0, 0.99], [0.3, 0.1, 0.5]])
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let plane = Plane {
            normal: Vector3::new(0.0, 0.0, 1.0),
            d: 0.0,
        };
        let cloud = PointCloud::from_xyz(&[[0.0, 0.0, 0.5], [0.0, 0.0, 0.25]]);
        assert_eq!(signed_distance_filter(&plane, &cloud, 0.5).len(), 0);
        assert_eq!(signed_distance_filter(&plane, &cloud, 0.25).len(), 1);
    }
}
