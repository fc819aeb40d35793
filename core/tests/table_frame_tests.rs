use approx::assert_relative_eq;
use dims_core::{Plane, TableFrame};
use nalgebra::{Point3, Vector3};

fn planes() -> Vec<Plane> {
    let up = Vector3::new(0.0, 0.0, -1.0);
    [
        [0.0, 0.0, -1.0, 0.8],
        [0.1, 0.05, -1.0, 1.2],
        [0.95, 0.1, -0.2, 0.3],
        [0.0, 1.0, 0.0, 0.0],
        [-0.4, 0.7, 0.6, -2.5],
    ]
    .iter()
    .map(|c| Plane::from_coefficients(*c).unwrap().normalized(&up).unwrap())
    .collect()
}

#[test]
fn test_round_trip_camera_table_camera() {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.25, -0.13, 0.77),
        Point3::new(-3.0, 12.5, 4.0),
        Point3::new(1e3, -1e3, 5e2),
    ];

    for plane in planes() {
        let frame = TableFrame::from_plane(&plane).unwrap();
        for p in &points {
            let back = frame.to_camera(&frame.to_table(p));
            assert_relative_eq!(back, *p, epsilon = 1e-9, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_normalized_planes_keep_invariants() {
    for plane in planes() {
        assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-12);
        assert!(plane.d >= 0.0);
    }
}

#[test]
fn test_degenerate_plane_is_an_error() {
    let plane = Plane {
        normal: Vector3::zeros(),
        d: 1.0,
    };
    assert!(TableFrame::from_plane(&plane).is_err());
    assert!(Plane::from_coefficients([0.0, 0.0, 0.0, 1.0]).is_err());
}
