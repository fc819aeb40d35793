//! Length, width and height of an object given in table coordinates.

use crate::config::BBoxType;
use dims_core::PointCloud;
use dims_point_cloud::{mean, quantile_range};
use nalgebra::{Matrix2, SymmetricEigen, Vector2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Extents {
    pub fn nan() -> Self {
        Self {
            length: f64::NAN,
            width: f64::NAN,
            height: f64::NAN,
        }
    }

    fn from_footprint(a: f64, b: f64, height: f64) -> Self {
        let (length, width) = if b > a { (b, a) } else { (a, b) };
        Self {
            length,
            width,
            height,
        }
    }
}

/// Robust box extents.
///
/// Height is the `q_high` quantile of table-frame z (the table sits at 0).
/// The footprint spans the full range of the points along the principal axes
/// of their x/y spread ([`BBoxType::Aabb`] uses the table x/y axes instead).
/// Fewer than three points give NaN everywhere.
pub fn estimate_dimensions(obj: &PointCloud, q_low: f64, q_high: f64, bbox: BBoxType) -> Extents {
    if obj.len() < 3 {
        return Extents::nan();
    }

    let z: Vec<f64> = obj.iter().map(|p| p.z).collect();
    let height = match quantile_range(&z, q_low, q_high) {
        Some((_, hi)) => hi,
        None => return Extents::nan(),
    };

    let xy: Vec<Vector2<f64>> = obj.iter().map(|p| Vector2::new(p.x, p.y)).collect();
    let (a, b) = match bbox {
        BBoxType::Aabb => (
            full_range(xy.iter().map(|v| v.x)),
            full_range(xy.iter().map(|v| v.y)),
        ),
        BBoxType::Obb | BBoxType::Plane => principal_extents(&xy),
    };

    Extents::from_footprint(a, b, height)
}

/// Extents along (major, minor) axes of the 2D covariance.
fn principal_extents(xy: &[Vector2<f64>]) -> (f64, f64) {
    let xs: Vec<f64> = xy.iter().map(|v| v.x).collect();
    let ys: Vec<f64> = xy.iter().map(|v| v.y).collect();
    let center = Vector2::new(mean(&xs).unwrap_or(0.0), mean(&ys).unwrap_or(0.0));

    let mut cov = Matrix2::zeros();
    for v in xy {
        let d = v - center;
        cov += d * d.transpose();
    }
    cov /= (xy.len().max(2) - 1) as f64;

    let eigen = SymmetricEigen::new(cov);
    let major_idx = eigen.eigenvalues.imax();
    let major: Vector2<f64> = eigen.eigenvectors.column(major_idx).into_owned();
    let minor: Vector2<f64> = eigen.eigenvectors.column(1 - major_idx).into_owned();

    let along = |axis: &Vector2<f64>| full_range(xy.iter().map(|v| (v - center).dot(axis)));
    (along(&major), along(&minor))
}

fn full_range(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    quantile_range(&values, 0.0, 1.0)
        .map(|(lo, hi)| hi - lo)
        .unwrap_or(f64::NAN)
}
