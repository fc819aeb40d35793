use crate::{Error, PointCloud, Result};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Below this norm a vector is treated as zero.
const NORM_EPS: f64 = 1e-12;

/// Offsets this close to zero leave the normal orientation to the up axis.
const OFFSET_EPS: f64 = 1e-9;

pub fn normalize(v: &Vector3<f64>) -> Result<Vector3<f64>> {
    let n = v.norm();
    if !n.is_finite() || n < NORM_EPS {
        return Err(Error::DegenerateGeometry(format!(
            "Zero vector normalization ({:.3e}, {:.3e}, {:.3e})",
            v.x, v.y, v.z
        )));
    }
    Ok(v / n)
}

/// Pinhole intrinsics of the depth sensor. Carried with a frame, never used by
/// the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }
}

/// Plane `normal · p + d = 0`.
///
/// Planes built through [`Plane::normalized`] have a unit normal and `d >= 0`,
/// i.e. the normal points from the plane toward the sensor origin. When the
/// plane passes through the origin the sign is fixed by the configured up axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Build from raw `[a, b, c, d]` coefficients, scaling to a unit normal.
    pub fn from_coefficients(coeffs: [f64; 4]) -> Result<Self> {
        let raw = Vector3::new(coeffs[0], coeffs[1], coeffs[2]);
        let norm = raw.norm();
        let normal = normalize(&raw)?;
        Ok(Self {
            normal,
            d: coeffs[3] / norm,
        })
    }

    /// Unit normal, `d >= 0`; ties at `d == 0` orient the normal toward `up`.
    pub fn normalized(&self, up: &Vector3<f64>) -> Result<Self> {
        let norm = self.normal.norm();
        let mut normal = normalize(&self.normal)?;
        let mut d = self.d / norm;

        if d.abs() <= OFFSET_EPS {
            if normal.dot(up) < 0.0 {
                normal = -normal;
            }
            d = 0.0;
        } else if d < 0.0 {
            normal = -normal;
            d = -d;
        }

        Ok(Self { normal, d })
    }

    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        p.coords.dot(&self.normal) + self.d
    }

    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.signed_distance(p).abs()
    }

    /// Angle in degrees between the plane normal and `axis`, ignoring the
    /// normal's sign.
    pub fn tilt_deg(&self, axis: &Vector3<f64>) -> f64 {
        let denom = self.normal.norm() * axis.norm();
        if denom < NORM_EPS {
            return 90.0;
        }
        let cos = (self.normal.dot(axis) / denom).abs().min(1.0);
        cos.acos().to_degrees()
    }
}

/// Orthonormal coordinate frame attached to the support plane.
///
/// Columns of `rotation` are the table axes `x`, `y`, `n` expressed in the
/// sensor frame; `origin = -d * n`. Table coordinates put the plane at `z = 0`
/// with `z` growing toward the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableFrame {
    pub rotation: Matrix3<f64>,
    pub origin: Point3<f64>,
}

impl TableFrame {
    pub fn from_plane(plane: &Plane) -> Result<Self> {
        let n = normalize(&plane.normal)?;
        let origin = Point3::from(-plane.d * n);

        let mut reference = Vector3::x();
        if reference.dot(&n).abs() > 0.9 {
            reference = Vector3::y();
        }

        let x = normalize(&(reference - reference.dot(&n) * n))?;
        let y = normalize(&n.cross(&x))?;

        Ok(Self {
            rotation: Matrix3::from_columns(&[x, y, n]),
            origin,
        })
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.rotation.column(2).into_owned()
    }

    /// `Rᵀ (p - p0)`
    pub fn to_table(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.transpose() * (p - self.origin))
    }

    /// `R q + p0`
    pub fn to_camera(&self, q: &Point3<f64>) -> Point3<f64> {
        self.origin + self.rotation * q.coords
    }

    pub fn cloud_to_table(&self, cloud: &PointCloud) -> PointCloud {
        let rt = self.rotation.transpose();
        cloud.map(|p| Point3::from(rt * (p - self.origin)))
    }

    pub fn cloud_to_camera(&self, cloud: &PointCloud) -> PointCloud {
        cloud.map(|q| self.to_camera(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_rejects_zero() {
        let err = normalize(&Vector3::zeros()).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry(_)));
    }

    #[test]
    fn test_plane_sign_convention() {
        // z = 2 written with a normal pointing away from the origin: d < 0.
        let plane = Plane::from_coefficients([0.0, 0.0, 2.0, -4.0]).unwrap();
        let up = Vector3::new(0.0, 0.0, -1.0);
        let p = plane.normalized(&up).unwrap();
        assert_relative_eq!(p.normal.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.d, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.normal.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_through_origin_follows_up() {
        let plane = Plane::from_coefficients([0.0, 0.0, -1.0, 0.0]).unwrap();
        let p = plane.normalized(&Vector3::z()).unwrap();
        assert_eq!(p.d, 0.0);
        assert_relative_eq!(p.normal.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tilt_ignores_sign() {
        let plane = Plane::from_coefficients([0.0, 0.0, -1.0, 1.0]).unwrap();
        assert_relative_eq!(plane.tilt_deg(&Vector3::z()), 0.0, epsilon = 1e-9);
        let tilted = Plane::from_coefficients([0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(tilted.tilt_deg(&Vector3::z()), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_table_frame_is_orthonormal() {
        let plane = Plane::from_coefficients([0.2, -0.3, -0.9, 0.75])
            .unwrap()
            .normalized(&Vector3::new(0.0, 0.0, -1.0))
            .unwrap();
        let frame = TableFrame::from_plane(&plane).unwrap();
        let rtr = frame.rotation.transpose() * frame.rotation;
        assert_relative_eq!(rtr, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(frame.rotation.determinant(), 1.0, epsilon = 1e-12);

        // The origin lies on the plane.
        assert_relative_eq!(plane.signed_distance(&frame.origin), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_table_frame_switches_reference_axis() {
        let plane = Plane::from_coefficients([1.0, 0.0, 0.0, 1.0]).unwrap();
        let frame = TableFrame::from_plane(&plane).unwrap();
        let x = frame.rotation.column(0);
        assert!(x.dot(&Vector3::x()).abs() < 1e-12);
    }

    #[test]
    fn test_height_is_signed_distance() {
        let plane = Plane::from_coefficients([0.0, 0.0, -1.0, 1.0]).unwrap();
        let frame = TableFrame::from_plane(&plane).unwrap();
        let p = Point3::new(0.3, -0.2, 0.8);
        let q = frame.to_table(&p);
        assert_relative_eq!(q.z, plane.signed_distance(&p), epsilon = 1e-12);
        assert_relative_eq!(q.z, 0.2, epsilon = 1e-12);
    }
}
