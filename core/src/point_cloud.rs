use crate::geometry::Intrinsics;
use nalgebra::Point3;

/// An owned, unordered set of 3D points.
///
/// Every pipeline stage consumes one cloud and produces a new one; clouds are
/// never shared mutably between stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point3<f64>>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    pub fn from_xyz(xyz: &[[f64; 3]]) -> Self {
        Self::new(xyz.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3<f64>> {
        self.points.iter()
    }

    /// Keep the points at `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> crate::Result<Self> {
        let mut points = Vec::with_capacity(indices.len());
        for &i in indices {
            let p = self.points.get(i).ok_or_else(|| {
                crate::Error::InvalidInput(format!(
                    "Index {} out of range for cloud of {} points",
                    i,
                    self.len()
                ))
            })?;
            points.push(*p);
        }
        Ok(Self::new(points))
    }

    /// Keep every point whose mask entry is `keep`.
    pub fn select_by_mask(&self, mask: &[bool], keep: bool) -> crate::Result<Self> {
        if mask.len() != self.len() {
            return Err(crate::Error::InvalidInput(format!(
                "Mask length {} does not match point count {}",
                mask.len(),
                self.len()
            )));
        }
        Ok(Self::new(
            self.points
                .iter()
                .zip(mask)
                .filter(|(_, &m)| m == keep)
                .map(|(p, _)| *p)
                .collect(),
        ))
    }

    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&Point3<f64>) -> bool,
    {
        Self::new(self.points.iter().filter(|p| pred(p)).copied().collect())
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnMut(&Point3<f64>) -> Point3<f64>,
    {
        Self::new(self.points.iter().map(f).collect())
    }

    /// Component-wise minimum and maximum, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }
}

impl From<Vec<Point3<f64>>> for PointCloud {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One acquired frame: the cloud in the sensor frame plus metadata that the
/// measurement itself does not use.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub cloud: PointCloud,
    pub intrinsics: Option<Intrinsics>,
    pub timestamp_ns: Option<u64>,
}

impl Frame {
    pub fn new(cloud: PointCloud) -> Self {
        Self {
            cloud,
            intrinsics: None,
            timestamp_ns: None,
        }
    }

    pub fn with_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = Some(timestamp_ns);
        self
    }
}
