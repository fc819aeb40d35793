//! Synthetic table scenes.
//!
//! The sensor sits at the origin looking along +Z. The table is the plane
//! `z = table_distance` and the box stands on it, so it lies between the
//! table and the sensor.

use crate::{FrameSource, Result, SourceError};
use dims_core::{Frame, Intrinsics, PointCloud};
use nalgebra::{Point3, Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Nominal frame period, ~30 fps.
const FRAME_PERIOD_NS: u64 = 33_333_333;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneBuilder {
    /// Half extents of the visible table along x and y.
    pub table_half_extents: [f64; 2],
    pub table_distance: f64,
    /// `[length, width, height]` of the box.
    pub box_size: [f64; 3],
    /// Box footprint center on the table, in sensor x/y.
    pub box_center: [f64; 2],
    /// Rotation of the box about the table normal.
    pub yaw_deg: f64,
    /// Sampling step of every surface.
    pub spacing: f64,
    /// Standard deviation of gaussian noise along the viewing axis.
    pub noise_std: f64,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            table_half_extents: [0.35, 0.25],
            table_distance: 0.8,
            box_size: [0.20, 0.12, 0.08],
            box_center: [0.0, 0.0],
            yaw_deg: 0.0,
            spacing: 0.004,
            noise_std: 0.0,
        }
    }
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn box_size(mut self, length: f64, width: f64, height: f64) -> Self {
        self.box_size = [length, width, height];
        self
    }

    pub fn box_center(mut self, x: f64, y: f64) -> Self {
        self.box_center = [x, y];
        self
    }

    pub fn yaw_deg(mut self, yaw_deg: f64) -> Self {
        self.yaw_deg = yaw_deg;
        self
    }

    pub fn table(mut self, half_x: f64, half_y: f64, distance: f64) -> Self {
        self.table_half_extents = [half_x, half_y];
        self.table_distance = distance;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn noise_std(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    fn samples(lo: f64, hi: f64, step: f64) -> Vec<f64> {
        if step <= 0.0 || hi < lo {
            return Vec::new();
        }
        let n = ((hi - lo) / step).floor() as usize;
        (0..=n).map(|i| lo + i as f64 * step).collect()
    }

    /// Box surface in box coordinates: footprint centered at the origin,
    /// height along +z.
    fn box_surface(&self) -> Vec<Vector3<f64>> {
        let [l, w, h] = self.box_size;
        let (hx, hy) = (l / 2.0, w / 2.0);
        let step = self.spacing;
        let xs = Self::samples(-hx, hx, step);
        let ys = Self::samples(-hy, hy, step);
        let zs = Self::samples(step, h - step, step);

        let mut points = Vec::new();
        for &x in &xs {
            for &y in &ys {
                points.push(Vector3::new(x, y, h));
            }
        }
        for &z in &zs {
            for &y in &ys {
                points.push(Vector3::new(-hx, y, z));
                points.push(Vector3::new(hx, y, z));
            }
            for &x in &xs {
                points.push(Vector3::new(x, -hy, z));
                points.push(Vector3::new(x, hy, z));
            }
        }
        points
    }

    /// Sample the scene. `rng` is only drawn from when noise is enabled.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> PointCloud {
        let yaw = Rotation3::from_axis_angle(&Vector3::z_axis(), self.yaw_deg.to_radians());
        let [cx, cy] = self.box_center;
        let [hx, hy] = self.table_half_extents;
        let (half_l, half_w) = (self.box_size[0] / 2.0, self.box_size[1] / 2.0);
        let d = self.table_distance;

        let mut points = Vec::new();
        for x in Self::samples(-hx, hx, self.spacing) {
            for y in Self::samples(-hy, hy, self.spacing) {
                let local = yaw.inverse() * Vector3::new(x - cx, y - cy, 0.0);
                if local.x.abs() < half_l && local.y.abs() < half_w {
                    continue;
                }
                points.push(Point3::new(x, y, d));
            }
        }

        // Box height grows toward the sensor, i.e. toward -z.
        for v in self.box_surface() {
            let r = yaw * Vector3::new(v.x, v.y, 0.0);
            points.push(Point3::new(cx + r.x, cy + r.y, d - v.z));
        }

        if self.noise_std > 0.0 {
            if let Ok(normal) = Normal::new(0.0, self.noise_std) {
                for p in &mut points {
                    p.z += normal.sample(rng);
                }
            }
        }

        PointCloud::new(points)
    }
}

/// Frame source rendering one [`SceneBuilder`] scene per read.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    scene: SceneBuilder,
    rng: StdRng,
    intrinsics: Intrinsics,
    remaining: Option<usize>,
    frame_index: u64,
}

impl SyntheticSource {
    pub fn new(scene: SceneBuilder, seed: u64) -> Self {
        Self {
            scene,
            rng: StdRng::seed_from_u64(seed),
            intrinsics: Intrinsics::new(615.0, 615.0, 320.0, 240.0, 640, 480),
            remaining: None,
            frame_index: 0,
        }
    }

    /// Stop with [`SourceError::EndOfStream`] after `n` frames.
    pub fn with_limit(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    pub fn scene(&self) -> &SceneBuilder {
        &self.scene
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Result<Frame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SourceError::EndOfStream);
            }
            *remaining -= 1;
        }

        let cloud = self.scene.build(&mut self.rng);
        let timestamp = self.frame_index * FRAME_PERIOD_NS;
        self.frame_index += 1;

        Ok(Frame::new(cloud)
            .with_intrinsics(self.intrinsics)
            .with_timestamp(timestamp))
    }
}
