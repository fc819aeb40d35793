//! Support-plane detection.
//!
//! Several RANSAC fits are tried: one on the whole cloud and one per
//! configured depth quantile, each on the deepest part of the cloud only.
//! Candidates are gated on tilt and global support. The winner is the deepest
//! surface with material in front of it; when no candidate has material in
//! front, the best supported one wins. If every candidate fails the gates,
//! an unconstrained fit on the whole cloud is used.

use crate::config::DimsConfig;
use dims_core::{Plane, PointCloud, Result};
use dims_point_cloud::{quantile, segment_plane};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use tracing::{debug, trace};

/// Which selection rule produced a [`PlaneEstimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneTier {
    /// Gated candidate with material in front of it.
    Strict,
    /// Gated candidate, nothing in front of it.
    Relaxed,
    /// No candidate passed the gates.
    Unconstrained,
}

#[derive(Debug, Clone)]
pub struct PlaneEstimate {
    /// Unit normal, `d >= 0`.
    pub plane: Plane,
    /// Indices into the full cloud with distance `<= plane_dist_thresh`.
    pub inliers: Vec<usize>,
    /// The remaining indices, ascending.
    pub outliers: Vec<usize>,
    pub tier: PlaneTier,
    pub tilt_deg: f64,
    pub median_depth: f64,
    pub closer_ratio: f64,
}

impl PlaneEstimate {
    /// Split `cloud` into (table inliers, everything else).
    pub fn split(&self, cloud: &PointCloud) -> Result<(PointCloud, PointCloud)> {
        Ok((cloud.select(&self.inliers)?, cloud.select(&self.outliers)?))
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    estimate: PlaneEstimate,
    source: String,
}

pub struct PlaneEstimator<'a> {
    cfg: &'a DimsConfig,
    up: Vector3<f64>,
}

impl<'a> PlaneEstimator<'a> {
    pub fn new(cfg: &'a DimsConfig) -> Result<Self> {
        Ok(Self {
            cfg,
            up: cfg.geometry.up_vector()?,
        })
    }

    /// Distance along the viewing direction: larger is farther from the sensor.
    pub fn depth(&self, p: &Point3<f64>) -> f64 {
        -self.up.dot(&p.coords)
    }

    /// Fewest points a candidate subset needs before it is fitted.
    pub fn min_candidate_size(&self) -> usize {
        (3 * self.cfg.ransac_n).max(50)
    }

    /// Pick the support plane of `cloud`.
    ///
    /// Returns `Ok(None)` only when not even the unconstrained fit succeeds,
    /// e.g. fewer than `ransac_n` points or all points collinear.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        cloud: &PointCloud,
        rng: &mut R,
    ) -> Result<Option<PlaneEstimate>> {
        let depths: Vec<f64> = cloud.iter().map(|p| self.depth(p)).collect();

        let mut strict: Option<Candidate> = None;
        let mut relaxed: Option<Candidate> = None;

        for (source, subset) in self.candidate_subsets(cloud, &depths) {
            if subset.len() < self.min_candidate_size() {
                trace!(source = %source, size = subset.len(), "Candidate subset too small");
                continue;
            }
            let Some(estimate) = self.fit(&subset, cloud, &depths, rng)? else {
                continue;
            };
            if let Some(reason) = self.rejection(&estimate, cloud.len()) {
                debug!(
                    source = %source,
                    tilt_deg = estimate.tilt_deg,
                    inliers = estimate.inliers.len(),
                    "Plane candidate rejected: {}",
                    reason
                );
                continue;
            }

            let candidate = Candidate { estimate, source };
            if candidate.estimate.closer_ratio >= self.cfg.plane_min_closer_ratio
                && beats_strict(&candidate, strict.as_ref())
            {
                strict = Some(candidate.clone());
            }
            if beats_relaxed(&candidate, relaxed.as_ref()) {
                relaxed = Some(candidate);
            }
        }

        let chosen = match (strict, relaxed) {
            (Some(c), _) => Some((c, PlaneTier::Strict)),
            (None, Some(c)) => Some((c, PlaneTier::Relaxed)),
            (None, None) => None,
        };
        if let Some((Candidate { mut estimate, source }, tier)) = chosen {
            estimate.tier = tier;
            debug!(
                source = %source,
                tier = ?estimate.tier,
                inliers = estimate.inliers.len(),
                median_depth = estimate.median_depth,
                closer_ratio = estimate.closer_ratio,
                "Selected support plane"
            );
            return Ok(Some(estimate));
        }

        debug!("No plane candidate passed the gates, fitting unconstrained");
        let fallback = self.fit(cloud, cloud, &depths, rng)?;
        Ok(fallback.map(|mut estimate| {
            estimate.tier = PlaneTier::Unconstrained;
            estimate
        }))
    }

    fn candidate_subsets(&self, cloud: &PointCloud, depths: &[f64]) -> Vec<(String, PointCloud)> {
        let mut subsets = vec![("full".to_string(), cloud.clone())];
        for &q in &self.cfg.plane_candidate_quantiles {
            let Some(threshold) = quantile(depths, q) else {
                continue;
            };
            let subset: PointCloud = cloud
                .iter()
                .zip(depths)
                .filter(|(_, &d)| d >= threshold)
                .map(|(p, _)| *p)
                .collect();
            subsets.push((format!("q{:.2}", q), subset));
        }
        subsets
    }

    /// Fit on `subset`, then score against the whole cloud.
    fn fit<R: Rng + ?Sized>(
        &self,
        subset: &PointCloud,
        cloud: &PointCloud,
        depths: &[f64],
        rng: &mut R,
    ) -> Result<Option<PlaneEstimate>> {
        let (model, _) = segment_plane(
            subset,
            self.cfg.plane_dist_thresh,
            self.cfg.ransac_n,
            self.cfg.ransac_iters,
            rng,
        );
        let Some(plane) = model else {
            return Ok(None);
        };
        let plane = plane.normalized(&self.up)?;

        let threshold = self.cfg.plane_dist_thresh;
        let (inliers, outliers): (Vec<usize>, Vec<usize>) =
            (0..cloud.len()).partition(|&i| plane.distance(&cloud.points[i]) <= threshold);

        let inlier_depths: Vec<f64> = inliers.iter().map(|&i| depths[i]).collect();
        let median_depth = quantile(&inlier_depths, 0.5).unwrap_or(f64::NAN);
        let closer = depths
            .iter()
            .filter(|&&d| d < median_depth - self.cfg.plane_depth_margin)
            .count();
        let closer_ratio = if cloud.is_empty() {
            0.0
        } else {
            closer as f64 / cloud.len() as f64
        };

        Ok(Some(PlaneEstimate {
            tilt_deg: plane.tilt_deg(&self.up),
            plane,
            inliers,
            outliers,
            tier: PlaneTier::Strict,
            median_depth,
            closer_ratio,
        }))
    }

    fn rejection(&self, estimate: &PlaneEstimate, total: usize) -> Option<String> {
        if estimate.tilt_deg > self.cfg.plane_max_tilt_deg {
            return Some(format!(
                "tilt {:.1} deg exceeds {:.1} deg",
                estimate.tilt_deg, self.cfg.plane_max_tilt_deg
            ));
        }
        let required = self
            .cfg
            .plane_min_inliers
            .max((self.cfg.plane_min_inlier_ratio * total as f64).ceil() as usize);
        if estimate.inliers.len() < required {
            return Some(format!(
                "{} inliers, {} required",
                estimate.inliers.len(),
                required
            ));
        }
        None
    }
}

/// Deeper first, then more inliers.
fn beats_strict(c: &Candidate, best: Option<&Candidate>) -> bool {
    let Some(best) = best else { return true };
    let (a, b) = (&c.estimate, &best.estimate);
    a.median_depth > b.median_depth
        || (a.median_depth == b.median_depth && a.inliers.len() > b.inliers.len())
}

/// More inliers first, then deeper.
fn beats_relaxed(c: &Candidate, best: Option<&Candidate>) -> bool {
    let Some(best) = best else { return true };
    let (a, b) = (&c.estimate, &best.estimate);
    a.inliers.len() > b.inliers.len()
        || (a.inliers.len() == b.inliers.len() && a.median_depth > b.median_depth)
}
