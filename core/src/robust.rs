//! Robust Estimation Module
//!
//! Provides a generic RANSAC implementation that can be used for any model estimation task.
//! The random source is passed in by the caller so runs can be reproduced with a seeded RNG.

use rand::Rng;
use std::marker::PhantomData;

/// Configuration for robust estimation
#[derive(Debug, Clone)]
pub struct RobustConfig {
    /// Maximum residual for a datum to count as an inlier (inclusive).
    pub threshold: f64,
    pub max_iterations: usize,
    /// Stop early once this fraction of the data are inliers.
    pub confidence: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            max_iterations: 1000,
            confidence: 0.99,
        }
    }
}

/// Result of robust estimation
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    pub residual: f64,
}

impl<M> RobustResult<M> {
    fn empty(n: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
        }
    }

    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter(|(_, &is_inlier)| is_inlier)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Trait for models that can be estimated robustly
pub trait RobustModel<D> {
    type Model: Clone;

    /// Minimum number of data points required to estimate the model
    fn min_sample_size(&self) -> usize;

    /// Estimate model from a minimal sample
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    /// Compute error for a single data point against the model
    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;
}

/// Generic RANSAC engine
pub struct Ransac<D, M: RobustModel<D>> {
    config: RobustConfig,
    _phantom: PhantomData<(D, M)>,
}

impl<D, M: RobustModel<D>> Ransac<D, M> {
    pub fn new(config: RobustConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    pub fn config(&self) -> &RobustConfig {
        &self.config
    }

    pub fn run<R: Rng + ?Sized>(&self, estimator: &M, data: &[D], rng: &mut R) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();

        if k == 0 || n < k {
            return RobustResult::empty(n);
        }

        let mut best = RobustResult::empty(n);
        let mut inliers = vec![false; n];

        for _ in 0..self.config.max_iterations {
            // 1. Sample
            let sample: Vec<&D> = rand::seq::index::sample(rng, n, k)
                .into_iter()
                .map(|i| &data[i])
                .collect();

            // 2. Estimate
            let Some(model) = estimator.estimate(&sample) else {
                continue;
            };

            // 3. Score
            let mut num_inliers = 0;
            let mut total_error = 0.0;
            for (flag, d) in inliers.iter_mut().zip(data) {
                let err = estimator.compute_error(&model, d);
                *flag = err <= self.config.threshold;
                if *flag {
                    num_inliers += 1;
                    total_error += err;
                }
            }

            let residual = if num_inliers > 0 {
                total_error / num_inliers as f64
            } else {
                f64::INFINITY
            };

            if num_inliers > best.num_inliers
                || (num_inliers == best.num_inliers && residual < best.residual)
            {
                best.num_inliers = num_inliers;
                best.inliers.copy_from_slice(&inliers);
                best.model = Some(model);
                best.residual = residual;

                // Early exit check
                if num_inliers as f64 > n as f64 * self.config.confidence {
                    break;
                }
            }
        }

        best
    }
}
