use crate::config::{DimsConfig, SharedConfig};
use crate::dimensions::estimate_dimensions;
use crate::foreground::signed_distance_filter;
use crate::plane::PlaneEstimator;
use crate::preprocess::{Preprocessed, Preprocessor};
use crate::result::{DimsResult, Snapshots, Stage};
use crate::segment::ObjectSegmenter;
use dims_core::{Error, Frame, PointCloud, Result, TableFrame};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// Measures one frame at a time against a shared configuration.
///
/// Nothing is carried between frames: each call takes a configuration
/// snapshot and, when a seed is configured, restarts the random source from it.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: SharedConfig,
}

impl Pipeline {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    pub fn with_config(config: DimsConfig) -> Self {
        Self::new(SharedConfig::new(config))
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn process(&self, frame: &Frame) -> Result<(DimsResult, Snapshots)> {
        let cfg = self.config.snapshot();
        process_cloud(&frame.cloud, &cfg)
    }
}

/// Run every stage on `raw` (sensor coordinates).
///
/// Sparse or empty input yields a NaN result. Errors are reserved for an
/// invalid configuration and for geometric degeneracy.
pub fn process_cloud(raw: &PointCloud, cfg: &DimsConfig) -> Result<(DimsResult, Snapshots)> {
    cfg.validate()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    let nan = DimsResult::nan(cfg.units, cfg.bbox_type);

    let down = match Preprocessor::from_config(cfg).run(raw) {
        Preprocessed::Ready(cloud) => cloud,
        Preprocessed::TooFewPoints { .. } => {
            return Ok((nan, Snapshots::early_exit(raw.clone())));
        }
    };

    let mut snapshots = Snapshots::new();
    snapshots.insert(Stage::Raw, raw.clone());
    snapshots.insert(Stage::Downsampled, down.clone());

    if down.len() < cfg.min_points() {
        debug!(points = down.len(), "Too few points after downsampling");
        snapshots.fill_missing();
        return Ok((nan, snapshots));
    }

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let Some(estimate) = PlaneEstimator::new(cfg)?.estimate(&down, &mut rng)? else {
        debug!(points = down.len(), "No plane could be fitted");
        snapshots.fill_missing();
        return Ok((nan, snapshots));
    };

    let (table, rest) = estimate.split(&down)?;
    let filtered = signed_distance_filter(&estimate.plane, &rest, cfg.sd_thresh);
    debug!(
        table = table.len(),
        rest = rest.len(),
        filtered = filtered.len(),
        tier = ?estimate.tier,
        "Partitioned against the support plane"
    );

    let frame = TableFrame::from_plane(&estimate.plane)?;
    let object = ObjectSegmenter::from_config(cfg).extract(&frame.cloud_to_table(&filtered));
    let ext = estimate_dimensions(&object, cfg.q_low, cfg.q_high, cfg.bbox_type);

    snapshots.insert(Stage::Table, table);
    snapshots.insert(Stage::Object, frame.cloud_to_camera(&object));
    snapshots.insert(Stage::Filtered, filtered);

    let result = DimsResult::new(ext.length, ext.width, ext.height, cfg.units, cfg.bbox_type);
    debug!(object = object.len(), %result, "Measured");
    Ok((result, snapshots))
}
