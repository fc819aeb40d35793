//! Measurement parameters.
//!
//! [`DimsConfig`] is a flat set of thresholds read once per processed frame.
//! [`SharedConfig`] lets a control path edit it while a processing loop takes
//! consistent snapshots.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Length unit of the input points, echoed in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    M,
    Cm,
    Mm,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::M => "m",
            Units::Cm => "cm",
            Units::Mm => "mm",
        })
    }
}

/// How the footprint rectangle is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BBoxType {
    /// Principal axes of the footprint.
    #[default]
    Obb,
    /// Table-frame x/y axes.
    Aabb,
    /// Reported label only; measured like [`BBoxType::Obb`].
    Plane,
}

impl fmt::Display for BBoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BBoxType::Obb => "obb",
            BBoxType::Aabb => "aabb",
            BBoxType::Plane => "plane",
        })
    }
}

/// Sensor-to-table viewing geometry.
///
/// `up` points from the support surface toward the sensor, in sensor
/// coordinates. The depth of a point is `-up · p`: the table is the deepest
/// large plane and the object sits between it and the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewGeometry {
    pub up: [f64; 3],
}

impl Default for ViewGeometry {
    fn default() -> Self {
        // Camera at the origin looking along +Z onto the table.
        Self {
            up: [0.0, 0.0, -1.0],
        }
    }
}

impl ViewGeometry {
    pub fn up_vector(&self) -> dims_core::Result<Vector3<f64>> {
        dims_core::normalize(&Vector3::from(self.up))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimsConfig {
    // --- point cloud preprocessing ---
    pub voxel_size: f64,
    pub nb_neighbors: usize,
    pub std_ratio: f64,

    // --- plane (table) ---
    pub plane_dist_thresh: f64,
    pub ransac_n: usize,
    pub ransac_iters: usize,
    pub plane_max_tilt_deg: f64,
    pub plane_min_inliers: usize,
    pub plane_min_inlier_ratio: f64,
    pub plane_depth_margin: f64,
    pub plane_min_closer_ratio: f64,
    /// Depth quantiles that seed the extra plane candidates.
    pub plane_candidate_quantiles: Vec<f64>,

    // --- foreground ---
    pub sd_thresh: f64,

    // --- object extraction relative to table ---
    pub h_min: f64,
    pub h_max: f64,
    pub roi_x_min: f64,
    pub roi_x_max: f64,
    pub roi_y_min: f64,
    pub roi_y_max: f64,

    // --- clustering ---
    pub use_dbscan: bool,
    pub dbscan_eps: f64,
    pub dbscan_min_points: usize,

    // --- robust extents ---
    pub q_low: f64,
    pub q_high: f64,

    // --- reporting / reproducibility ---
    pub units: Units,
    pub bbox_type: BBoxType,
    /// RANSAC seed; `None` draws from OS entropy on every frame.
    pub seed: Option<u64>,

    #[serde(flatten)]
    pub geometry: ViewGeometry,
}

impl Default for DimsConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.005,
            nb_neighbors: 20,
            std_ratio: 2.0,

            plane_dist_thresh: 0.004,
            ransac_n: 3,
            ransac_iters: 1000,
            plane_max_tilt_deg: 30.0,
            plane_min_inliers: 200,
            plane_min_inlier_ratio: 0.10,
            plane_depth_margin: 0.01,
            plane_min_closer_ratio: 0.01,
            plane_candidate_quantiles: vec![0.97, 0.94, 0.90, 0.85],

            sd_thresh: 0.003,

            h_min: 0.003,
            h_max: 1.0,
            roi_x_min: -0.40,
            roi_x_max: 0.40,
            roi_y_min: -0.30,
            roi_y_max: 0.30,

            use_dbscan: true,
            dbscan_eps: 0.01,
            dbscan_min_points: 30,

            q_low: 0.01,
            q_high: 0.99,

            units: Units::M,
            bbox_type: BBoxType::Obb,
            seed: None,
            geometry: ViewGeometry::default(),
        }
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(msg()))
    }
}

fn unit_interval(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

impl DimsConfig {
    /// Fewest points the preprocessing stages must leave for a measurement.
    pub fn min_points(&self) -> usize {
        (3 * self.ransac_n).max(10)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.voxel_size.is_finite(), || {
            format!("voxel_size must be finite, got {}", self.voxel_size)
        })?;
        check(self.std_ratio >= 0.0, || {
            format!("std_ratio must be >= 0, got {}", self.std_ratio)
        })?;
        check(self.plane_dist_thresh > 0.0, || {
            format!("plane_dist_thresh must be > 0, got {}", self.plane_dist_thresh)
        })?;
        check(self.ransac_n >= 3, || {
            format!("ransac_n must be >= 3, got {}", self.ransac_n)
        })?;
        check(self.ransac_iters > 0, || "ransac_iters must be > 0".to_string())?;
        check((0.0..=90.0).contains(&self.plane_max_tilt_deg), || {
            format!("plane_max_tilt_deg must be in [0, 90], got {}", self.plane_max_tilt_deg)
        })?;
        check(unit_interval(self.plane_min_inlier_ratio), || {
            format!(
                "plane_min_inlier_ratio must be in [0, 1], got {}",
                self.plane_min_inlier_ratio
            )
        })?;
        check(unit_interval(self.plane_min_closer_ratio), || {
            format!(
                "plane_min_closer_ratio must be in [0, 1], got {}",
                self.plane_min_closer_ratio
            )
        })?;
        check(
            self.plane_candidate_quantiles.iter().all(|&q| unit_interval(q)),
            || "plane_candidate_quantiles must lie in [0, 1]".to_string(),
        )?;
        check(self.h_min < self.h_max, || {
            format!("h_min ({}) must be below h_max ({})", self.h_min, self.h_max)
        })?;
        check(self.roi_x_min < self.roi_x_max, || {
            format!("roi_x_min ({}) must be below roi_x_max ({})", self.roi_x_min, self.roi_x_max)
        })?;
        check(self.roi_y_min < self.roi_y_max, || {
            format!("roi_y_min ({}) must be below roi_y_max ({})", self.roi_y_min, self.roi_y_max)
        })?;
        check(!self.use_dbscan || self.dbscan_eps > 0.0, || {
            format!("dbscan_eps must be > 0, got {}", self.dbscan_eps)
        })?;
        check(
            unit_interval(self.q_low) && unit_interval(self.q_high) && self.q_low <= self.q_high,
            || format!("need 0 <= q_low ({}) <= q_high ({}) <= 1", self.q_low, self.q_high),
        )?;
        self.geometry
            .up_vector()
            .map_err(|e| ConfigError::Invalid(format!("up: {}", e)))?;
        Ok(())
    }

    /// Set one parameter from text, parsed like the current value of that field.
    ///
    /// Booleans accept `1/true/yes/y/on` (anything else is `false`), integers
    /// are truncated from a float, lists are comma separated and `seed` accepts
    /// `none`. The edit is rejected if the result does not validate.
    pub fn set_param(&mut self, name: &str, text: &str) -> Result<(), ConfigError> {
        let mut value = serde_json::to_value(&*self)?;
        let fields = value
            .as_object_mut()
            .ok_or_else(|| ConfigError::Invalid("config is not a JSON object".to_string()))?;
        let current = fields
            .get(name)
            .ok_or_else(|| ConfigError::UnknownParameter(name.to_string()))?;

        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: text.to_string(),
        };
        let parsed = parse_like(name, current, text).ok_or_else(invalid)?;
        fields.insert(name.to_string(), parsed);

        let updated: DimsConfig = serde_json::from_value(value).map_err(|_| invalid())?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Names accepted by [`DimsConfig::set_param`].
    pub fn param_names() -> Vec<String> {
        match serde_json::to_value(DimsConfig::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: DimsConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn parse_like(name: &str, current: &Value, text: &str) -> Option<Value> {
    let text = text.trim();
    if name == "seed" {
        return if matches!(text.to_ascii_lowercase().as_str(), "" | "none" | "null") {
            Some(Value::Null)
        } else {
            parse_integer(text)
        };
    }
    match current {
        Value::Bool(_) => Some(Value::Bool(matches!(
            text.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ))),
        Value::Number(n) if n.is_f64() => {
            let v: f64 = text.parse().ok()?;
            serde_json::Number::from_f64(v).map(Value::Number)
        }
        Value::Number(_) => parse_integer(text),
        Value::String(_) => Some(Value::String(text.to_ascii_lowercase())),
        Value::Array(_) => text
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                let v: f64 = s.trim().parse().ok()?;
                serde_json::Number::from_f64(v).map(Value::Number)
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}

fn parse_integer(text: &str) -> Option<Value> {
    let v: f64 = text.parse().ok()?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some(Value::from(v.trunc() as u64))
}

/// Configuration shared between an editor and a processing loop.
///
/// Every read goes through [`SharedConfig::snapshot`], so one frame always sees
/// one consistent set of values.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<DimsConfig>>,
}

impl SharedConfig {
    pub fn new(config: DimsConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> DimsConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut DimsConfig) -> T) -> T {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn set_param(&self, name: &str, text: &str) -> Result<(), ConfigError> {
        self.update(|cfg| cfg.set_param(name, text))
    }

    pub fn reset(&self) {
        self.update(|cfg| *cfg = DimsConfig::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = DimsConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.min_points(), 10);
    }

    #[test]
    fn test_set_param_parses_by_field_type() {
        let mut cfg = DimsConfig::default();
        cfg.set_param("voxel_size", "0.01").unwrap();
        cfg.set_param("nb_neighbors", "12.7").unwrap();
        cfg.set_param("use_dbscan", "off").unwrap();
        cfg.set_param("units", "MM").unwrap();
        cfg.set_param("plane_candidate_quantiles", "0.95, 0.8").unwrap();
        cfg.set_param("up", "0,1,0").unwrap();
        cfg.set_param("seed", "42").unwrap();

        assert_eq!(cfg.voxel_size, 0.01);
        assert_eq!(cfg.nb_neighbors, 12);
        assert!(!cfg.use_dbscan);
        assert_eq!(cfg.units, Units::Mm);
        assert_eq!(cfg.plane_candidate_quantiles, vec![0.95, 0.8]);
        assert_eq!(cfg.geometry.up, [0.0, 1.0, 0.0]);
        assert_eq!(cfg.seed, Some(42));

        cfg.set_param("seed", "none").unwrap();
        assert_eq!(cfg.seed, None);
        cfg.set_param("use_dbscan", "Yes").unwrap();
        assert!(cfg.use_dbscan);
    }

    #[test]
    fn test_set_param_rejects_bad_input() {
        let mut cfg = DimsConfig::default();
        assert!(matches!(
            cfg.set_param("no_such_thing", "1"),
            Err(ConfigError::UnknownParameter(_))
        ));
        assert!(matches!(
            cfg.set_param("voxel_size", "abc"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set_param("nb_neighbors", "-3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set_param("units", "furlong"),
            Err(ConfigError::InvalidValue { .. })
        ));
        // Inverted range fails validation and leaves the config untouched.
        assert!(matches!(
            cfg.set_param("h_min", "5.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(cfg, DimsConfig::default());
    }

    #[test]
    fn test_validate_catches_zero_up() {
        let cfg = DimsConfig {
            geometry: ViewGeometry { up: [0.0; 3] },
            ..DimsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_param_names_are_flat() {
        let names = DimsConfig::param_names();
        for expected in ["voxel_size", "plane_min_closer_ratio", "dbscan_min_points", "up", "seed"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(!names.iter().any(|n| n == "geometry"));
    }

    #[test]
    fn test_shared_config_snapshot_and_reset() {
        let shared = SharedConfig::default();
        let before = shared.snapshot();
        shared.set_param("q_high", "0.95").unwrap();
        assert_eq!(before.q_high, 0.99);
        assert_eq!(shared.snapshot().q_high, 0.95);

        let clone = shared.clone();
        clone.update(|cfg| cfg.h_max = 0.5);
        assert_eq!(shared.snapshot().h_max, 0.5);

        shared.reset();
        assert_eq!(shared.snapshot(), DimsConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dims.json");
        let mut cfg = DimsConfig::default();
        cfg.set_param("dbscan_eps", "0.02").unwrap();
        cfg.to_json_file(&path).unwrap();
        let loaded = DimsConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: DimsConfig = serde_json::from_str(r#"{"voxel_size": 0.002, "up": [0, -1, 0]}"#).unwrap();
        assert_eq!(cfg.voxel_size, 0.002);
        assert_eq!(cfg.geometry.up, [0.0, -1.0, 0.0]);
        assert_eq!(cfg.ransac_iters, 1000);
    }
}
