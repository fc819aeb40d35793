use crate::config::{BBoxType, Units};
use dims_core::PointCloud;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Box dimensions of the measured object.
///
/// `length >= width` whenever both are finite. Any NaN means the frame could
/// not be measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimsResult {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub units: Units,
    pub bbox_type: BBoxType,
}

impl DimsResult {
    pub fn new(length: f64, width: f64, height: f64, units: Units, bbox_type: BBoxType) -> Self {
        Self {
            length,
            width,
            height,
            units,
            bbox_type,
        }
    }

    pub fn nan(units: Units, bbox_type: BBoxType) -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, units, bbox_type)
    }

    pub fn is_valid(&self) -> bool {
        self.length.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

impl fmt::Display for DimsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L={:.4} W={:.4} H={:.4} {} ({})",
            self.length, self.width, self.height, self.units, self.bbox_type
        )
    }
}

/// Intermediate point sets kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Raw,
    Downsampled,
    Table,
    Object,
    Filtered,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Raw,
        Stage::Downsampled,
        Stage::Table,
        Stage::Object,
        Stage::Filtered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Downsampled => "downsampled",
            Stage::Table => "table",
            Stage::Object => "object",
            Stage::Filtered => "filtered",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown stage {:?}", s))
    }
}

/// Point sets per [`Stage`], all in sensor coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshots {
    stages: BTreeMap<Stage, PointCloud>,
}

impl Snapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw cloud only; every later stage present and empty.
    pub fn early_exit(raw: PointCloud) -> Self {
        let mut snapshots = Self::new();
        snapshots.insert(Stage::Raw, raw);
        snapshots.fill_missing();
        snapshots
    }

    pub fn insert(&mut self, stage: Stage, cloud: PointCloud) {
        self.stages.insert(stage, cloud);
    }

    pub fn get(&self, stage: Stage) -> Option<&PointCloud> {
        self.stages.get(&stage)
    }

    /// Insert an empty cloud for every stage not yet recorded.
    pub fn fill_missing(&mut self) {
        for stage in Stage::ALL {
            self.stages.entry(stage).or_default();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, &PointCloud)> {
        self.stages.iter().map(|(s, c)| (*s, c))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>(), Ok(stage));
        }
        assert_eq!(" Object ".parse::<Stage>(), Ok(Stage::Object));
        assert!("mesh".parse::<Stage>().is_err());
    }

    #[test]
    fn test_early_exit_snapshots() {
        let raw = PointCloud::from_xyz(&[[0.0, 0.0, 1.0]]);
        let snaps = Snapshots::early_exit(raw.clone());
        assert_eq!(snaps.len(), Stage::ALL.len());
        assert_eq!(snaps.get(Stage::Raw), Some(&raw));
        for stage in &Stage::ALL[1..] {
            assert!(snaps.get(*stage).unwrap().is_empty());
        }
    }

    #[test]
    fn test_nan_result() {
        let res = DimsResult::nan(Units::Mm, BBoxType::Aabb);
        assert!(!res.is_valid());
        assert!(res.length.is_nan() && res.width.is_nan() && res.height.is_nan());
        let ok = DimsResult::new(2.0, 1.0, 0.5, Units::M, BBoxType::Obb);
        assert!(ok.is_valid());
        assert_eq!(ok.to_string(), "L=2.0000 W=1.0000 H=0.5000 m (obb)");
    }
}
