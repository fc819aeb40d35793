//! Named point sets on disk: `<name>.ply` plus a `<name>.json` sidecar.

use crate::ply::{read_ply_file, write_ply_file};
use crate::Result;
use dims_core::{Intrinsics, PointCloud};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Scalar metadata stored next to a point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveMeta {
    pub width: u32,
    pub height: u32,
    /// Meters per raw depth unit, e.g. 0.001 for millimeter depth images.
    pub depth_scale: f64,
    pub intrinsics: Option<Intrinsics>,
    pub timestamp_ns: Option<u64>,
    /// Measured `[length, width, height]`, if any.
    pub dims: Option<[f64; 3]>,
}

impl Default for ArchiveMeta {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth_scale: 1.0,
            intrinsics: None,
            timestamp_ns: None,
            dims: None,
        }
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn ply_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("point_cloud_{}.ply", unix_nanos())
    } else if Path::new(name).extension().is_some_and(|e| e.eq_ignore_ascii_case("ply")) {
        name.to_string()
    } else {
        format!("{}.ply", name)
    }
}

/// Write `cloud` and `meta` under `dir`, creating it if needed.
///
/// Returns the path of the written PLY file.
pub fn save_point_set(
    dir: impl AsRef<Path>,
    name: &str,
    cloud: &PointCloud,
    meta: &ArchiveMeta,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let path = dir.join(ply_name(name));
    write_ply_file(&path, cloud)?;
    std::fs::write(path.with_extension("json"), serde_json::to_string_pretty(meta)?)?;

    info!(path = %path.display(), points = cloud.len(), "Saved point set");
    Ok(path)
}

/// Read a PLY file and its sidecar; a missing sidecar gives default metadata.
pub fn load_point_set(path: impl AsRef<Path>) -> Result<(PointCloud, ArchiveMeta)> {
    let path = path.as_ref();
    let cloud = read_ply_file(path)?;

    let sidecar = path.with_extension("json");
    let meta = if sidecar.is_file() {
        serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?
    } else {
        debug!(path = %path.display(), "No metadata sidecar");
        ArchiveMeta::default()
    };

    Ok((cloud, meta))
}
