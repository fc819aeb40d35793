//! Point Cloud Operations
//!
//! CPU point cloud routines used by the measurement pipeline:
//!
//! - [`spatial`]: k-nearest and radius queries behind the [`NeighborSearch`] trait
//! - [`filtering`]: planar crop, voxel downsampling, statistical outlier removal
//! - [`segmentation`]: RANSAC plane segmentation and DBSCAN clustering
//! - [`stats`]: mean, standard deviation and quantiles
//!
//! # Usage
//!
//! ```ignore
//! use dims_point_cloud::{voxel_down_sample, remove_statistical_outliers};
//! ```

pub mod filtering;
pub mod segmentation;
pub mod spatial;
pub mod stats;

pub use filtering::{crop_xy, remove_statistical_outliers, voxel_down_sample, XyBounds};
pub use segmentation::{
    cluster_dbscan, cluster_dbscan_with, largest_cluster, segment_plane, PlaneModel, NOISE,
};
pub use spatial::{NeighborSearch, PointIndex};
pub use stats::{mean, quantile, quantile_range, std};
