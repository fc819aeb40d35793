//! Per-frame object dimensioning on a support plane.
//!
//! The flow for one point cloud:
//!
//! 1. ROI prefilter, voxel downsampling, statistical denoising
//! 2. support-plane estimation with tilt, support and depth gates
//! 3. split into table and non-table points, keep points above the table
//! 4. move into the table frame, isolate the object by height, ROI and density
//! 5. measure length, width and height
//!
//! [`Pipeline::process`] returns a [`DimsResult`] plus the intermediate point
//! sets as [`Snapshots`].

pub mod config;
pub mod dimensions;
pub mod foreground;
pub mod pipeline;
pub mod plane;
pub mod preprocess;
pub mod result;
pub mod segment;

pub use config::{BBoxType, ConfigError, DimsConfig, SharedConfig, Units, ViewGeometry};
pub use dimensions::{estimate_dimensions, Extents};
pub use foreground::signed_distance_filter;
pub use pipeline::{process_cloud, Pipeline};
pub use plane::{PlaneEstimate, PlaneEstimator, PlaneTier};
pub use preprocess::{Preprocessed, Preprocessor};
pub use result::{DimsResult, Snapshots, Stage};
pub use segment::ObjectSegmenter;
