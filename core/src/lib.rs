//! Core types for single-frame object dimensioning.
//!
//! - [`point_cloud`]: owned point buffers and per-frame metadata
//! - [`geometry`]: camera intrinsics, the support [`Plane`] and the [`TableFrame`]
//! - [`robust`]: a generic, seedable RANSAC engine

pub mod geometry;
pub mod point_cloud;
pub mod robust;

pub use geometry::{normalize, Intrinsics, Plane, TableFrame};
pub use point_cloud::{Frame, PointCloud};
pub use robust::{Ransac, RobustConfig, RobustModel, RobustResult};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A vector that had to be normalized was (numerically) zero.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
