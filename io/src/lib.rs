//! Point cloud storage and frame acquisition.
//!
//! - PLY (Polygon File Format) reading and writing
//! - named point sets with a JSON metadata sidecar
//! - frame sources: recorded sequences and synthetic table scenes

pub mod archive;
pub mod ply;
pub mod source;
pub mod synthetic;

pub use archive::{load_point_set, save_point_set, ArchiveMeta};
pub use ply::{read_ply, read_ply_file, write_ply, write_ply_file};
pub use source::{FrameSource, ReplaySource};
pub use synthetic::{SceneBuilder, SyntheticSource};

/// Failure to produce a frame or to access stored point sets.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A finite sequence has no more frames.
    #[error("End of stream")]
    EndOfStream,

    /// Transient failure; the next read may succeed.
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] dims_core::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
