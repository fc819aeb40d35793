use crate::archive::load_point_set;
use crate::{Result, SourceError};
use dims_core::Frame;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Produces frames one at a time.
///
/// [`SourceError::EndOfStream`] ends a finite sequence and
/// [`SourceError::FrameUnavailable`] is transient; what to do about either is
/// up to the caller.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }
}

/// Replays the `*.ply` files of a directory in file-name order.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    files: Vec<PathBuf>,
    cursor: usize,
    loop_frames: bool,
}

impl ReplaySource {
    pub fn open(dir: impl AsRef<Path>, loop_frames: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|e| e.eq_ignore_ascii_case("ply"))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no .ply files in {}", dir.display()),
            )));
        }
        info!(dir = %dir.display(), frames = files.len(), "Opened replay source");

        Ok(Self {
            files,
            cursor: 0,
            loop_frames,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ReplaySource {
    fn read(&mut self) -> Result<Frame> {
        if self.cursor >= self.files.len() {
            if !self.loop_frames {
                return Err(SourceError::EndOfStream);
            }
            self.cursor = 0;
        }
        let path = &self.files[self.cursor];
        self.cursor += 1;

        let (cloud, meta) = load_point_set(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to load frame");
            SourceError::FrameUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let mut frame = Frame::new(cloud);
        frame.intrinsics = meta.intrinsics;
        frame.timestamp_ns = meta.timestamp_ns;
        Ok(frame)
    }
}
