pub use dims_core as core;
pub use dims_io as io;
pub use dims_pipeline as pipeline;
pub use dims_point_cloud as point_cloud;

pub use dims_core::{Frame, PointCloud};
pub use dims_pipeline::{DimsConfig, DimsResult, Pipeline, SharedConfig, Snapshots, Stage};

use dims_io::{FrameSource, SourceError};
use rayon::ThreadPoolBuilder;
use std::env;
use std::sync::OnceLock;
use tracing::{info, warn};

/// [`run_frames`] gives up after this many unreadable frames in a row.
pub const MAX_CONSECUTIVE_UNAVAILABLE: usize = 32;

static THREAD_POOL_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize the global Rayon thread pool used by outlier removal and
/// voxel sorting.
///
/// Call this once at startup. Repeated calls return the first result.
///
/// Priority:
/// 1. `num_threads` argument
/// 2. `DIMSCAN_CPU_THREADS` environment variable
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    THREAD_POOL_INIT
        .get_or_init(|| {
            let configured_threads = match num_threads {
                Some(n) => Some(n),
                None => read_cpu_threads_from_env()?,
            };

            let mut builder = ThreadPoolBuilder::new();
            if let Some(n) = configured_threads {
                if n == 0 {
                    return Err("thread count must be >= 1".to_string());
                }
                builder = builder.num_threads(n);
            }

            builder.build_global().map_err(|e| e.to_string())
        })
        .clone()
}

fn read_cpu_threads_from_env() -> Result<Option<usize>, String> {
    let raw = match env::var("DIMSCAN_CPU_THREADS") {
        Ok(v) => v,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(e) => return Err(format!("failed to read DIMSCAN_CPU_THREADS: {e}")),
    };

    raw.parse()
        .map(Some)
        .map_err(|_| format!("DIMSCAN_CPU_THREADS must be a positive integer, got '{raw}'"))
}

/// Counters returned by [`run_frames`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames handed to the pipeline, failed ones included.
    pub processed: usize,
    /// Frames the source could not deliver.
    pub unavailable: usize,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.processed + self.unavailable
    }
}

/// Read frames from `source` and measure each one until the source ends,
/// `max_frames` reads were attempted, or [`MAX_CONSECUTIVE_UNAVAILABLE`] reads
/// in a row failed. `on_result` sees every successfully processed frame.
///
/// Unavailable frames and processing errors are logged and skipped; any other
/// source error is returned.
pub fn run_frames<S, F>(
    source: &mut S,
    pipeline: &Pipeline,
    max_frames: Option<usize>,
    mut on_result: F,
) -> Result<RunSummary, SourceError>
where
    S: FrameSource + ?Sized,
    F: FnMut(&Frame, &DimsResult, &Snapshots),
{
    let mut summary = RunSummary::default();
    let mut consecutive_unavailable = 0usize;

    while max_frames.map_or(true, |n| summary.attempted() < n) {
        let frame = match source.read() {
            Ok(frame) => frame,
            Err(SourceError::EndOfStream) => {
                info!("End of stream");
                break;
            }
            Err(SourceError::FrameUnavailable(reason)) => {
                warn!(%reason, "Frame unavailable, skipping");
                summary.unavailable += 1;
                consecutive_unavailable += 1;
                if consecutive_unavailable >= MAX_CONSECUTIVE_UNAVAILABLE {
                    warn!(
                        count = consecutive_unavailable,
                        "Too many unavailable frames in a row, stopping"
                    );
                    break;
                }
                continue;
            }
            Err(e) => return Err(e),
        };
        consecutive_unavailable = 0;
        summary.processed += 1;

        match pipeline.process(&frame) {
            Ok((result, snapshots)) => on_result(&frame, &result, &snapshots),
            Err(e) => warn!(error = %e, "Frame processing failed, skipping"),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dims_io::Result as SourceResult;

    /// Replays a fixed script of read outcomes, then ends.
    struct Scripted {
        script: Vec<Option<Frame>>,
        cursor: usize,
        looping: bool,
    }

    impl FrameSource for Scripted {
        fn read(&mut self) -> SourceResult<Frame> {
            if self.cursor >= self.script.len() {
                if !self.looping {
                    return Err(SourceError::EndOfStream);
                }
                self.cursor = 0;
            }
            let item = self.script[self.cursor].clone();
            self.cursor += 1;
            item.ok_or_else(|| SourceError::FrameUnavailable("corrupt".to_string()))
        }
    }

    fn empty_frame() -> Frame {
        Frame::new(PointCloud::default())
    }

    #[test]
    fn test_unreadable_looping_source_stops() {
        let mut source = Scripted {
            script: vec![None, None],
            cursor: 0,
            looping: true,
        };
        let pipeline = Pipeline::default();
        let mut seen = 0;
        let summary = run_frames(&mut source, &pipeline, None, |_, _, _| seen += 1).unwrap();

        assert_eq!(seen, 0);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.unavailable, MAX_CONSECUTIVE_UNAVAILABLE);
    }

    #[test]
    fn test_unavailable_frames_count_toward_limit() {
        let mut source = Scripted {
            script: vec![None, Some(empty_frame()), None],
            cursor: 0,
            looping: true,
        };
        let pipeline = Pipeline::default();
        let mut seen = 0;
        let summary = run_frames(&mut source, &pipeline, Some(5), |_, result, _| {
            assert!(!result.is_valid());
            seen += 1;
        })
        .unwrap();

        assert_eq!(summary.attempted(), 5);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.unavailable, 3);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_end_of_stream_stops() {
        let mut source = Scripted {
            script: vec![Some(empty_frame()), None, Some(empty_frame())],
            cursor: 0,
            looping: false,
        };
        let summary = run_frames(&mut source, &Pipeline::default(), None, |_, _, _| {}).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                unavailable: 1
            }
        );
    }
}
