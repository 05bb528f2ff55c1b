//! Pipeline orchestration: decode, mask every frame, encode.
//!
//! The run is a linear one-shot batch transform. Every failure aborts the
//! remaining steps and surfaces a typed error carrying the failing stage
//! and how far processing got; nothing is retried, and the destination is
//! only ever written through the encoder's atomic publish.

use crate::chroma::key_out_background;
use crate::color::KeyColor;
use crate::decode::{decode_gif, DecodeError};
use crate::encode::{encode_gif, EncodeError};
use crate::progress::ProgressSink;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Parameter errors caught before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Reading and replacing the same file in one run is rejected
    #[error("output path '{0}' is the same as the input path")]
    SamePath(PathBuf),
}

/// Error type for a full pipeline run.
///
/// Wraps the stage-specific error and records how many frames had been
/// processed when the failure happened, for diagnostics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid parameters: {0}")]
    Invalid(#[from] ValidationError),
    #[error("failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("failed to encode '{path}' after masking {frames_masked} frames: {source}")]
    Encode {
        path: PathBuf,
        frames_masked: usize,
        #[source]
        source: EncodeError,
    },
    #[error("cancelled after {completed} of {total} frames")]
    Cancelled { completed: usize, total: usize },
}

/// Parameters for one pipeline run.
///
/// `tolerance` is a raw channel-distance bound in 0-255 units - the same
/// scale as the color channels themselves, not a percentage. Callers
/// presenting a 0-100 scale must convert before reaching this layer.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub color: KeyColor,
    pub tolerance: u8,
}

impl Options {
    /// Reject nonsensical parameter combinations before the run starts.
    ///
    /// Channel and tolerance ranges are already enforced by the `u8` types;
    /// the remaining check is that input and output are distinct paths.
    /// Aliased spellings of the same file (`./a.gif` vs `a.gif`, symlinks)
    /// are caught when both paths resolve; an output that does not exist
    /// yet cannot alias the input and is compared textually.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.input == self.output {
            return Err(ValidationError::SamePath(self.output.clone()));
        }
        if let (Ok(input), Ok(output)) = (self.input.canonicalize(), self.output.canonicalize()) {
            if input == output {
                return Err(ValidationError::SamePath(self.output.clone()));
            }
        }
        Ok(())
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub loop_count: u16,
}

/// Shared cancellation flag, checked between frames.
///
/// Cloning shares the flag; cancelling from any clone aborts the run before
/// the next frame starts. A cancelled run never writes the destination.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One-shot background-removal run.
///
/// # Example
///
/// ```no_run
/// use gifkey::color::KeyColor;
/// use gifkey::pipeline::{Options, Pipeline};
/// use gifkey::progress::FnSink;
///
/// # fn main() -> Result<(), gifkey::pipeline::PipelineError> {
/// let options = Options {
///     input: "spinner.gif".into(),
///     output: "spinner_keyed.gif".into(),
///     color: KeyColor::WHITE,
///     tolerance: 30,
/// };
/// let mut reporter = FnSink(|current, total| eprintln!("frame {current}/{total}"));
/// let summary = Pipeline::new(options).with_progress(&mut reporter).run()?;
/// println!("masked {} frames", summary.frames);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<'a> {
    options: Options,
    progress: Option<&'a mut dyn ProgressSink>,
    cancel: Option<CancelFlag>,
}

impl<'a> Pipeline<'a> {
    pub fn new(options: Options) -> Self {
        Pipeline { options, progress: None, cancel: None }
    }

    /// Attach a progress sink, notified once per masked frame.
    pub fn with_progress(mut self, sink: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Attach a cancellation flag, checked between frames.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Execute: decode, mask frame by frame in order, encode.
    pub fn run(mut self) -> Result<RunSummary, PipelineError> {
        self.options.validate()?;

        let animation = decode_gif(&self.options.input).map_err(|source| {
            PipelineError::Decode { path: self.options.input.clone(), source }
        })?;

        let total = animation.frames.len();
        let (width, height) = animation.dimensions();
        let loop_count = animation.loop_count;

        let mut frames = Vec::with_capacity(total);
        let mut durations = Vec::with_capacity(total);

        for (index, mut frame) in animation.frames.into_iter().enumerate() {
            if self.is_cancelled() {
                return Err(PipelineError::Cancelled { completed: index, total });
            }

            key_out_background(&mut frame.image, self.options.color, self.options.tolerance);
            durations.push(frame.duration_ms);
            frames.push(frame.image);

            if let Some(sink) = self.progress.as_deref_mut() {
                sink.frame_done(index + 1, total);
            }
        }

        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { completed: total, total });
        }

        encode_gif(&frames, &durations, loop_count, &self.options.output).map_err(|source| {
            PipelineError::Encode {
                path: self.options.output.clone(),
                frames_masked: total,
                source,
            }
        })?;

        Ok(RunSummary { frames: total, width, height, loop_count })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_same_path() {
        let options = Options {
            input: PathBuf::from("a.gif"),
            output: PathBuf::from("a.gif"),
            color: KeyColor::WHITE,
            tolerance: 30,
        };
        assert_eq!(
            options.validate(),
            Err(ValidationError::SamePath(PathBuf::from("a.gif")))
        );
    }

    #[test]
    fn test_validate_rejects_aliased_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.gif");
        std::fs::write(&file, b"x").unwrap();

        // Same file reached through a different spelling
        let options = Options {
            input: file.clone(),
            output: dir.path().join(".").join("a.gif"),
            color: KeyColor::WHITE,
            tolerance: 30,
        };
        assert!(matches!(
            options.validate(),
            Err(ValidationError::SamePath(_))
        ));
    }

    #[test]
    fn test_validate_accepts_distinct_paths() {
        let options = Options {
            input: PathBuf::from("a.gif"),
            output: PathBuf::from("b.gif"),
            color: KeyColor::WHITE,
            tolerance: 30,
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_decode_failure_carries_path() {
        let options = Options {
            input: PathBuf::from("missing.gif"),
            output: PathBuf::from("out.gif"),
            color: KeyColor::WHITE,
            tolerance: 30,
        };
        let err = Pipeline::new(options).run().unwrap_err();
        match err {
            PipelineError::Decode { path, .. } => {
                assert_eq!(path, PathBuf::from("missing.gif"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
